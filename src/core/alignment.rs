// the alignment record: mapped/comapped pointers, decisions, decision log
//
// Rules:
// 1. Each source node maps to at most one union node, and each union node is
//    claimed by at most one source node; `mapped` and `comapped` stay inverse.
// 2. A commit never overwrites a different partner on either side; it is refused
//    and logged instead.
// 3. A decision is only replaced by a strictly stronger one, and never while
//    the node is mapped.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::answer::Answer;
use crate::core::bracket::Brackets;
use crate::core::taxonomy::Taxonomy;
use crate::core::types::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("source node {node} is already mapped to {existing}, refusing {attempted}")]
    SourceTaken {
        node: NodeId,
        existing: NodeId,
        attempted: NodeId,
    },

    #[error("union node {unode} is already claimed by source node {claimant}, refusing {node}")]
    UnionTaken {
        unode: NodeId,
        claimant: NodeId,
        node: NodeId,
    },
}

/// Counters owned by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub names_in_common: usize,
    pub badly_homonymic: usize,
    pub refused_commits: usize,
    pub refused_decisions: usize,
    pub bad_alignments: usize,
    pub no_mrca: usize,
    pub internal_warnings: usize,
    pub lub_match: usize,
    pub lub_mismatch: usize,
    pub lub_graft: usize,
    pub lub_reclassify: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Alignment {
    mapped: Vec<Option<NodeId>>,
    comapped: Vec<Option<NodeId>>,
    answers: Vec<Option<Answer>>,
    pub(crate) lubs: Vec<Option<NodeId>>,
    log: Vec<Answer>,
    brackets: Brackets,
    stats: RunStats,
}

impl Alignment {
    pub fn new(source: &Taxonomy, union: &Taxonomy) -> Self {
        let mut alignment = Self::default();
        alignment.reset(source, union);
        alignment
    }

    /// Forget every mapping, decision and LUB, and renumber the union tree.
    pub fn reset(&mut self, source: &Taxonomy, union: &Taxonomy) {
        self.mapped = vec![None; source.len()];
        self.comapped = vec![None; union.len()];
        self.answers = vec![None; source.len()];
        self.lubs = vec![None; source.len()];
        self.log.clear();
        self.stats = RunStats::default();
        self.brackets.assign_brackets(union);
        self.brackets.prepare_source(source, union);
    }

    pub fn brackets(&self) -> &Brackets {
        &self.brackets
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    pub fn mapping_of(&self, node: NodeId) -> Option<NodeId> {
        self.mapped.get(node as usize).copied().flatten()
    }

    pub fn comapping_of(&self, unode: NodeId) -> Option<NodeId> {
        self.comapped.get(unode as usize).copied().flatten()
    }

    pub fn decision_of(&self, node: NodeId) -> Option<&Answer> {
        self.answers.get(node as usize).and_then(Option::as_ref)
    }

    pub fn lub_of(&self, node: NodeId) -> Option<NodeId> {
        self.lubs.get(node as usize).copied().flatten()
    }

    pub fn mapped_count(&self) -> usize {
        self.mapped.iter().filter(|m| m.is_some()).count()
    }

    /// Every (source node, decision) pair, in source index order.
    pub fn decisions(&self) -> impl Iterator<Item = (NodeId, &Answer)> + '_ {
        self.answers
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().map(|a| (i as NodeId, a)))
    }

    /// Append-only audit trail: every decision recorded and every veto noted.
    pub fn log(&self) -> &[Answer] {
        &self.log
    }

    /// Record `node -> unode` with its justifying answer.
    pub fn commit(&mut self, node: NodeId, unode: NodeId, answer: Answer) -> Result<(), CommitError> {
        match self.mapping_of(node) {
            Some(existing) if existing == unode => {
                if self.decision_of(node).is_none_or(|d| answer.score > d.score) {
                    self.record(node, answer);
                }
                return Ok(());
            }
            Some(existing) => {
                let err = CommitError::SourceTaken {
                    node,
                    existing,
                    attempted: unode,
                };
                self.refuse(&err);
                return Err(err);
            }
            None => {}
        }
        if let Some(claimant) = self.comapping_of(unode) {
            let err = CommitError::UnionTaken {
                unode,
                claimant,
                node,
            };
            self.refuse(&err);
            return Err(err);
        }

        self.mapped[node as usize] = Some(unode);
        self.comapped[unode as usize] = Some(node);
        self.record(node, answer);
        Ok(())
    }

    fn refuse(&mut self, err: &CommitError) {
        self.stats.refused_commits += 1;
        warn!(%err, "commit refused");
    }

    /// Record a non-mapping decision. Returns whether it was kept.
    pub fn set_decision(&mut self, answer: Answer) -> bool {
        let node = answer.subject;
        if self.mapping_of(node).is_some() {
            self.stats.refused_decisions += 1;
            debug!(node, reason = %answer.reason, "node already mapped, decision dropped");
            return false;
        }
        let kept = self
            .decision_of(node)
            .filter(|existing| existing.score >= answer.score)
            .map(|existing| existing.reason.clone());
        if let Some(kept) = kept {
            self.stats.refused_decisions += 1;
            debug!(node, %kept, dropped = %answer.reason, "weaker decision dropped");
            return false;
        }
        self.record(node, answer);
        true
    }

    fn record(&mut self, node: NodeId, answer: Answer) {
        self.log.push(answer.clone());
        self.answers[node as usize] = Some(answer);
    }

    /// Log an assessment without making it a decision.
    pub fn note(&mut self, answer: Answer) {
        self.log.push(answer);
    }
}
