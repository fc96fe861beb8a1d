// cascade matching: one source node at a time, narrowing its candidates criterion by criterion
use std::cmp::Ordering;

use tracing::{debug, info};

use crate::core::alignment::Alignment;
use crate::core::answer::{Answer, Score};
use crate::core::candidates::candidates;
use crate::core::criteria::{Criterion, Scope};
use crate::core::types::NodeId;

/// Outcome of narrowing one source node's candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winnowing {
    pub answer: Answer,
    /// Candidate count before the first criterion and after each one that ran.
    pub sizes: Vec<usize>,
    pub survivors: Vec<NodeId>,
}

impl Winnowing {
    /// The answer names a target that should be committed.
    pub fn is_match(&self) -> bool {
        self.answer.reason == "confirmed" && self.answer.target.is_some()
    }
}

/// Tie-break between equally good candidates: label, then node id, then arena index.
fn compare(scope: &Scope<'_>, a: NodeId, b: NodeId) -> Ordering {
    let ua = scope.union.node(a);
    let ub = scope.union.node(b);
    scope
        .union
        .label(a)
        .cmp(&scope.union.label(b))
        .then_with(|| ua.id.cmp(&ub.id))
        .then_with(|| a.cmp(&b))
}

pub fn winnow(scope: &Scope<'_>, alignment: &Alignment, node: NodeId, candidates: Vec<NodeId>) -> Winnowing {
    let mut current = candidates;
    let mut sizes = vec![current.len()];

    for criterion in Criterion::ALL {
        if current.is_empty() {
            break;
        }
        let answers: Vec<Answer> = current
            .iter()
            .map(|&unode| criterion.assess(scope, alignment, node, unode))
            .collect();
        if scope.is_of_interest(node) {
            for z in answers.iter().filter(|z| z.score != Score::Dunno) {
                info!(%criterion, answer = %z, "assessed");
            }
        }
        let Some(best) = answers.iter().map(|z| z.score).max() else {
            break;
        };

        if best.is_veto() {
            let worst = answers.iter().find(|z| z.score == best).map(|z| match &z.evidence {
                Some(e) => format!("{}({})", z.reason, e),
                None => z.reason.clone(),
            });
            sizes.push(0);
            return Winnowing {
                answer: Answer::new(node, None, best, "rejected", worst),
                sizes,
                survivors: Vec::new(),
            };
        }

        let at_best: Vec<usize> = (0..answers.len()).filter(|&i| answers[i].score == best).collect();
        if let &[i] = at_best.as_slice() {
            if best.is_positive() {
                let z = &answers[i];
                sizes.push(1);
                return Winnowing {
                    answer: Answer::new(node, Some(current[i]), best, "confirmed", Some(z.reason.clone())),
                    sizes,
                    survivors: vec![current[i]],
                };
            }
        }
        current = at_best.into_iter().map(|i| current[i]).collect();
        sizes.push(current.len());
    }

    let answer = match current.as_slice() {
        [] => Answer::new(node, None, Score::Dunno, "new", None),
        &[only] => Answer::new(node, Some(only), Score::WeakYes, "confirmed", Some("by-elimination".to_string())),
        many => {
            let pick = many.iter().copied().min_by(|&a, &b| compare(scope, a, b));
            let reason = if scope.source.children(node).is_empty() {
                "ambiguous tip"
            } else {
                "ambiguous internal"
            };
            let ids = many.iter().map(|&u| scope.union.describe(u)).collect::<Vec<_>>().join(",");
            Answer::new(node, pick, Score::Dunno, reason, Some(ids))
        }
    };
    Winnowing {
        answer,
        sizes,
        survivors: current,
    }
}

pub fn align_by_cascade(scope: &Scope<'_>, alignment: &mut Alignment) {
    for node in scope.source.preorder() {
        if scope.source.node(node).is_pruned() {
            continue;
        }
        let found: Vec<NodeId> = candidates(scope.source, scope.union, node).into_keys().collect();
        if found.is_empty() {
            continue;
        }
        let w = winnow(scope, alignment, node, found);
        debug!(node, sizes = ?w.sizes, answer = %w.answer, "winnowed");

        if !w.is_match() {
            alignment.set_decision(w.answer);
            continue;
        }
        let Some(unode) = w.answer.target else {
            continue;
        };
        if alignment.commit(node, unode, w.answer).is_err() {
            let claimant = alignment.comapping_of(unode).map(|c| scope.source.describe(c));
            alignment.set_decision(Answer::new(node, Some(unode), Score::Dunno, "lost-race", claimant));
        }
    }
}
