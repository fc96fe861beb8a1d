// pairwise criteria, evaluated in a fixed order
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::alignment::Alignment;
use crate::core::answer::Answer;
use crate::core::taxonomy::Taxonomy;
use crate::core::types::NodeId;
use crate::mapping::config::AlignConfig;

/// Read-only inputs shared by every assessment of one run.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub source: &'a Taxonomy,
    pub union: &'a Taxonomy,
    pub config: &'a AlignConfig,
}

impl<'a> Scope<'a> {
    pub fn new(source: &'a Taxonomy, union: &'a Taxonomy, config: &'a AlignConfig) -> Self {
        Self {
            source,
            union,
            config,
        }
    }

    pub fn is_of_interest(&self, node: NodeId) -> bool {
        self.source
            .node(node)
            .name
            .as_deref()
            .is_some_and(|name| self.config.is_of_interest(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    Division,
    Rank,
    Lineage,
    Subsumption,
    WeakDivision,
    PrimaryName,
    SourceId,
    SourceOrigin,
}

impl Criterion {
    /// Evaluation order. Changing it changes every run's output.
    pub const ALL: [Criterion; 8] = [
        Criterion::Division,
        Criterion::Rank,
        Criterion::Lineage,
        Criterion::Subsumption,
        Criterion::WeakDivision,
        Criterion::PrimaryName,
        Criterion::SourceId,
        Criterion::SourceOrigin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Division => "division",
            Criterion::Rank => "rank",
            Criterion::Lineage => "lineage",
            Criterion::Subsumption => "subsumption",
            Criterion::WeakDivision => "weak-division",
            Criterion::PrimaryName => "primary-name",
            Criterion::SourceId => "source-id",
            Criterion::SourceOrigin => "source-origin",
        }
    }

    /// Compare source `node` with union `unode`. Never mutates anything.
    pub fn assess(self, scope: &Scope<'_>, alignment: &Alignment, node: NodeId, unode: NodeId) -> Answer {
        match self {
            Criterion::Division => division(scope, alignment, node, unode),
            Criterion::Rank => rank(scope, node, unode),
            Criterion::Lineage => lineage(scope, alignment, node, unode),
            Criterion::Subsumption => subsumption(scope, alignment, node, unode),
            Criterion::WeakDivision => weak_division(scope, node, unode),
            Criterion::PrimaryName => primary_name(scope, node, unode),
            Criterion::SourceId => source_id(scope, node, unode),
            Criterion::SourceOrigin => source_origin(scope, node, unode),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn division_labels(scope: &Scope<'_>, node: NodeId, unode: NodeId) -> Option<(String, String, NodeId)> {
    let sdiv = scope.source.node(node).division()?;
    let udiv = scope.union.node(unode).division()?;
    Some((scope.source.label(sdiv)?, scope.union.label(udiv)?, udiv))
}

fn division(scope: &Scope<'_>, alignment: &Alignment, node: NodeId, unode: NodeId) -> Answer {
    let Some((sname, uname, udiv)) = division_labels(scope, node, unode) else {
        return Answer::dunno(node, unode);
    };
    if sname == uname {
        return Answer::dunno(node, unode);
    }
    // the source division has to be located in the union tree to compare extents
    let Some(sdiv_in_union) = scope.union.division_named(&sname) else {
        return Answer::dunno(node, unode);
    };
    let brackets = alignment.brackets();
    if brackets.contains(sdiv_in_union, udiv) || brackets.contains(udiv, sdiv_in_union) {
        Answer::dunno(node, unode)
    } else {
        Answer::strong_no(node, unode, "not-same/division", Some(format!("{sname} vs {uname}")))
    }
}

fn rank(scope: &Scope<'_>, node: NodeId, unode: NodeId) -> Answer {
    let srank = scope.source.node(node).rank;
    let urank = scope.union.node(unode).rank;
    match (srank.group(), urank.group()) {
        (Some(a), Some(b)) if a != b => {
            Answer::strong_no(node, unode, "not-same/rank", Some(format!("{srank} vs {urank}")))
        }
        _ => Answer::dunno(node, unode),
    }
}

fn lineage(scope: &Scope<'_>, alignment: &Alignment, node: NodeId, unode: NodeId) -> Answer {
    let union_ancestors: Vec<NodeId> = scope.union.ancestors(unode).collect();
    if union_ancestors.is_empty() {
        return Answer::dunno(node, unode);
    }
    let union_labels: HashSet<String> = union_ancestors
        .iter()
        .filter_map(|&a| scope.union.label(a))
        .collect();
    let brackets = alignment.brackets();

    for anc in scope.source.ancestors(node).take(scope.config.lineage_depth) {
        if let Some(image) = alignment.mapping_of(anc) {
            if image != unode && brackets.contains(image, unode) {
                return Answer::yes(node, unode, "same/lineage", Some(scope.union.describe(image)));
            }
            continue;
        }
        if let Some(label) = scope.source.label(anc) {
            if union_labels.contains(&label) {
                return Answer::yes(node, unode, "same/lineage", Some(label));
            }
        }
    }
    Answer::dunno(node, unode)
}

fn subsumption(scope: &Scope<'_>, alignment: &Alignment, node: NodeId, unode: NodeId) -> Answer {
    if scope.source.children(node).is_empty() {
        return Answer::dunno(node, unode);
    }
    let brackets = alignment.brackets();
    if let Some(w) = brackets.witness(scope.source, node, unode) {
        return Answer::yes(node, unode, "same/subsumed", scope.source.label(w));
    }
    match brackets.antiwitness(scope.source, node, unode) {
        Some(a) => Answer::no(node, unode, "not-same/incompatible", scope.source.label(a)),
        None => Answer::dunno(node, unode),
    }
}

fn weak_division(scope: &Scope<'_>, node: NodeId, unode: NodeId) -> Answer {
    match division_labels(scope, node, unode) {
        Some((sname, uname, _)) if sname == uname => {
            Answer::weak_yes(node, unode, "same/division", Some(sname))
        }
        _ => Answer::dunno(node, unode),
    }
}

fn primary_name(scope: &Scope<'_>, node: NodeId, unode: NodeId) -> Answer {
    match (scope.source.label(node), scope.union.label(unode)) {
        (Some(a), Some(b)) if a == b => Answer::weak_yes(node, unode, "same/primary-name", None),
        _ => Answer::dunno(node, unode),
    }
}

fn source_id(scope: &Scope<'_>, node: NodeId, unode: NodeId) -> Answer {
    let theirs = &scope.union.node(unode).source_ids;
    scope
        .source
        .node(node)
        .source_ids
        .iter()
        .find(|qid| theirs.contains(qid))
        .map(|qid| Answer::strong_yes(node, unode, "same/source-id", Some(qid.to_string())))
        .unwrap_or_else(|| Answer::dunno(node, unode))
}

fn source_origin(scope: &Scope<'_>, node: NodeId, unode: NodeId) -> Answer {
    let theirs = &scope.union.node(unode).source_ids;
    scope
        .source
        .node(node)
        .source_ids
        .iter()
        .find(|qid| theirs.iter().any(|t| t.origin == qid.origin))
        .map(|qid| Answer::weak_yes(node, unode, "same/source-origin", Some(qid.origin.clone())))
        .unwrap_or_else(|| Answer::dunno(node, unode))
}
