// union nodes a source node could plausibly be, and how each was reached
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::taxonomy::Taxonomy;
use crate::core::types::{NodeId, normalize_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reach {
    /// The candidate's own primary name.
    PrimaryName,
    /// One of the candidate's synonyms.
    Synonym,
    /// The candidate's authoritative source id.
    SourceId,
    /// One of the candidate's other source ids.
    SecondarySourceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub reach: Reach,
    /// The key came from one of the source node's synonyms rather than the node itself.
    pub via_source_synonym: bool,
}

/// Diagnostic only; scoring never looks at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateTag {
    routes: BTreeSet<Route>,
}

impl CandidateTag {
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn has(&self, reach: Reach) -> bool {
        self.routes.iter().any(|r| r.reach == reach)
    }

    fn add(&mut self, reach: Reach, via_source_synonym: bool) {
        self.routes.insert(Route {
            reach,
            via_source_synonym,
        });
    }
}

impl fmt::Display for CandidateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            let letter = match route.reach {
                Reach::PrimaryName => 'C',
                Reach::Synonym => 'S',
                Reach::SourceId => 'I',
                Reach::SecondarySourceId => 'J',
            };
            if route.via_source_synonym {
                write!(f, "{}", letter.to_ascii_lowercase())?;
            } else {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// Every live union node sharing a label or a source id with `node`.
pub fn candidates(source: &Taxonomy, union: &Taxonomy, node: NodeId) -> BTreeMap<NodeId, CandidateTag> {
    let mut found: BTreeMap<NodeId, CandidateTag> = BTreeMap::new();
    let snode = source.node(node);

    let mut keys: Vec<(String, bool)> = Vec::new();
    if let Some(name) = &snode.name {
        keys.push((normalize_label(name), false));
    }
    keys.extend(snode.synonyms.iter().map(|s| (normalize_label(&s.name), true)));

    for (label, via_source_synonym) in keys {
        for bearer in union.lookup(&label) {
            let unode = bearer.node();
            if union.node(unode).is_pruned() {
                continue;
            }
            let reach = if bearer.is_primary() {
                Reach::PrimaryName
            } else {
                Reach::Synonym
            };
            found.entry(unode).or_default().add(reach, via_source_synonym);
        }
    }

    let ids = snode
        .source_ids
        .iter()
        .map(|qid| (qid, false))
        .chain(
            snode
                .synonyms
                .iter()
                .flat_map(|s| s.source_ids.iter().map(|qid| (qid, true))),
        );
    for (qid, via_source_synonym) in ids {
        for &(unode, position) in union.with_source_id(qid) {
            if union.node(unode).is_pruned() {
                continue;
            }
            let reach = if position == 0 {
                Reach::SourceId
            } else {
                Reach::SecondarySourceId
            };
            found.entry(unode).or_default().add(reach, via_source_synonym);
        }
    }
    found
}
