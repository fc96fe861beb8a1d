// classification: every source node leaves a run with exactly one decision
use std::collections::BTreeMap;

use tracing::debug;

use crate::core::alignment::Alignment;
use crate::core::answer::{Answer, Score};
use crate::core::taxonomy::Taxonomy;
use crate::core::types::NodeId;

impl Alignment {
    /// Give a decision to every source node matching left without one:
    /// - pruned nodes -> `pruned`
    /// - everything else -> `new` (nothing in the union tree matched)
    pub fn finalize_decisions(&mut self, source: &Taxonomy) {
        let mut added = 0usize;
        for node in 0..source.len() as NodeId {
            if self.decision_of(node).is_some() {
                continue;
            }
            let reason = if source.node(node).is_pruned() {
                "pruned"
            } else {
                "new"
            };
            if self.set_decision(Answer::new(node, None, Score::Dunno, reason, None)) {
                added += 1;
            }
        }
        debug!(added, "decisions finalized");
    }

    /// Number of decisions per reason tag.
    pub fn count_by_reason(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, answer) in self.decisions() {
            *counts.entry(answer.reason.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::Node;

    #[test]
    fn every_node_gets_exactly_one_decision() {
        let mut s = Taxonomy::new("src");
        let root = s.add_node(Node::new("Life", None)).unwrap();
        let gone = s.add_node(Node::new("Gone", Some(root))).unwrap();
        s.add_node(Node::new("Below", Some(gone))).unwrap();
        s.prune(gone).unwrap();
        let mut u = Taxonomy::new("union");
        let ulife = u.add_node(Node::new("Life", None)).unwrap();

        let mut al = Alignment::new(&s, &u);
        al.commit(root, ulife, Answer::new(root, Some(ulife), Score::WeakYes, "confirmed", None))
            .unwrap();
        al.finalize_decisions(&s);

        assert_eq!(al.decisions().count(), s.len());
        let counts = al.count_by_reason();
        assert_eq!(counts.get("confirmed"), Some(&1));
        assert_eq!(counts.get("pruned"), Some(&2));
        assert_eq!(counts.get("new"), None);
    }

    #[test]
    fn existing_explanations_are_kept() {
        let mut s = Taxonomy::new("src");
        let a = s.add_node(Node::new("Aotus", None)).unwrap();
        let b = s.add_node(Node::new("Nova", None)).unwrap();
        let u = Taxonomy::new("union");

        let mut al = Alignment::new(&s, &u);
        al.set_decision(Answer::new(a, None, Score::Dunno, "unresolved/ambiguous", None));
        al.finalize_decisions(&s);
        al.finalize_decisions(&s);

        assert_eq!(al.decision_of(a).unwrap().reason, "unresolved/ambiguous");
        assert_eq!(al.decision_of(b).unwrap().reason, "new");
        assert_eq!(al.count_by_reason().values().sum::<usize>(), 2);
    }
}
