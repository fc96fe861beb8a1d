// lifting: where each source subtree lands in the union tree (least upper bound)
//
// Computed bottom-up over the source tree:
// - a leaf or a mapped node lifts to its own mapping;
// - an unmapped internal node lifts to the mrca of its placed children's images.
// For a mapped internal node the children's join is still computed and checked
// against the mapping: a join outside the mapped node is a bad alignment.
use tracing::{debug, warn};

use crate::core::alignment::Alignment;
use crate::core::taxonomy::Taxonomy;
use crate::core::types::NodeId;

impl Alignment {
    fn image(&self, node: NodeId) -> Option<NodeId> {
        self.mapping_of(node).or_else(|| self.lub_of(node))
    }

    /// Join of the placed children's images; `None` if none are placed or if they share no ancestor.
    fn join_children(&mut self, source: &Taxonomy, union: &Taxonomy, node: NodeId) -> Option<NodeId> {
        let mut join: Option<NodeId> = None;
        for &child in source.children(node) {
            if !source.node(child).is_placed() {
                continue;
            }
            let Some(image) = self.image(child) else {
                continue;
            };
            let Some(acc) = join else {
                join = Some(image);
                continue;
            };
            let joined = self.brackets().mrca(union, acc, image);
            join = match joined {
                Some(m) => Some(m),
                None => {
                    self.stats_mut().no_mrca += 1;
                    warn!(
                        node = %source.describe(node),
                        left = %union.describe(acc),
                        right = %union.describe(image),
                        "no common ancestor"
                    );
                    return None;
                }
            };
        }
        join
    }

    /// Fill in `lub_of` for every source node and tally how the two trees agree.
    pub fn compute_lubs(&mut self, source: &Taxonomy, union: &Taxonomy) {
        if self.lubs.len() < source.len() {
            self.lubs.resize(source.len(), None);
        }
        for node in source.postorder() {
            let mapped = self.mapping_of(node);
            if source.children(node).is_empty() {
                self.lubs[node as usize] = mapped;
                continue;
            }
            let join = self.join_children(source, union, node);

            // tallied for internal nodes only; a leaf's lub is its mapping
            let lub = match (mapped, join) {
                (Some(m), Some(j)) => {
                    if self.brackets().contains(m, j) {
                        self.stats_mut().lub_match += 1;
                    } else {
                        self.stats_mut().lub_mismatch += 1;
                        self.stats_mut().bad_alignments += 1;
                        warn!(
                            node = %source.describe(node),
                            mapped = %union.describe(m),
                            children = %union.describe(j),
                            "bad alignment"
                        );
                    }
                    Some(m)
                }
                (Some(m), None) => {
                    self.stats_mut().lub_match += 1;
                    Some(m)
                }
                (None, Some(j)) => {
                    self.stats_mut().lub_reclassify += 1;
                    Some(j)
                }
                (None, None) => {
                    self.stats_mut().lub_graft += 1;
                    None
                }
            };
            self.lubs[node as usize] = lub;
        }
        debug!(
            matched = self.stats().lub_match,
            mismatched = self.stats().lub_mismatch,
            grafted = self.stats().lub_graft,
            reclassified = self.stats().lub_reclassify,
            "lubs computed"
        );
    }
}
