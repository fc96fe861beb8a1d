// preorder interval ("bracket") encoding of the union tree
//
// Every union node gets a preorder `seq` and the half-open range [start, end)
// of the seqs in its subtree, so descendant tests are range checks. A source
// node borrows the seq of the union node uniquely bearing its name and spans
// the hull of its children, which approximates where its subtree lands in the
// union numbering without any structural correspondence between the trees.
use crate::core::taxonomy::Taxonomy;
use crate::core::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub seq: Option<u32>,
    pub start: u32,
    pub end: u32,
}

impl Bracket {
    pub const EMPTY: Bracket = Bracket {
        seq: None,
        start: u32::MAX,
        end: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains_seq(&self, seq: u32) -> bool {
        self.start <= seq && seq < self.end
    }

    pub fn overlaps(&self, other: &Bracket) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    pub fn within(&self, outer: &Bracket) -> bool {
        self.start >= outer.start && self.end <= outer.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct Brackets {
    union: Vec<Bracket>,
    source: Vec<Option<Bracket>>,
}

impl Brackets {
    pub fn assign(union: &Taxonomy) -> Self {
        let mut brackets = Self::default();
        brackets.assign_brackets(union);
        brackets
    }

    /// Number the union tree in preorder. Resets every source bracket.
    pub fn assign_brackets(&mut self, union: &Taxonomy) {
        self.union = vec![Bracket::EMPTY; union.len()];
        self.source.clear();

        let mut next: u32 = 0;
        let mut stack: Vec<(NodeId, bool)> =
            union.roots().iter().rev().map(|&r| (r, false)).collect();
        while let Some((n, done)) = stack.pop() {
            let slot = &mut self.union[n as usize];
            if done {
                slot.end = next;
                continue;
            }
            slot.seq = Some(next);
            slot.start = next;
            next += 1;
            stack.push((n, true));
            stack.extend(union.children(n).iter().rev().map(|&c| (c, false)));
        }
    }

    pub fn union_bracket(&self, unode: NodeId) -> Bracket {
        self.union
            .get(unode as usize)
            .copied()
            .unwrap_or(Bracket::EMPTY)
    }

    /// Non-strict descendant test between two union nodes.
    pub fn contains(&self, ancestor: NodeId, unode: NodeId) -> bool {
        match self.union_bracket(unode).seq {
            Some(seq) => self.union_bracket(ancestor).contains_seq(seq),
            None => false,
        }
    }

    /// Memoized bracket of a source node against the union tree numbered by `assign_brackets`.
    pub fn bracket_of(&mut self, source: &Taxonomy, union: &Taxonomy, node: NodeId) -> Bracket {
        if self.source.len() < source.len() {
            self.source.resize(source.len(), None);
        }
        let mut stack = vec![(node, false)];
        while let Some((n, expanded)) = stack.pop() {
            if self.source[n as usize].is_some() {
                continue;
            }
            if expanded {
                self.compute_source(source, union, n);
            } else {
                stack.push((n, true));
                stack.extend(source.children(n).iter().map(|&c| (c, false)));
            }
        }
        self.source_bracket(node)
    }

    /// Fill in every source bracket up front so that later lookups need no mutation.
    pub fn prepare_source(&mut self, source: &Taxonomy, union: &Taxonomy) {
        if self.source.len() < source.len() {
            self.source.resize(source.len(), None);
        }
        for n in source.postorder() {
            if self.source[n as usize].is_none() {
                self.compute_source(source, union, n);
            }
        }
    }

    fn compute_source(&mut self, source: &Taxonomy, union: &Taxonomy, n: NodeId) {
        let seq = source
            .node(n)
            .name
            .as_deref()
            .and_then(|name| union.unique(name))
            .and_then(|u| self.union_bracket(u).seq);

        let mut start = u32::MAX;
        let mut end = 0;
        for &child in source.children(n) {
            let cb = self.source_bracket(child);
            if !cb.is_empty() {
                start = start.min(cb.start);
                end = end.max(cb.end);
            }
            if let Some(s) = cb.seq {
                start = start.min(s);
                end = end.max(s + 1);
            }
        }
        self.source[n as usize] = Some(Bracket { seq, start, end });
    }

    /// Cached bracket of a source node; empty if it was never computed.
    pub fn source_bracket(&self, node: NodeId) -> Bracket {
        self.source
            .get(node as usize)
            .copied()
            .flatten()
            .unwrap_or(Bracket::EMPTY)
    }

    /// A source descendant of `node` whose union image lies inside `unode`.
    pub fn witness(&self, source: &Taxonomy, node: NodeId, unode: NodeId) -> Option<NodeId> {
        let target = self.union_bracket(unode);
        if !self.source_bracket(node).overlaps(&target) {
            return None;
        }
        let mut stack: Vec<NodeId> = source.children(node).iter().rev().copied().collect();
        while let Some(c) = stack.pop() {
            let cb = self.source_bracket(c);
            if cb.seq.is_some_and(|s| target.contains_seq(s)) {
                return Some(c);
            }
            if cb.overlaps(&target) {
                stack.extend(source.children(c).iter().rev().copied());
            }
        }
        None
    }

    /// A source descendant of `node` whose union image lies outside `unode`.
    pub fn antiwitness(&self, source: &Taxonomy, node: NodeId, unode: NodeId) -> Option<NodeId> {
        let target = self.union_bracket(unode);
        let bracket = self.source_bracket(node);
        if bracket.is_empty() || target.is_empty() || bracket.within(&target) {
            return None;
        }
        let mut stack: Vec<NodeId> = source.children(node).iter().rev().copied().collect();
        while let Some(c) = stack.pop() {
            let cb = self.source_bracket(c);
            if cb.seq.is_some_and(|s| !target.contains_seq(s)) {
                return Some(c);
            }
            if !cb.is_empty() && !cb.within(&target) {
                stack.extend(source.children(c).iter().rev().copied());
            }
        }
        None
    }

    /// Nearest common ancestor of two union nodes; `None` across disconnected roots.
    pub fn mrca(&self, union: &Taxonomy, a: NodeId, b: NodeId) -> Option<NodeId> {
        let seq = self.union_bracket(b).seq?;
        std::iter::once(a)
            .chain(union.ancestors(a))
            .find(|&x| self.union_bracket(x).contains_seq(seq))
    }
}
