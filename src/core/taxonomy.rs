// arena-backed taxonomy: nodes, synonyms, name index, id indexes
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::{Flag, Flags, NodeId, QualifiedId, Rank, normalize_label};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("duplicate node id {id:?}, already held by node {existing}")]
    DuplicateId { id: String, existing: NodeId },

    #[error("node {0} cannot be its own parent")]
    SelfParent(NodeId),

    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
}

/// Secondary label bound to one node. Not a tree element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub name: String,
    /// "synonym", "misspelling", "common name", ...
    pub kind: String,
    pub source_ids: Vec<QualifiedId>,
}

impl Synonym {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            source_ids: Vec::new(),
        }
    }

    pub fn with_source_id(mut self, qid: QualifiedId) -> Self {
        self.source_ids.push(qid);
        self
    }
}

/// Something carrying a label in the name index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bearer {
    Primary(NodeId),
    Synonym { node: NodeId, index: usize },
}

impl Bearer {
    pub fn node(self) -> NodeId {
        match self {
            Bearer::Primary(node) => node,
            Bearer::Synonym { node, .. } => node,
        }
    }

    pub fn is_primary(self) -> bool {
        matches!(self, Bearer::Primary(_))
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: Option<String>,
    pub name: Option<String>,
    pub rank: Rank,
    pub flags: Flags,
    /// Index 0 is authoritative.
    pub source_ids: Vec<QualifiedId>,
    pub synonyms: Vec<Synonym>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) pruned: bool,
    pub(crate) division: Option<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        let mut node = Self::anonymous(parent);
        node.name = Some(name.into());
        node
    }

    pub fn anonymous(parent: Option<NodeId>) -> Self {
        Self {
            id: None,
            name: None,
            rank: Rank::NoRank,
            flags: Flags::default(),
            source_ids: Vec::new(),
            synonyms: Vec::new(),
            parent,
            children: Vec::new(),
            pruned: false,
            division: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_source_id(mut self, qid: QualifiedId) -> Self {
        self.source_ids.push(qid);
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.explicit.insert(flag);
        self
    }

    pub fn with_synonym(mut self, synonym: Synonym) -> Self {
        self.synonyms.push(synonym);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    /// Nearest enclosing division node, this node included.
    pub fn division(&self) -> Option<NodeId> {
        self.division
    }

    pub fn is_placed(&self) -> bool {
        self.flags.is_placed()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    tag: String,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    id_index: HashMap<String, NodeId>,
    name_index: HashMap<String, Vec<Bearer>>,
    qid_index: HashMap<QualifiedId, Vec<(NodeId, usize)>>,
    /// Labels marked as divisions by the last `mark_divisions`.
    division_names: HashSet<String>,
    anomalies: usize,
}

impl Taxonomy {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Data anomalies seen while building: missing names, rejected parents.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Panics on an id this taxonomy never issued.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    fn expect_node(&self, id: NodeId) -> Result<(), TaxonomyError> {
        if (id as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(TaxonomyError::NodeNotFound(id))
        }
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, TaxonomyError> {
        if let Some(parent) = node.parent {
            self.expect_node(parent)?;
        }
        if let Some(id) = &node.id {
            if let Some(&existing) = self.id_index.get(id) {
                return Err(TaxonomyError::DuplicateId {
                    id: id.clone(),
                    existing,
                });
            }
        }

        let nid = self.nodes.len() as NodeId;
        node.children.clear();
        node.pruned = node.parent.is_some_and(|p| self.node(p).pruned);
        let own = node
            .name
            .as_deref()
            .map(normalize_label)
            .filter(|l| self.division_names.contains(l))
            .map(|_| nid);
        node.division = own.or_else(|| node.parent.and_then(|p| self.node(p).division));

        match node.name.as_deref().map(normalize_label) {
            Some(label) if !label.is_empty() => {
                self.name_index
                    .entry(label)
                    .or_default()
                    .push(Bearer::Primary(nid));
            }
            _ => {
                self.anomalies += 1;
                debug!(taxonomy = %self.tag, node = nid, "node has no name");
            }
        }
        for (index, synonym) in node.synonyms.iter().enumerate() {
            self.index_synonym(nid, index, &synonym.name);
        }
        for (pos, qid) in node.source_ids.iter().enumerate() {
            self.qid_index
                .entry(qid.clone())
                .or_default()
                .push((nid, pos));
        }
        if let Some(id) = &node.id {
            self.id_index.insert(id.clone(), nid);
        }

        match node.parent {
            Some(parent) => self.nodes[parent as usize].children.push(nid),
            None => self.roots.push(nid),
        }
        self.nodes.push(node);
        Ok(nid)
    }

    fn index_synonym(&mut self, node: NodeId, index: usize, name: &str) {
        let label = normalize_label(name);
        if label.is_empty() {
            return;
        }
        self.name_index
            .entry(label)
            .or_default()
            .push(Bearer::Synonym { node, index });
    }

    pub fn add_synonym(&mut self, node: NodeId, synonym: Synonym) -> Result<(), TaxonomyError> {
        self.expect_node(node)?;
        let index = self.node(node).synonyms.len();
        self.index_synonym(node, index, &synonym.name);
        self.nodes[node as usize].synonyms.push(synonym);
        Ok(())
    }

    /// Move `child` under `parent`. The moved subtree takes the division of its
    /// new parent and becomes pruned under a pruned parent.
    ///
    /// A self-parent or a cycle is refused: the node is left as a root and the
    /// anomaly is counted.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), TaxonomyError> {
        self.expect_node(child)?;
        self.expect_node(parent)?;

        let refusal = if child == parent {
            Some(TaxonomyError::SelfParent(child))
        } else if self.is_ancestor_or_self(child, parent) {
            Some(TaxonomyError::Cycle { child, parent })
        } else {
            None
        };

        self.detach(child);
        if let Some(err) = refusal {
            self.anomalies += 1;
            warn!(taxonomy = %self.tag, %err, "parent refused, node kept as root");
            self.roots.push(child);
            self.mark_subtree(child, None);
            return Err(err);
        }

        self.nodes[parent as usize].children.push(child);
        self.nodes[child as usize].parent = Some(parent);
        if self.node(parent).pruned {
            self.prune(child)?;
        }
        let inherited = self.node(parent).division;
        self.mark_subtree(child, inherited);
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        match self.nodes[child as usize].parent.take() {
            Some(old) => self.nodes[old as usize].children.retain(|&c| c != child),
            None => self.roots.retain(|&r| r != child),
        }
    }

    /// Mark a node and its whole subtree as pruned.
    pub fn prune(&mut self, id: NodeId) -> Result<(), TaxonomyError> {
        self.expect_node(id)?;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let node = &mut self.nodes[n as usize];
            node.pruned = true;
            stack.extend(node.children.iter().copied());
        }
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Every node reachable from a root, parents before children, children in order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Every node reachable from a root, children before parents.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((n, expanded)) = stack.pop() {
            if expanded {
                out.push(n);
            } else {
                stack.push((n, true));
                stack.extend(self.children(n).iter().rev().map(|&c| (c, false)));
            }
        }
        out
    }

    /// All bearers of a label, in insertion order.
    pub fn lookup(&self, label: &str) -> &[Bearer] {
        self.name_index
            .get(&normalize_label(label))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The single live node bearing `label`, as primary name or synonym.
    pub fn unique(&self, label: &str) -> Option<NodeId> {
        let mut found = None;
        for bearer in self.lookup(label) {
            let n = bearer.node();
            if self.node(n).pruned {
                continue;
            }
            match found {
                None => found = Some(n),
                Some(f) if f == n => {}
                Some(_) => return None,
            }
        }
        found
    }

    /// Nodes carrying `qid`, with its position in each node's id list.
    pub fn with_source_id(&self, qid: &QualifiedId) -> &[(NodeId, usize)] {
        self.qid_index
            .get(qid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn label(&self, id: NodeId) -> Option<String> {
        self.node(id).name.as_deref().map(normalize_label)
    }

    /// Short identification for evidence strings: authoritative source id,
    /// then node id, then arena index.
    pub fn describe(&self, id: NodeId) -> String {
        let node = self.node(id);
        if let Some(qid) = node.source_ids.first() {
            qid.to_string()
        } else if let Some(nid) = &node.id {
            nid.clone()
        } else {
            format!("{}#{}", self.tag, id)
        }
    }

    /// Record for every node the nearest enclosing node whose name is one of `divisions`.
    /// Nodes added or moved later are marked against the same names.
    pub fn mark_divisions(&mut self, divisions: &[String]) {
        self.division_names = divisions.iter().map(|d| normalize_label(d)).collect();
        for root in self.roots.clone() {
            self.mark_subtree(root, None);
        }
    }

    fn mark_subtree(&mut self, top: NodeId, inherited: Option<NodeId>) {
        let mut stack = vec![(top, inherited)];
        while let Some((n, inherited)) = stack.pop() {
            let own = self
                .label(n)
                .filter(|l| self.division_names.contains(l))
                .map(|_| n);
            let division = own.or(inherited);
            self.nodes[n as usize].division = division;
            stack.extend(self.children(n).iter().rev().map(|&c| (c, division)));
        }
    }

    /// The node marked as the division called `name`, if this taxonomy has one.
    pub fn division_named(&self, name: &str) -> Option<NodeId> {
        self.lookup(name)
            .iter()
            .filter(|b| b.is_primary())
            .map(|b| b.node())
            .find(|&n| self.node(n).division == Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (Taxonomy, NodeId, NodeId, NodeId) {
        let mut t = Taxonomy::new("t");
        let life = t.add_node(Node::new("Life", None).with_id("1")).unwrap();
        let metazoa = t.add_node(Node::new("Metazoa", Some(life)).with_id("2")).unwrap();
        let felidae = t
            .add_node(
                Node::new("Felidae", Some(metazoa))
                    .with_id("3")
                    .with_synonym(Synonym::new("Cats", "common name")),
            )
            .unwrap();
        (t, life, metazoa, felidae)
    }

    #[test]
    fn name_index_holds_primaries_and_synonyms() {
        let (t, _, _, felidae) = small();
        assert_eq!(t.lookup("Felidae"), &[Bearer::Primary(felidae)]);
        assert_eq!(t.lookup("Cats"), &[Bearer::Synonym { node: felidae, index: 0 }]);
        assert_eq!(t.lookup(" Cats "), t.lookup("Cats"));
        assert!(t.lookup("Canidae").is_empty());
        assert_eq!(t.unique("Cats"), Some(felidae));
        assert_eq!(t.by_id("3"), Some(felidae));
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let (mut t, life, _, _) = small();
        let err = t.add_node(Node::new("Other", Some(life)).with_id("2")).unwrap_err();
        assert_eq!(err, TaxonomyError::DuplicateId { id: "2".into(), existing: 1 });
    }

    #[test]
    fn unknown_parent_is_refused() {
        let mut t = Taxonomy::new("t");
        assert_eq!(
            t.add_node(Node::new("x", Some(7))).unwrap_err(),
            TaxonomyError::NodeNotFound(7)
        );
    }

    #[test]
    fn cycle_leaves_node_as_root() {
        let (mut t, life, metazoa, felidae) = small();
        let err = t.set_parent(metazoa, felidae).unwrap_err();
        assert_eq!(err, TaxonomyError::Cycle { child: metazoa, parent: felidae });
        assert_eq!(t.parent(metazoa), None);
        assert!(t.roots().contains(&metazoa));
        assert!(!t.children(life).contains(&metazoa));
        assert_eq!(t.anomalies(), 1);

        let err = t.set_parent(life, life).unwrap_err();
        assert_eq!(err, TaxonomyError::SelfParent(life));
        assert_eq!(t.roots().iter().filter(|&&r| r == life).count(), 1);
    }

    #[test]
    fn reparenting_moves_child() {
        let (mut t, life, metazoa, felidae) = small();
        t.set_parent(felidae, life).unwrap();
        assert_eq!(t.children(life), &[metazoa, felidae]);
        assert!(t.children(metazoa).is_empty());
        assert_eq!(t.ancestors(felidae).collect::<Vec<_>>(), vec![life]);
    }

    #[test]
    fn traversal_orders() {
        let (mut t, life, metazoa, felidae) = small();
        let fungi = t.add_node(Node::new("Fungi", Some(life))).unwrap();
        assert_eq!(t.preorder(), vec![life, metazoa, felidae, fungi]);
        assert_eq!(t.postorder(), vec![felidae, metazoa, fungi, life]);
    }

    #[test]
    fn pruning_hides_from_unique() {
        let (mut t, _, metazoa, felidae) = small();
        t.prune(metazoa).unwrap();
        assert!(t.node(felidae).is_pruned());
        assert_eq!(t.unique("Felidae"), None);
    }

    #[test]
    fn divisions_are_inherited() {
        let (mut t, life, metazoa, felidae) = small();
        t.mark_divisions(&["Metazoa".to_string()]);
        assert_eq!(t.node(life).division(), None);
        assert_eq!(t.node(metazoa).division(), Some(metazoa));
        assert_eq!(t.node(felidae).division(), Some(metazoa));
        assert_eq!(t.division_named("Metazoa"), Some(metazoa));
        assert_eq!(t.division_named("Felidae"), None);
    }

    #[test]
    fn later_nodes_take_divisions() {
        let (mut t, life, metazoa, felidae) = small();
        t.mark_divisions(&["Metazoa".to_string(), "Fungi".to_string()]);
        let felis = t.add_node(Node::new("Felis", Some(felidae))).unwrap();
        let fungi = t.add_node(Node::new("Fungi", Some(life))).unwrap();
        let amanita = t.add_node(Node::new("Amanita", Some(fungi))).unwrap();
        let stray = t.add_node(Node::new("Stray", Some(life))).unwrap();

        assert_eq!(t.node(felis).division(), Some(metazoa));
        assert_eq!(t.node(fungi).division(), Some(fungi));
        assert_eq!(t.node(amanita).division(), Some(fungi));
        assert_eq!(t.node(stray).division(), None);
    }

    #[test]
    fn moved_subtree_takes_new_division_and_pruning() {
        let (mut t, life, metazoa, felidae) = small();
        let fungi = t.add_node(Node::new("Fungi", Some(life))).unwrap();
        let felis = t.add_node(Node::new("Felis", Some(felidae))).unwrap();
        t.mark_divisions(&["Metazoa".to_string(), "Fungi".to_string()]);
        assert_eq!(t.node(felis).division(), Some(metazoa));

        t.set_parent(felidae, fungi).unwrap();
        assert_eq!(t.node(felidae).division(), Some(fungi));
        assert_eq!(t.node(felis).division(), Some(fungi));
        assert!(!t.node(felis).is_pruned());

        let attic = t.add_node(Node::new("Attic", None)).unwrap();
        t.prune(attic).unwrap();
        t.set_parent(felidae, attic).unwrap();
        assert!(t.node(felidae).is_pruned());
        assert!(t.node(felis).is_pruned());
        assert_eq!(t.node(felis).division(), None);
        assert_eq!(t.unique("Felis"), None);
    }

    #[test]
    fn nameless_nodes_are_counted() {
        let mut t = Taxonomy::new("t");
        t.add_node(Node::anonymous(None)).unwrap();
        assert_eq!(t.anomalies(), 1);
    }
}
