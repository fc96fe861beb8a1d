// group (matrix) matching: all nodes sharing one label, scored criterion by criterion
//
// A cell (row = source node, column = union node) is committed only when it is
// both the unique best of its row and the unique best of its column for the
// current criterion. Vetoes suppress a cell for good; a commit excludes the rest
// of its row and column. Rows left unmapped get a postmortem explaining why.
use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::core::alignment::Alignment;
use crate::core::answer::{Answer, Score};
use crate::core::criteria::{Criterion, Scope};
use crate::core::taxonomy::Taxonomy;
use crate::core::types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cell {
    Open,
    Vetoed(Answer),
    /// Row or column taken by a commit elsewhere in the matrix.
    Excluded,
    Committed,
}

impl Cell {
    fn is_open(&self) -> bool {
        matches!(self, Cell::Open)
    }

    fn survives(&self) -> bool {
        !matches!(self, Cell::Vetoed(_))
    }
}

/// Best score seen so far in a row or column, and whether it is held by one cell only.
#[derive(Debug, Clone, Copy)]
enum Best {
    Nothing,
    Unique(usize, Score),
    Tied(Score),
}

impl Best {
    fn offer(&mut self, index: usize, score: Score) {
        *self = match *self {
            Best::Nothing => Best::Unique(index, score),
            Best::Unique(_, s) | Best::Tied(s) if score > s => Best::Unique(index, score),
            Best::Unique(_, s) if score == s => Best::Tied(s),
            other => other,
        };
    }

    fn unique(self) -> Option<usize> {
        match self {
            Best::Unique(index, _) => Some(index),
            _ => None,
        }
    }
}

pub struct Matrix {
    label: String,
    rows: Vec<NodeId>,
    cols: Vec<NodeId>,
    cells: Vec<Vec<Cell>>,
}

impl Matrix {
    pub fn new(label: impl Into<String>, rows: Vec<NodeId>, cols: Vec<NodeId>) -> Self {
        let cells = vec![vec![Cell::Open; cols.len()]; rows.len()];
        Self {
            label: label.into(),
            rows,
            cols,
            cells,
        }
    }

    pub fn run(&mut self, scope: &Scope<'_>, alignment: &mut Alignment) {
        for criterion in Criterion::ALL {
            self.run_criterion(scope, alignment, criterion);
        }
        self.postmortem(scope, alignment);
    }

    fn run_criterion(&mut self, scope: &Scope<'_>, alignment: &mut Alignment, criterion: Criterion) {
        let m = self.rows.len();
        let n = self.cols.len();
        let mut row_best = vec![Best::Nothing; m];
        let mut col_best = vec![Best::Nothing; n];
        let mut answers: Vec<Vec<Option<Answer>>> = vec![vec![None; n]; m];

        for i in 0..m {
            let node = self.rows[i];
            for j in 0..n {
                if !self.cells[i][j].is_open() {
                    continue;
                }
                let unode = self.cols[j];
                let z = criterion.assess(scope, alignment, node, unode);
                if z.score == Score::Dunno {
                    continue;
                }
                if scope.is_of_interest(node) {
                    info!(label = %self.label, %criterion, answer = %z, "assessed");
                }
                if z.score.is_veto() {
                    alignment.note(z.clone());
                    self.cells[i][j] = Cell::Vetoed(z);
                    continue;
                }
                row_best[i].offer(j, z.score);
                col_best[j].offer(i, z.score);
                answers[i][j] = Some(z);
            }
        }

        for i in 0..m {
            let Some(j) = row_best[i].unique() else {
                continue;
            };
            if col_best[j].unique() != Some(i) || !self.cells[i][j].is_open() {
                continue;
            }
            let Some(z) = answers[i][j].take() else {
                continue;
            };
            self.settle(scope, alignment, criterion, i, j, z);
        }
    }

    /// Try to commit the doubly unique cell (i, j).
    fn settle(
        &mut self,
        scope: &Scope<'_>,
        alignment: &mut Alignment,
        criterion: Criterion,
        i: usize,
        j: usize,
        z: Answer,
    ) {
        let node = self.rows[i];
        let unode = self.cols[j];

        if let Some(existing) = alignment.mapping_of(node).filter(|&e| e != unode) {
            let lost = Answer::no(
                node,
                unode,
                &format!("lost-race-to-source({criterion})"),
                Some(format!(
                    "{} lost to {}",
                    scope.union.describe(unode),
                    scope.union.describe(existing)
                )),
            );
            warn!(label = %self.label, answer = %lost, "race");
            alignment.note(lost.clone());
            self.cells[i][j] = Cell::Vetoed(lost);
            return;
        }
        if let Some(claimant) = alignment.comapping_of(unode).filter(|&c| c != node) {
            let lost = Answer::no(
                node,
                unode,
                &format!("lost-race-to-union({criterion})"),
                Some(scope.source.describe(claimant)),
            );
            warn!(label = %self.label, answer = %lost, "race");
            alignment.note(lost.clone());
            self.cells[i][j] = Cell::Vetoed(lost);
            return;
        }
        let stronger = alignment
            .decision_of(node)
            .filter(|existing| alignment.mapping_of(node).is_none() && existing.score >= z.score)
            .map(|existing| format!("blocked-because-{}", existing.reason));
        if let Some(reason) = stronger {
            let blocked = Answer::no(node, unode, &reason, None);
            debug!(label = %self.label, answer = %blocked, "earlier decision kept");
            alignment.note(blocked.clone());
            self.cells[i][j] = Cell::Vetoed(blocked);
            return;
        }

        let decision = Answer::new(node, Some(unode), z.score, "confirmed", Some(z.reason));
        if alignment.commit(node, unode, decision).is_err() {
            return;
        }
        for jj in 0..self.cols.len() {
            if jj != j && self.cells[i][jj].is_open() {
                self.cells[i][jj] = Cell::Excluded;
            }
        }
        for ii in 0..self.rows.len() {
            if ii != i && self.cells[ii][j].is_open() {
                self.cells[ii][j] = Cell::Excluded;
            }
        }
        self.cells[i][j] = Cell::Committed;
    }

    /// Explain every row that ended up unmapped.
    fn postmortem(&mut self, scope: &Scope<'_>, alignment: &mut Alignment) {
        for i in 0..self.rows.len() {
            let node = self.rows[i];
            if alignment.mapping_of(node).is_some() {
                continue;
            }
            let survivors: Vec<usize> = (0..self.cols.len())
                .filter(|&j| self.cells[i][j].survives())
                .collect();

            let explanation = match survivors.as_slice() {
                [] => self.blocked(scope, alignment, i),
                &[j] => match self.sole_survivor(scope, alignment, i, j) {
                    Some(answer) => answer,
                    None => continue,
                },
                many => Answer::new(
                    node,
                    None,
                    Score::Dunno,
                    "unresolved/ambiguous",
                    Some(join_ids(many.iter().map(|&j| scope.union.describe(self.cols[j])))),
                ),
            };
            alignment.set_decision(explanation);
        }
    }

    /// One union node left for row i. Returns `None` when the row was committed by elimination.
    fn sole_survivor(&mut self, scope: &Scope<'_>, alignment: &mut Alignment, i: usize, j: usize) -> Option<Answer> {
        let node = self.rows[i];
        let unode = self.cols[j];

        if let Some(claimant) = alignment.comapping_of(unode) {
            return Some(Answer::new(
                node,
                Some(unode),
                Score::Dunno,
                "unresolved/lumping",
                Some(scope.source.describe(claimant)),
            ));
        }

        let rivals: Vec<NodeId> = (0..self.rows.len())
            .filter(|&ii| ii != i && self.cells[ii][j].is_open())
            .map(|ii| self.rows[ii])
            .filter(|&r| alignment.mapping_of(r).is_none())
            .collect();
        if rivals.is_empty() && self.cells[i][j].is_open() && alignment.decision_of(node).is_none() {
            let decision = Answer::new(
                node,
                Some(unode),
                Score::WeakYes,
                "confirmed",
                Some("by-elimination".to_string()),
            );
            if alignment.commit(node, unode, decision).is_ok() {
                self.cells[i][j] = Cell::Committed;
                return None;
            }
        }

        Some(Answer::new(
            node,
            Some(unode),
            Score::Dunno,
            "unresolved/ambiguous",
            Some(join_ids(rivals.iter().map(|&r| scope.source.describe(r)))),
        ))
    }

    /// Every candidate of row i was vetoed; gather the strongest reasons.
    fn blocked(&self, scope: &Scope<'_>, alignment: &mut Alignment, i: usize) -> Answer {
        let node = self.rows[i];
        let cap = scope.config.blocked_reason_cap;
        let vetoes: Vec<&Answer> = self.cells[i]
            .iter()
            .filter_map(|c| match c {
                Cell::Vetoed(a) => Some(a),
                _ => None,
            })
            .collect();

        let Some(badness) = vetoes.iter().map(|a| a.score).max() else {
            alignment.stats_mut().internal_warnings += 1;
            warn!(label = %self.label, node, "blocked row with no recorded reasons");
            return Answer::new(node, None, Score::No, "unresolved/blocked", None);
        };

        let mut reasons: Vec<String> = vetoes
            .iter()
            .take(cap)
            .map(|a| match &a.evidence {
                Some(e) => format!("{}({})", a.reason, e),
                None => a.reason.clone(),
            })
            .collect();
        if vetoes.len() > cap {
            reasons.push("...".to_string());
        }
        Answer::new(node, None, badness, "unresolved/blocked", Some(reasons.join(",")))
    }
}

fn join_ids(ids: impl Iterator<Item = String>) -> String {
    ids.collect::<Vec<_>>().join(",")
}

/// Live owners of a label, deduplicated, in index order.
fn bearers_of(tree: &Taxonomy, label: &str) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    tree.lookup(label)
        .iter()
        .map(|b| b.node())
        .filter(|&n| !tree.node(n).is_pruned())
        .filter(|&n| seen.insert(n))
        .collect()
}

/// Labels shared by the two trees, ordered so that primary/primary pairs are
/// settled before pairs that go through a synonym on either side.
pub fn schedule(source: &Taxonomy, union: &Taxonomy) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut todo = Vec::new();
    let mut push = |label: String, todo: &mut Vec<String>| {
        if seen.insert(label.clone()) {
            todo.push(label);
        }
    };

    let source_order = source.preorder();
    for &node in &source_order {
        if let Some(label) = source.label(node) {
            if union.lookup(&label).iter().any(|b| b.is_primary()) {
                push(label, &mut todo);
            }
        }
    }
    for unode in union.preorder() {
        if let Some(label) = union.label(unode) {
            if !source.lookup(&label).is_empty() {
                push(label, &mut todo);
            }
        }
    }
    for &node in &source_order {
        if let Some(label) = source.label(node) {
            if !union.lookup(&label).is_empty() {
                push(label, &mut todo);
            }
        }
    }
    todo
}

pub fn align_by_groups(scope: &Scope<'_>, alignment: &mut Alignment) {
    for label in schedule(scope.source, scope.union) {
        let rows = bearers_of(scope.source, &label);
        let cols = bearers_of(scope.union, &label);
        if rows.is_empty() || cols.is_empty() {
            continue;
        }
        alignment.stats_mut().names_in_common += 1;
        if rows.len() * cols.len() > scope.config.homonym_warning_threshold {
            alignment.stats_mut().badly_homonymic += 1;
            warn!(%label, sources = rows.len(), unions = cols.len(), "badly homonymic");
        }
        Matrix::new(label, rows, cols).run(scope, alignment);
    }
}
