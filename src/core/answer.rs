use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::NodeId;

/// Ordinal verdict of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    StrongNo,
    No,
    Dunno,
    WeakYes,
    Yes,
    StrongYes,
}

impl Score {
    pub fn is_veto(self) -> bool {
        self < Score::Dunno
    }

    pub fn is_positive(self) -> bool {
        self > Score::Dunno
    }
}

/// Scored, justified outcome of comparing a source node to a union node, or of
/// explaining why a source node maps nowhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub subject: NodeId,
    pub target: Option<NodeId>,
    pub score: Score,
    pub reason: String,
    pub evidence: Option<String>,
}

impl Answer {
    pub fn new(
        subject: NodeId,
        target: Option<NodeId>,
        score: Score,
        reason: impl Into<String>,
        evidence: Option<String>,
    ) -> Self {
        Self {
            subject,
            target,
            score,
            reason: reason.into(),
            evidence,
        }
    }

    pub fn dunno(subject: NodeId, target: NodeId) -> Self {
        Self::new(subject, Some(target), Score::Dunno, "dunno", None)
    }

    pub fn strong_no(subject: NodeId, target: NodeId, reason: &str, evidence: Option<String>) -> Self {
        Self::new(subject, Some(target), Score::StrongNo, reason, evidence)
    }

    pub fn no(subject: NodeId, target: NodeId, reason: &str, evidence: Option<String>) -> Self {
        Self::new(subject, Some(target), Score::No, reason, evidence)
    }

    pub fn weak_yes(subject: NodeId, target: NodeId, reason: &str, evidence: Option<String>) -> Self {
        Self::new(subject, Some(target), Score::WeakYes, reason, evidence)
    }

    pub fn yes(subject: NodeId, target: NodeId, reason: &str, evidence: Option<String>) -> Self {
        Self::new(subject, Some(target), Score::Yes, reason, evidence)
    }

    pub fn strong_yes(subject: NodeId, target: NodeId, reason: &str, evidence: Option<String>) -> Self {
        Self::new(subject, Some(target), Score::StrongYes, reason, evidence)
    }

    pub fn is_unresolved(&self) -> bool {
        self.reason.starts_with("unresolved/")
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ", self.subject)?;
        match self.target {
            Some(t) => write!(f, "{t}")?,
            None => f.write_str("-")?,
        }
        write!(f, " {:?} {}", self.score, self.reason)?;
        if let Some(e) = &self.evidence {
            write!(f, " [{e}]")?;
        }
        Ok(())
    }
}
