// summary of a finished run, and the decision log as plain rows
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::alignment::{Alignment, RunStats};
use crate::core::answer::{Answer, Score};
use crate::core::taxonomy::Taxonomy;
use crate::mapping::FormatError;
use crate::mapping::config::{AlignConfig, Strategy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub source: String,
    pub union: String,
    pub strategy: Strategy,
    pub source_nodes: usize,
    pub mapped: usize,
    pub reasons: BTreeMap<String, usize>,
    pub stats: RunStats,
    /// Data anomalies counted while the two taxonomies were built.
    pub source_anomalies: usize,
    pub union_anomalies: usize,
}

impl AlignmentReport {
    pub fn build(alignment: &Alignment, source: &Taxonomy, union: &Taxonomy, config: &AlignConfig) -> Self {
        Self {
            source: source.tag().to_string(),
            union: union.tag().to_string(),
            strategy: config.strategy,
            source_nodes: source.len(),
            mapped: alignment.mapped_count(),
            reasons: alignment.count_by_reason(),
            stats: alignment.stats().clone(),
            source_anomalies: source.anomalies(),
            union_anomalies: union.anomalies(),
        }
    }

    pub fn to_toon(&self) -> Result<String, FormatError> {
        Ok(toon_format::encode_default(self)?)
    }
}

/// One decision log entry with both nodes described for readers outside the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub subject: String,
    pub target: Option<String>,
    pub score: Score,
    pub reason: String,
    pub evidence: Option<String>,
}

impl LogRow {
    pub fn from_answer(answer: &Answer, source: &Taxonomy, union: &Taxonomy) -> Self {
        Self {
            subject: source.describe(answer.subject),
            target: answer.target.map(|t| union.describe(t)),
            score: answer.score,
            reason: answer.reason.clone(),
            evidence: answer.evidence.clone(),
        }
    }
}

#[derive(Serialize)]
struct LogTable<'a> {
    log: &'a [LogRow],
}

pub fn log_rows(alignment: &Alignment, source: &Taxonomy, union: &Taxonomy) -> Vec<LogRow> {
    alignment
        .log()
        .iter()
        .map(|a| LogRow::from_answer(a, source, union))
        .collect()
}

pub fn log_to_toon(rows: &[LogRow]) -> Result<String, FormatError> {
    Ok(toon_format::encode_default(&LogTable { log: rows })?)
}
