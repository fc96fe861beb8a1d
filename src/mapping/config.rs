use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::normalize_label;
use crate::mapping::FormatError;

/// Which matching engine drives a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Per-label matrices with row and column uniqueness.
    #[default]
    Group,
    /// Per-node winnowing of the candidate set.
    Cascade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub strategy: Strategy,
    /// Names of the major divisions of life, marked in both taxonomies before a run.
    pub divisions: Vec<String>,
    /// How many source ancestors the lineage criterion inspects.
    pub lineage_depth: usize,
    /// Groups with more source x union pairs than this are reported as badly homonymic.
    pub homonym_warning_threshold: usize,
    /// Veto reasons listed in an `unresolved/blocked` explanation before truncation.
    pub blocked_reason_cap: usize,
    /// Labels whose every assessment is logged at info level.
    pub names_of_interest: BTreeSet<String>,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Group,
            divisions: default_divisions(),
            lineage_depth: 8,
            homonym_warning_threshold: 100,
            blocked_reason_cap: 5,
            names_of_interest: BTreeSet::new(),
        }
    }
}

fn default_divisions() -> Vec<String> {
    [
        "Archaea",
        "Bacteria",
        "Eukaryota",
        "Metazoa",
        "Fungi",
        "Chloroplastida",
        "Rhodophyta",
        "SAR",
        "Haptophyta",
        "Cryptophyta",
        "Amoebozoa",
        "Excavata",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl AlignConfig {
    pub fn from_toon(text: &str) -> Result<Self, FormatError> {
        Ok(toon_format::decode_default(text)?)
    }

    pub fn to_toon(&self) -> Result<String, FormatError> {
        Ok(toon_format::encode_default(self)?)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn is_of_interest(&self, label: &str) -> bool {
        !self.names_of_interest.is_empty()
            && self.names_of_interest.contains(&normalize_label(label))
    }
}
