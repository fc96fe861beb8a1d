// shared value types for both taxonomies
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node inside the arena of one taxonomy.
///
/// Ids are only meaningful for the taxonomy that issued them; a source id and a
/// union id with the same value are unrelated.
pub type NodeId = u32;

/// (origin, local id) pair naming a record in some upstream taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedId {
    pub origin: String,
    pub local_id: String,
}

impl QualifiedId {
    pub fn new(origin: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            local_id: local_id.into(),
        }
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.local_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[default]
    NoRank,
    Domain,
    Kingdom,
    Phylum,
    Class,
    Order,
    Superfamily,
    Family,
    Subfamily,
    Tribe,
    Genus,
    Subgenus,
    Section,
    Species,
    Subspecies,
    Variety,
    Forma,
}

/// Ranks that may legitimately describe the same taxon across curations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankGroup {
    Higher,
    FamilyGroup,
    GenusGroup,
    SpeciesGroup,
}

impl Rank {
    pub fn is_asserted(self) -> bool {
        self != Rank::NoRank
    }

    pub fn group(self) -> Option<RankGroup> {
        match self {
            Rank::NoRank => None,
            Rank::Domain | Rank::Kingdom | Rank::Phylum | Rank::Class | Rank::Order => {
                Some(RankGroup::Higher)
            }
            Rank::Superfamily | Rank::Family | Rank::Subfamily | Rank::Tribe => {
                Some(RankGroup::FamilyGroup)
            }
            Rank::Genus | Rank::Subgenus | Rank::Section => Some(RankGroup::GenusGroup),
            Rank::Species | Rank::Subspecies | Rank::Variety | Rank::Forma => {
                Some(RankGroup::SpeciesGroup)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::NoRank => "no rank",
            Rank::Domain => "domain",
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Superfamily => "superfamily",
            Rank::Family => "family",
            Rank::Subfamily => "subfamily",
            Rank::Tribe => "tribe",
            Rank::Genus => "genus",
            Rank::Subgenus => "subgenus",
            Rank::Section => "section",
            Rank::Species => "species",
            Rank::Subspecies => "subspecies",
            Rank::Variety => "variety",
            Rank::Forma => "forma",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Extinct,
    IncertaeSedis,
    Unplaced,
    Hidden,
    Barren,
    Environmental,
}

/// Flags asserted by the curators, kept apart from the ones derived from ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub explicit: BTreeSet<Flag>,
    pub inferred: BTreeSet<Flag>,
}

impl Flags {
    pub fn has(&self, flag: Flag) -> bool {
        self.explicit.contains(&flag) || self.inferred.contains(&flag)
    }

    pub fn is_placed(&self) -> bool {
        !self.has(Flag::IncertaeSedis) && !self.has(Flag::Unplaced)
    }
}

/// Canonical form of a label: trimmed, with inner whitespace runs collapsed to one space.
pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_collapse_whitespace() {
        assert_eq!(normalize_label("Bacteria "), "Bacteria");
        assert_eq!(normalize_label("  Homo   sapiens\t"), "Homo sapiens");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn rank_groups_separate_family_from_genus() {
        assert_eq!(Rank::Family.group(), Some(RankGroup::FamilyGroup));
        assert_eq!(Rank::Genus.group(), Some(RankGroup::GenusGroup));
        assert_ne!(Rank::Family.group(), Rank::Genus.group());
        assert_eq!(Rank::NoRank.group(), None);
        assert!(!Rank::NoRank.is_asserted());
    }

    #[test]
    fn inferred_incertae_sedis_unplaces() {
        let mut flags = Flags::default();
        assert!(flags.is_placed());
        flags.inferred.insert(Flag::IncertaeSedis);
        assert!(!flags.is_placed());
        assert!(flags.has(Flag::IncertaeSedis));
    }

    #[test]
    fn qualified_id_displays_origin_first() {
        assert_eq!(QualifiedId::new("ncbi", "9681").to_string(), "ncbi:9681");
    }
}
