//! Alignment of a source taxonomy against a union taxonomy.
//!
//! The engine lives in [`core`]; [`mapping`] holds the run entry point,
//! its configuration and the report built from a finished run.

pub mod core;
pub mod mapping;

pub use crate::core::alignment::{Alignment, RunStats};
pub use crate::core::answer::{Answer, Score};
pub use crate::core::taxonomy::{Node, Synonym, Taxonomy};
pub use crate::core::types::{Flag, NodeId, QualifiedId, Rank};
pub use crate::mapping::config::{AlignConfig, Strategy};
pub use crate::mapping::generator::align;
pub use crate::mapping::report::AlignmentReport;
