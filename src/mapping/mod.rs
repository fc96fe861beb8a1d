use thiserror::Error;

pub mod config;
pub mod generator;
pub mod report;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("toon: {0}")]
    Toon(#[from] toon_format::ToonError),
}
