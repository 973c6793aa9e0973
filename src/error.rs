//! Crate-wide error type.
//!
//! Every error here is fatal to a run: it reports a broken precondition
//! (bad configuration, malformed input file, or a genotype that violates
//! the encoding invariant), never a search outcome.

use crate::cgp::ConfigError;
use crate::io::LoadError;

/// Top-level error returned by fallible crate operations.
#[derive(Debug, thiserror::Error)]
pub enum CgpError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("unified index {index} out of range (limit {limit})")]
    IndexOutOfRange { index: usize, limit: usize },
    #[error("gate at column {column} connects to {index}, outside its levels-back window")]
    LevelsBackViolation { column: usize, index: usize },
    #[error("genotype shape mismatch: {0}")]
    ShapeMismatch(String),
}
