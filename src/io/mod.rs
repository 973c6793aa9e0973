//! Input files: target specifications and genotype seeds.
//!
//! - [`SpecFile`] / [`Target`]: line-oriented sum-of-products target files
//! - [`seed`]: bootstrap genotypes from an expression file or a structural
//!   Verilog netlist
//!
//! Every malformed input is reported as a [`LoadError`]; none is recoverable.

mod expr;
pub mod seed;
mod target;

pub use expr::{Literal, SumOfProducts};
pub use target::{SpecFile, Target};

use std::path::PathBuf;

/// Errors raised while reading specification or seed files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("expected {expected} output expressions, found {found}")]
    OutputCount { expected: usize, found: usize },
    #[error("{what} mismatch: target has {expected}, file has {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("seed does not fit in {available} columns")]
    GateOverflow { available: usize },
    #[error("seeded gate at column {column} reads {index}, outside the levels-back window")]
    LevelsBack { column: usize, index: usize },
    #[error("output `{0}` is never driven")]
    Undriven(String),
    #[error("{got} inputs exceed the supported maximum of {max}")]
    TooManyInputs { got: usize, max: usize },
    #[error("seeded genotype is invalid: {0}")]
    InvalidSeed(String),
}

impl LoadError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        LoadError::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Reads a whole file, attaching the path to I/O errors.
pub(crate) fn read_file(path: &std::path::Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
