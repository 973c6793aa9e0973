//! Boolean function engine.
//!
//! A reduced ordered binary decision diagram (ROBDD) manager. Functions are
//! canonical: two handles are equal iff they denote the same function, so
//! equivalence checking is a handle comparison and Hamming distance between
//! two functions is `sat_count(xor(f, g))`.
//!
//! # Key Types
//!
//! - [`Bdd`]: Copyable handle to a function owned by a manager
//! - [`BddManager`]: Node arena, unique table, operation cache, compaction
//!
//! # References
//!
//! - Bryant (1986), "Graph-Based Algorithms for Boolean Function Manipulation"
//! - Brace, Rudell & Bryant (1990), "Efficient Implementation of a BDD Package"

mod manager;

pub use manager::{Bdd, BddManager, MAX_VARS};
