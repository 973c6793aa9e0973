//! Cartesian Genetic Programming for combinational circuits.
//!
//! A circuit is a single row of two-input gates. Each gate may read a
//! primary input or any gate within `levels_back` columns to its left, so
//! every genotype is a feed-forward netlist by construction. Evolution is
//! driven by [`CgpRunner`]: a (1 + λ) feasibility search on functional
//! error, followed by either transistor minimization or multi-objective
//! (error, delay, power) optimization.
//!
//! # Key Types
//!
//! - [`Genotype`]: Gate list plus output connections, with cached fitness
//! - [`CgpConfig`]: Run parameters; [`CircuitLayout`]: genotype shape
//! - [`Population`]: Fixed-capacity population with NSGA-II / APS selection
//! - [`CgpRunner`]: Executes the two-phase search, returns [`CgpResult`]
//!
//! # Submodules
//!
//! - [`operators`]: Point, single-active, guided-active and hybrid mutation
//! - [`multi_objective`]: Constrained dominance, non-dominated sorting and
//!   crowding distance
//!
//! # References
//!
//! - Miller & Thomson (2000), "Cartesian Genetic Programming", *EuroGP*
//! - Goldman & Punch (2013), "Reducing wasted evaluations in CGP", *EuroGP*
//! - Vašíček & Sekanina (2011), "Formal verification of candidate solutions
//!   for post-synthesis evolutionary optimization", *IEEE TCAD*
//! - Deb et al. (2002), *A Fast and Elitist Multiobjective GA: NSGA-II*

mod config;
pub(crate) mod genotype;
pub mod multi_objective;
pub mod operators;
mod population;
mod runner;
mod selection;
mod technology;
mod types;

pub use config::{CgpConfig, CircuitLayout, ConfigError, Objective, DEFAULT_COLUMNS};
pub use genotype::Genotype;
pub use operators::MutationStrategy;
pub use population::Population;
pub use runner::{CgpResult, CgpRunner, LogReporter, Outcome, Phase, Reporter, Snapshot};
pub use selection::{best_by_error, best_optimized, SelectionStrategy};
pub use technology::TechnologyModel;
pub use types::{Fitness, Gate, GateKind, Gene};
