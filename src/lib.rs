//! Cartesian Genetic Programming for combinational logic circuits.
//!
//! Evolves gate-level netlists that implement a target Boolean
//! specification, then refines them:
//!
//! - **Feasibility search**: (1 + λ) evolution until the circuit is
//!   functionally equivalent to the target, checked exactly with a BDD.
//! - **Single-objective optimization**: transistor-count minimization at
//!   zero error.
//! - **Multi-objective optimization**: NSGA-II or adaptive-population
//!   selection over functional error, critical-path delay, and switching
//!   power, with a mean-relative-error feasibility constraint.
//!
//! # Modules
//!
//! - [`bdd`]: Reduced ordered BDD engine with arena compaction
//! - [`cgp`]: Genotype, mutation operators, population, selection, runner
//! - [`io`]: Target specification files and genotype seeds
//! - [`random`]: Seeded RNG helpers
//!
//! # Example
//!
//! ```
//! use u_cgp::bdd::BddManager;
//! use u_cgp::cgp::{CgpConfig, CgpRunner, MutationStrategy};
//! use u_cgp::io::SpecFile;
//!
//! let spec = SpecFile::parse(".inputs 2\n.outputs 1\ni0 & !i1 | !i0 & i1\n").unwrap();
//! let mut engine = BddManager::new(spec.num_inputs, 1 << 12);
//! let mut target = spec.build(&mut engine);
//!
//! let config = CgpConfig::default()
//!     .with_columns(6)
//!     .with_mutation(MutationStrategy::GuidedActive)
//!     .with_evaluation_budget(50_000)
//!     .with_stagnation_limit(1_000)
//!     .with_seed(11);
//! let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();
//! assert_eq!(result.best.fitness().error, 0);
//! ```

pub mod bdd;
pub mod cgp;
pub mod error;
pub mod io;
pub mod random;

pub use error::CgpError;
