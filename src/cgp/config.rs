//! CGP configuration.
//!
//! [`CgpConfig`] holds every parameter of a run; [`CircuitLayout`] holds the
//! genotype shape derived from it and the target. Both are immutable once a
//! run starts and are passed explicitly to every component.

use super::operators::MutationStrategy;
use super::selection::SelectionStrategy;
use super::technology::TechnologyModel;
use crate::bdd::MAX_VARS;

/// Column count used when neither the configuration nor the target gives one.
pub const DEFAULT_COLUMNS: usize = 100;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("population_size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("evaluation_budget must be positive")]
    ZeroBudget,
    #[error("circuit must have at least one input")]
    NoInputs,
    #[error("circuit must have at least one output")]
    NoOutputs,
    #[error("{got} inputs exceed the supported maximum of {max}")]
    TooManyInputs { got: usize, max: usize },
    #[error("column count must be at least 1")]
    NoColumns,
    #[error("levels_back must be at least 1")]
    NoLevelsBack,
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("unknown mutation strategy `{0}` (expected pm, sam, gam or sg)")]
    UnknownMutation(String),
    #[error("unknown selection strategy `{0}` (expected so, nsga2 or aps)")]
    UnknownSelection(String),
    #[error("unknown gate function `{0}`")]
    UnknownGate(String),
}

/// Which optimization phase follows a successful feasibility search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Objective {
    /// Minimize transistor count at zero error.
    #[default]
    Single,
    /// Jointly minimize error, delay and power (NSGA-II or APS).
    Multi,
}

/// Shape of a genotype: primary inputs, outputs, gate columns, levels-back.
///
/// # Example
///
/// ```
/// use u_cgp::cgp::CircuitLayout;
///
/// let layout = CircuitLayout::new(3, 2, 10, 50).unwrap();
/// assert_eq!(layout.levels_back, 10); // clamped to the column count
/// assert_eq!(layout.unified_len(), 13);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircuitLayout {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub columns: usize,
    pub levels_back: usize,
}

impl CircuitLayout {
    /// Creates a validated layout. `levels_back` is clamped to `columns`.
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        columns: usize,
        levels_back: usize,
    ) -> Result<Self, ConfigError> {
        let layout = Self {
            num_inputs,
            num_outputs,
            columns,
            levels_back: levels_back.min(columns),
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Checks the layout bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_inputs == 0 {
            return Err(ConfigError::NoInputs);
        }
        if self.num_inputs > MAX_VARS {
            return Err(ConfigError::TooManyInputs {
                got: self.num_inputs,
                max: MAX_VARS,
            });
        }
        if self.num_outputs == 0 {
            return Err(ConfigError::NoOutputs);
        }
        if self.columns == 0 {
            return Err(ConfigError::NoColumns);
        }
        if self.levels_back == 0 {
            return Err(ConfigError::NoLevelsBack);
        }
        Ok(())
    }

    /// Size of the unified index space (primary inputs + gates).
    pub fn unified_len(&self) -> usize {
        self.num_inputs + self.columns
    }

    /// Total number of genes (three per column plus one per output).
    pub fn gene_count(&self) -> usize {
        3 * self.columns + self.num_outputs
    }

    /// First gate index a gate at `column` may connect to.
    pub fn window_start(&self, column: usize) -> usize {
        (column + self.num_inputs)
            .saturating_sub(self.levels_back)
            .max(self.num_inputs)
    }

    /// Number of indices a gate at `column` may connect to.
    pub fn connection_count(&self, column: usize) -> usize {
        self.num_inputs + (column + self.num_inputs - self.window_start(column))
    }

    /// The `k`-th allowed connection of a gate at `column`, in ascending order.
    pub fn connection_at(&self, column: usize, k: usize) -> usize {
        if k < self.num_inputs {
            k
        } else {
            self.window_start(column) + (k - self.num_inputs)
        }
    }

    /// Position of `index` among the allowed connections of `column`, if allowed.
    pub fn connection_position(&self, column: usize, index: usize) -> Option<usize> {
        if index < self.num_inputs {
            Some(index)
        } else if index >= self.window_start(column) && index < column + self.num_inputs {
            Some(self.num_inputs + index - self.window_start(column))
        } else {
            None
        }
    }

    /// Whether a gate at `column` may read unified index `index`.
    pub fn allows(&self, column: usize, index: usize) -> bool {
        self.connection_position(column, index).is_some()
    }
}

/// Configuration for a CGP run.
///
/// # Defaults
///
/// ```
/// use u_cgp::cgp::{CgpConfig, MutationStrategy, Objective};
///
/// let config = CgpConfig::default();
/// assert_eq!(config.population_size, 5);
/// assert_eq!(config.mutation, MutationStrategy::SingleActive);
/// assert_eq!(config.objective, Objective::Single);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_cgp::cgp::{CgpConfig, MutationStrategy, SelectionStrategy};
///
/// let config = CgpConfig::default()
///     .with_population_size(20)
///     .with_evaluation_budget(200_000)
///     .with_mutation(MutationStrategy::Hybrid)
///     .with_multi_objective(SelectionStrategy::Aps)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CgpConfig {
    /// Steady-state number of individuals.
    pub population_size: usize,

    /// Total evaluation units shared by both phases.
    pub evaluation_budget: u64,

    /// Gate columns. `None` uses the target's gate-count hint, then
    /// [`DEFAULT_COLUMNS`].
    pub columns: Option<usize>,

    /// Levels-back window. `None` allows any earlier column.
    pub levels_back: Option<usize>,

    /// Mutation operator used in every phase.
    pub mutation: MutationStrategy,

    /// Survivor selection of the multi-objective phase.
    pub selection: SelectionStrategy,

    /// Optimization phase entered after a feasible circuit is found.
    pub objective: Objective,

    /// Fraction of columns redrawn by point mutation.
    pub point_mutation_rate: f64,

    /// Mean-relative-error bound separating feasible from infeasible
    /// individuals in constrained Pareto ranking.
    pub mre_threshold: f64,

    /// Non-improving generations that end single-objective optimization.
    pub stagnation_limit: u64,

    /// Engine usage fraction above which the driver compacts the engine.
    pub compaction_threshold: f64,

    /// Initial engine node capacity.
    pub engine_capacity: usize,

    /// Generations between progress snapshots.
    pub report_interval: u64,

    /// Whether to evaluate delay and power in parallel using rayon.
    pub parallel: bool,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,

    /// Gate cost, delay and power constants.
    pub technology: TechnologyModel,
}

impl Default for CgpConfig {
    fn default() -> Self {
        Self {
            population_size: 5,
            evaluation_budget: 1_000_000,
            columns: None,
            levels_back: None,
            mutation: MutationStrategy::default(),
            selection: SelectionStrategy::default(),
            objective: Objective::default(),
            point_mutation_rate: 0.05,
            mre_threshold: 0.10,
            stagnation_limit: 100_000,
            compaction_threshold: 0.8,
            engine_capacity: 1 << 20,
            report_interval: 1000,
            parallel: false,
            seed: None,
            technology: TechnologyModel::default(),
        }
    }
}

impl CgpConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the evaluation budget.
    pub fn with_evaluation_budget(mut self, budget: u64) -> Self {
        self.evaluation_budget = budget;
        self
    }

    /// Fixes the column count.
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Fixes the levels-back window.
    pub fn with_levels_back(mut self, levels_back: usize) -> Self {
        self.levels_back = Some(levels_back);
        self
    }

    /// Sets the mutation strategy.
    pub fn with_mutation(mut self, mutation: MutationStrategy) -> Self {
        self.mutation = mutation;
        self
    }

    /// Switches to multi-objective optimization with the given selection.
    pub fn with_multi_objective(mut self, selection: SelectionStrategy) -> Self {
        self.objective = Objective::Multi;
        self.selection = selection;
        self
    }

    /// Sets the point-mutation rate.
    pub fn with_point_mutation_rate(mut self, rate: f64) -> Self {
        self.point_mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mean-relative-error threshold of constrained dominance.
    pub fn with_mre_threshold(mut self, threshold: f64) -> Self {
        self.mre_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Sets the stagnation limit of single-objective optimization.
    pub fn with_stagnation_limit(mut self, limit: u64) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Sets the engine compaction threshold.
    pub fn with_compaction_threshold(mut self, fraction: f64) -> Self {
        self.compaction_threshold = fraction;
        self
    }

    /// Sets the initial engine node capacity.
    pub fn with_engine_capacity(mut self, nodes: usize) -> Self {
        self.engine_capacity = nodes;
        self
    }

    /// Sets the snapshot interval in generations.
    pub fn with_report_interval(mut self, generations: u64) -> Self {
        self.report_interval = generations;
        self
    }

    /// Enables or disables parallel delay/power evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replaces the technology model.
    pub fn with_technology(mut self, technology: TechnologyModel) -> Self {
        self.technology = technology;
        self
    }

    /// Resolves the genotype layout for a target with the given dimensions.
    pub fn layout_for(
        &self,
        num_inputs: usize,
        num_outputs: usize,
        gate_hint: Option<usize>,
    ) -> Result<CircuitLayout, ConfigError> {
        let columns = self.columns.or(gate_hint).unwrap_or(DEFAULT_COLUMNS);
        let levels_back = self.levels_back.unwrap_or(columns);
        CircuitLayout::new(num_inputs, num_outputs, columns, levels_back)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.evaluation_budget == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.columns == Some(0) {
            return Err(ConfigError::NoColumns);
        }
        if self.levels_back == Some(0) {
            return Err(ConfigError::NoLevelsBack);
        }
        for (name, value) in [
            ("point_mutation_rate", self.point_mutation_rate),
            ("mre_threshold", self.mre_threshold),
            ("compaction_threshold", self.compaction_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}
