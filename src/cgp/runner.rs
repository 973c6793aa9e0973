//! CGP evolutionary loop execution.
//!
//! [`CgpRunner`] drives a two-phase search:
//!
//! 1. **Feasibility search**: (1 + λ) evolution on functional error until a
//!    circuit matches the target exactly or the budget runs out.
//! 2. **Optimization**, entered only after success:
//!    - [`Objective::Single`]: (1 + λ) transistor minimization at zero error,
//!      ended by stagnation or budget;
//!    - [`Objective::Multi`]: NSGA-II or APS over (error, delay, power) until
//!      the budget runs out.
//!
//! The evaluation budget is shared by both phases. Evaluating the initial
//! population is free; a (1 + λ) generation costs `n - 1` and a
//! multi-objective generation costs its offspring count.

use super::config::{CgpConfig, Objective};
use super::genotype::Genotype;
use super::population::Population;
use super::selection::{best_by_error, best_optimized};
use crate::bdd::BddManager;
use crate::error::CgpError;
use crate::io::Target;
use crate::random::create_rng;
use rand::rngs::StdRng;
use std::fmt;

/// Search phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FeasibilitySearch,
    SingleObjective,
    MultiObjective,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::FeasibilitySearch => "feasibility",
            Phase::SingleObjective => "single-objective",
            Phase::MultiObjective => "multi-objective",
        })
    }
}

/// Whether feasibility search found an exact circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Feasible,
    Infeasible,
}

/// Progress record handed to a [`Reporter`] after every generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    /// Generation number within `phase`, starting at 1.
    pub generation: u64,
    pub evaluations_remaining: u64,
    pub error: u128,
    pub delay: f64,
    pub power: f64,
    pub transistors: u32,
}

impl Snapshot {
    fn of(phase: Phase, generation: u64, evaluations_remaining: u64, best: &Genotype) -> Self {
        let f = best.fitness();
        Self {
            phase,
            generation,
            evaluations_remaining,
            error: f.error,
            delay: f.delay,
            power: f.power,
            transistors: f.transistors,
        }
    }
}

/// Observer of a run. Purely observational: nothing flows back into the
/// search.
pub trait Reporter {
    /// Called after every generation.
    fn on_generation(&mut self, snapshot: &Snapshot);

    /// Called once with the final result.
    fn on_finish(&mut self, _result: &CgpResult) {}
}

/// Emits snapshots through the `log` facade every `interval` generations.
#[derive(Debug, Clone)]
pub struct LogReporter {
    interval: u64,
}

impl LogReporter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl Reporter for LogReporter {
    fn on_generation(&mut self, s: &Snapshot) {
        if s.generation % self.interval != 0 {
            return;
        }
        match s.phase {
            Phase::MultiObjective => log::info!(
                "[{}] gen {}: {} evaluations left, error {}, delay {:.3}, power {:.4}",
                s.phase,
                s.generation,
                s.evaluations_remaining,
                s.error,
                s.delay,
                s.power
            ),
            _ => log::info!(
                "[{}] gen {}: {} evaluations left, error {}, {} transistors",
                s.phase,
                s.generation,
                s.evaluations_remaining,
                s.error,
                s.transistors
            ),
        }
    }

    fn on_finish(&mut self, result: &CgpResult) {
        let f = result.best.fitness();
        log::info!(
            "{:?} after {} evaluations: error {}, {} transistors, {} active gates",
            result.outcome,
            result.evaluations_used,
            f.error,
            f.transistors,
            result.best.active_gate_count()
        );
        if !result.pareto_front.is_empty() {
            log::info!("pareto front holds {} circuits", result.pareto_front.len());
        }
    }
}

/// Result of a CGP run.
#[derive(Debug, Clone)]
pub struct CgpResult {
    /// Whether an exact circuit was found.
    pub outcome: Outcome,

    /// Best circuit: minimum error, then fewest transistors (single
    /// objective) or lowest delay and power (multi-objective).
    pub best: Genotype,

    /// Rank-0 individuals of the final population (multi-objective only).
    pub pareto_front: Vec<Genotype>,

    /// Generations spent in feasibility search.
    pub feasibility_generations: u64,

    /// Generations spent in the optimization phase.
    pub optimization_generations: u64,

    /// Evaluation units consumed.
    pub evaluations_used: u64,

    /// Whether single-objective optimization stopped on stagnation.
    pub stagnated: bool,

    /// Best error at the start and after each feasibility generation.
    pub error_history: Vec<u128>,
}

/// Executes a CGP run.
///
/// # Usage
///
/// ```
/// use u_cgp::bdd::BddManager;
/// use u_cgp::cgp::{CgpConfig, CgpRunner, Outcome};
/// use u_cgp::io::Target;
///
/// let mut engine = BddManager::new(2, 1 << 12);
/// let (a, b) = (engine.var(0), engine.var(1));
/// let xor = engine.xor(a, b);
/// let mut target = Target::new(2, vec![xor]);
///
/// let config = CgpConfig::default()
///     .with_columns(4)
///     .with_evaluation_budget(20_000)
///     .with_stagnation_limit(500)
///     .with_seed(42);
/// let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();
/// assert_eq!(result.outcome, Outcome::Feasible);
/// assert_eq!(result.best.fitness().error, 0);
/// ```
pub struct CgpRunner;

impl CgpRunner {
    /// Runs with a [`LogReporter`] at the configured interval.
    ///
    /// `seed` replaces the first random individual.
    pub fn run(
        engine: &mut BddManager,
        target: &mut Target,
        config: &CgpConfig,
        seed: Option<Genotype>,
    ) -> Result<CgpResult, CgpError> {
        let mut reporter = LogReporter::new(config.report_interval);
        Self::run_with_reporter(engine, target, config, seed, &mut reporter)
    }

    /// Runs with a caller-supplied reporter.
    pub fn run_with_reporter(
        engine: &mut BddManager,
        target: &mut Target,
        config: &CgpConfig,
        seed: Option<Genotype>,
        reporter: &mut dyn Reporter,
    ) -> Result<CgpResult, CgpError> {
        config.validate()?;
        let layout = config.layout_for(target.num_inputs(), target.num_outputs(), target.gate_hint())?;
        if engine.num_vars() < layout.num_inputs {
            return Err(CgpError::ShapeMismatch(format!(
                "engine has {} variables, target needs {}",
                engine.num_vars(),
                layout.num_inputs
            )));
        }

        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let n = config.population_size;
        let mut population = Population::initialize(layout, n, &mut rng);
        if let Some(seed) = seed {
            if *seed.layout() != layout {
                return Err(CgpError::ShapeMismatch(format!(
                    "seed layout {:?} differs from run layout {:?}",
                    seed.layout(),
                    layout
                )));
            }
            seed.check_invariant()?;
            population.set(0, seed);
        }
        population.evaluate_functional(0..n, engine, target, &config.technology);

        let mut search = Search {
            engine,
            target,
            config,
            reporter,
            rng,
            population,
            budget: config.evaluation_budget,
        };
        log::info!(
            "starting CGP: {} inputs, {} outputs, {} columns, levels-back {}, {} mutation",
            layout.num_inputs,
            layout.num_outputs,
            layout.columns,
            layout.levels_back,
            config.mutation
        );

        let feasibility = search.feasibility();
        let mut result = CgpResult {
            outcome: Outcome::Infeasible,
            best: search.population.get(feasibility.best).clone(),
            pareto_front: Vec::new(),
            feasibility_generations: feasibility.generations,
            optimization_generations: 0,
            evaluations_used: 0,
            stagnated: false,
            error_history: feasibility.error_history,
        };

        if result.best.fitness().error == 0 {
            result.outcome = Outcome::Feasible;
            let functions = result.best.output_functions(search.engine);
            search.target.replace_functions(functions);
            log::info!(
                "feasible circuit after {} generations ({} transistors)",
                result.feasibility_generations,
                result.best.fitness().transistors
            );

            match config.objective {
                Objective::Single => {
                    let (best, generations, stagnated) = search.single_objective(feasibility.best);
                    result.best = search.population.get(best).clone();
                    result.optimization_generations = generations;
                    result.stagnated = stagnated;
                }
                Objective::Multi => {
                    result.optimization_generations = search.multi_objective();
                    let best = lexicographic_best(search.population.individuals());
                    result.best = search.population.get(best).clone();
                    result.pareto_front = search.population.pareto_front();
                }
            }
        } else {
            log::warn!(
                "no feasible circuit within budget; best error {}",
                result.best.fitness().error
            );
        }

        result.evaluations_used = config.evaluation_budget - search.budget;
        search.reporter.on_finish(&result);
        Ok(result)
    }
}

struct FeasibilityOutcome {
    best: usize,
    generations: u64,
    error_history: Vec<u128>,
}

/// Mutable state shared by the phases of one run.
struct Search<'a> {
    engine: &'a mut BddManager,
    target: &'a mut Target,
    config: &'a CgpConfig,
    reporter: &'a mut dyn Reporter,
    rng: StdRng,
    population: Population,
    budget: u64,
}

impl Search<'_> {
    /// One (1 + λ) step: clone the winner, mutate and evaluate slots `1..n`.
    fn offspring_from(&mut self, winner: usize) {
        let n = self.population.len();
        let config = self.config;
        self.population.clone_best_individual(winner);
        self.population
            .mutate(1..n, config.mutation, config.point_mutation_rate, &mut self.rng);
        self.population
            .evaluate_functional(1..n, self.engine, self.target, &config.technology);
        self.charge(n as u64 - 1);
    }

    fn feasibility(&mut self) -> FeasibilityOutcome {
        let mut best = best_by_error(self.population.individuals(), &mut self.rng);
        let mut error_history = vec![self.population.get(best).fitness().error];
        let mut generations = 0;

        while self.population.get(best).fitness().error > 0 && self.budget > 0 {
            generations += 1;
            self.offspring_from(best);
            best = best_by_error(self.population.individuals(), &mut self.rng);
            error_history.push(self.population.get(best).fitness().error);
            self.end_generation(Phase::FeasibilitySearch, generations, best);
        }

        FeasibilityOutcome {
            best,
            generations,
            error_history,
        }
    }

    /// Returns the winner index, generations run, and whether the phase
    /// stopped on stagnation.
    fn single_objective(&mut self, mut best: usize) -> (usize, u64, bool) {
        let best_error = self.population.get(best).fitness().error;
        let mut stagnation = 0u64;
        let mut generations = 0;

        while self.budget > 0 {
            if stagnation >= self.config.stagnation_limit {
                log::info!("stopping after {stagnation} generations without improvement");
                return (best, generations, true);
            }
            generations += 1;
            self.offspring_from(best);
            best = best_optimized(self.population.individuals(), best_error, &mut self.rng);
            if best == 0 {
                stagnation += 1;
            } else {
                stagnation = 0;
            }
            self.end_generation(Phase::SingleObjective, generations, best);
        }
        (best, generations, false)
    }

    /// Returns the number of generations run.
    fn multi_objective(&mut self) -> u64 {
        let config = self.config;
        let n = self.population.len();
        self.population.evaluate_timing(0..n, &config.technology, config.parallel);
        self.population.fast_non_dominated_sort(config.mre_threshold);
        let mut generations = 0;

        while self.budget > 0 {
            generations += 1;
            let parents = self.population.len();
            self.population.clone_mo();
            let offspring = parents..2 * parents;
            self.population.mutate(
                offspring.clone(),
                config.mutation,
                config.point_mutation_rate,
                &mut self.rng,
            );
            self.population.evaluate_multi_objective(
                offspring,
                self.engine,
                self.target,
                &config.technology,
                config.parallel,
            );
            self.charge(parents as u64);
            self.population.select(config.selection, config.mre_threshold);

            let best = lexicographic_best(self.population.individuals());
            self.end_generation(Phase::MultiObjective, generations, best);
        }
        generations
    }

    fn charge(&mut self, units: u64) {
        self.budget = self.budget.saturating_sub(units);
    }

    /// Reports progress and compacts the engine when it nears capacity.
    fn end_generation(&mut self, phase: Phase, generation: u64, best: usize) {
        if self.engine.needs_compaction(self.config.compaction_threshold) {
            let before = self.engine.node_count();
            self.engine.compact(self.target.functions_mut());
            log::debug!(
                "compacted engine at generation {generation}: {before} -> {} nodes",
                self.engine.node_count()
            );
        }
        let snapshot = Snapshot::of(phase, generation, self.budget, self.population.get(best));
        self.reporter.on_generation(&snapshot);
    }
}

/// Minimum error, then delay, then power, then transistors.
fn lexicographic_best(individuals: &[Genotype]) -> usize {
    let mut best = 0;
    for (i, g) in individuals.iter().enumerate().skip(1) {
        let (a, b) = (g.fitness(), individuals[best].fitness());
        let better = (a.error, a.delay, a.power, a.transistors)
            .partial_cmp(&(b.error, b.delay, b.power, b.transistors))
            .is_some_and(|o| o.is_lt());
        if better {
            best = i;
        }
    }
    best
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgp::{CircuitLayout, Gate, GateKind, MutationStrategy, SelectionStrategy};

    fn and_target(engine: &mut BddManager) -> Target {
        let (a, b) = (engine.var(0), engine.var(1));
        let f = engine.and(a, b);
        Target::new(2, vec![f])
    }

    fn parity3_target(engine: &mut BddManager) -> Target {
        let (a, b, c) = (engine.var(0), engine.var(1), engine.var(2));
        let ab = engine.xor(a, b);
        let f = engine.xor(ab, c);
        Target::new(3, vec![f])
    }

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<Snapshot>,
        finished: bool,
    }

    impl Reporter for Recorder {
        fn on_generation(&mut self, snapshot: &Snapshot) {
            self.snapshots.push(snapshot.clone());
        }

        fn on_finish(&mut self, _result: &CgpResult) {
            self.finished = true;
        }
    }

    // ---- Feasibility search ----

    #[test]
    fn test_and_gate_every_strategy() {
        for mutation in [
            MutationStrategy::Point,
            MutationStrategy::SingleActive,
            MutationStrategy::GuidedActive,
            MutationStrategy::Hybrid,
        ] {
            let mut engine = BddManager::new(2, 1 << 10);
            let mut target = and_target(&mut engine);
            let config = CgpConfig::default()
                .with_columns(1)
                .with_levels_back(1)
                .with_mutation(mutation)
                .with_evaluation_budget(40_000)
                .with_stagnation_limit(100)
                .with_seed(7);
            let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();

            assert_eq!(result.outcome, Outcome::Feasible, "{mutation} did not converge");
            let best = &result.best;
            assert_eq!(best.fitness().error, 0);
            assert_eq!(best.outputs(), &[2], "{mutation}: output must read the gate");
            let gate = best.gates()[0];
            assert_eq!(gate.kind, GateKind::And);
            let mut inputs = gate.inputs;
            inputs.sort();
            assert_eq!(inputs, [0, 1]);
        }
    }

    #[test]
    fn test_infeasible_exhausts_budget() {
        let mut engine = BddManager::new(3, 1 << 10);
        let mut target = parity3_target(&mut engine);
        // A single gate cannot compute 3-input parity.
        let config = CgpConfig::default()
            .with_columns(1)
            .with_evaluation_budget(40)
            .with_seed(1);
        let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();

        assert_eq!(result.outcome, Outcome::Infeasible);
        assert!(result.best.fitness().error > 0);
        assert_eq!(result.feasibility_generations, 10);
        assert_eq!(result.error_history.len(), 11);
        assert_eq!(result.evaluations_used, 40);
        assert_eq!(result.optimization_generations, 0);
    }

    #[test]
    fn test_budget_saturates() {
        let mut engine = BddManager::new(3, 1 << 10);
        let mut target = parity3_target(&mut engine);
        let config = CgpConfig::default()
            .with_population_size(4)
            .with_columns(1)
            .with_evaluation_budget(10)
            .with_seed(2);
        let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();
        // 3 + 3 + 3 + 1
        assert_eq!(result.feasibility_generations, 4);
        assert_eq!(result.evaluations_used, 10);
    }

    #[test]
    fn test_error_history_never_increases() {
        let mut engine = BddManager::new(3, 1 << 12);
        let mut target = parity3_target(&mut engine);
        let config = CgpConfig::default()
            .with_columns(10)
            .with_evaluation_budget(20_000)
            .with_stagnation_limit(10)
            .with_seed(3);
        let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();
        for w in result.error_history.windows(2) {
            assert!(w[1] <= w[0], "elitism violated: {} -> {}", w[0], w[1]);
        }
    }

    // ---- Single-objective optimization ----

    #[test]
    fn test_seeded_exact_circuit_skips_feasibility() {
        let mut engine = BddManager::new(2, 1 << 10);
        let mut target = and_target(&mut engine);
        let layout = CircuitLayout::new(2, 1, 3, 3).unwrap();
        // AND built the long way: NOR(NOT i0, NOT i1).
        let seed = Genotype::from_parts(
            layout,
            vec![
                Gate::new(GateKind::Not, 0, 0),
                Gate::new(GateKind::Not, 1, 1),
                Gate::new(GateKind::Nor, 2, 3),
            ],
            vec![4],
        )
        .unwrap();
        let config = CgpConfig::default()
            .with_columns(3)
            .with_evaluation_budget(20_000)
            .with_stagnation_limit(2_000)
            .with_seed(4);
        let result = CgpRunner::run(&mut engine, &mut target, &config, Some(seed)).unwrap();

        assert_eq!(result.feasibility_generations, 0);
        assert_eq!(result.outcome, Outcome::Feasible);
        assert_eq!(result.best.fitness().error, 0);
        // The elite never gets more expensive than the 8-transistor seed.
        assert!(result.best.fitness().transistors <= 8);
    }

    #[test]
    fn test_stagnation_stops_single_objective() {
        let mut engine = BddManager::new(2, 1 << 10);
        let mut target = and_target(&mut engine);
        let config = CgpConfig::default()
            .with_columns(1)
            .with_evaluation_budget(1_000_000)
            .with_stagnation_limit(50)
            .with_seed(5);
        let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();
        assert!(result.stagnated);
        assert!(result.evaluations_used < 1_000_000);
    }

    #[test]
    fn test_seed_with_wrong_layout() {
        let mut engine = BddManager::new(2, 1 << 10);
        let mut target = and_target(&mut engine);
        let mut rng = create_rng(0);
        let seed = Genotype::random(CircuitLayout::new(2, 1, 8, 8).unwrap(), &mut rng);
        let config = CgpConfig::default().with_columns(4).with_seed(6);
        let err = CgpRunner::run(&mut engine, &mut target, &config, Some(seed)).unwrap_err();
        assert!(matches!(err, CgpError::ShapeMismatch(_)));
    }

    #[test]
    fn test_invalid_config() {
        let mut engine = BddManager::new(2, 1 << 10);
        let mut target = and_target(&mut engine);
        let config = CgpConfig::default().with_population_size(1);
        assert!(matches!(
            CgpRunner::run(&mut engine, &mut target, &config, None),
            Err(CgpError::Config(_))
        ));
    }

    // ---- Multi-objective optimization ----

    #[test]
    fn test_multi_objective_nsga2_and_aps() {
        for selection in [SelectionStrategy::Nsga2, SelectionStrategy::Aps] {
            let mut engine = BddManager::new(3, 1 << 12);
            let mut target = parity3_target(&mut engine);
            let config = CgpConfig::default()
                .with_population_size(8)
                .with_columns(12)
                .with_evaluation_budget(30_000)
                .with_multi_objective(selection)
                .with_seed(8);
            let mut recorder = Recorder::default();
            let result = CgpRunner::run_with_reporter(
                &mut engine,
                &mut target,
                &config,
                None,
                &mut recorder,
            )
            .unwrap();

            assert_eq!(result.outcome, Outcome::Feasible, "{selection}");
            assert_eq!(result.best.fitness().error, 0);
            assert!(result.best.fitness().delay > 0.0);
            assert!(!result.pareto_front.is_empty());
            assert!(result.pareto_front.len() <= 8);
            assert!(result.pareto_front.iter().all(|g| g.fitness().rank == 0));
            assert!(result.optimization_generations > 0);
            assert_eq!(result.evaluations_used, 30_000);
            assert!(recorder.finished);
            assert!(recorder
                .snapshots
                .iter()
                .any(|s| s.phase == Phase::MultiObjective));
        }
    }

    // ---- Engine maintenance ----

    #[test]
    fn test_compaction_keeps_target_valid() {
        let mut engine = BddManager::new(3, 64);
        let mut target = parity3_target(&mut engine);
        let config = CgpConfig::default()
            .with_columns(10)
            .with_evaluation_budget(5_000)
            .with_stagnation_limit(200)
            .with_compaction_threshold(0.5)
            .with_seed(9);
        let result = CgpRunner::run(&mut engine, &mut target, &config, None).unwrap();

        assert!(engine.compactions() > 0);
        let f = target.functions()[0];
        for bits in 0..8u32 {
            let a: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
            assert_eq!(engine.eval(f, &a), a.iter().filter(|&&x| x).count() % 2 == 1);
        }
        // The returned circuit still decodes against the remapped target.
        let mut best = result.best.clone();
        best.evaluate_functional_error(&mut engine, &target, &config.technology);
        assert_eq!(best.fitness().error, result.best.fitness().error);
    }

    #[test]
    fn test_reporter_sees_every_generation() {
        let mut engine = BddManager::new(3, 1 << 10);
        let mut target = parity3_target(&mut engine);
        let config = CgpConfig::default()
            .with_columns(1)
            .with_evaluation_budget(20)
            .with_seed(10);
        let mut recorder = Recorder::default();
        let result =
            CgpRunner::run_with_reporter(&mut engine, &mut target, &config, None, &mut recorder)
                .unwrap();
        assert_eq!(recorder.snapshots.len() as u64, result.feasibility_generations);
        let generations: Vec<u64> = recorder.snapshots.iter().map(|s| s.generation).collect();
        assert_eq!(generations, vec![1, 2, 3, 4, 5]);
        assert_eq!(recorder.snapshots.last().map(|s| s.evaluations_remaining), Some(0));
    }
}
