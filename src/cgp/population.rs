//! Population container and survivor selection.
//!
//! A [`Population`] owns its genotypes and a steady-state size. During a
//! multi-objective generation it temporarily doubles ([`Population::clone_mo`])
//! and is cut back by [`Population::select`].

use super::genotype::Genotype;
use super::multi_objective::{
    constrained_dominance, crowded_truncate, crowding_distance, non_dominated_sort_by,
    NondominatedSortResult,
};
use super::operators::{mutate_batch, MutationStrategy};
use super::selection::SelectionStrategy;
use super::technology::TechnologyModel;
use super::CircuitLayout;
use crate::bdd::BddManager;
use crate::io::Target;
use rand::Rng;
use std::ops::Range;

/// An ordered, resizable collection of genotypes.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Genotype>,
    max_size: usize,
}

impl Population {
    /// `size` independent random genotypes.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn initialize<R: Rng>(layout: CircuitLayout, size: usize, rng: &mut R) -> Self {
        assert!(size > 0, "population must not be empty");
        Self {
            individuals: (0..size).map(|_| Genotype::random(layout, rng)).collect(),
            max_size: size,
        }
    }

    /// Wraps existing genotypes; `max_size` is their count.
    pub fn from_individuals(individuals: Vec<Genotype>) -> Self {
        let max_size = individuals.len();
        Self {
            individuals,
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Steady-state size restored by selection.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn individuals(&self) -> &[Genotype] {
        &self.individuals
    }

    pub fn get(&self, index: usize) -> &Genotype {
        &self.individuals[index]
    }

    /// Replaces the genotype at `index`.
    pub fn set(&mut self, index: usize, genotype: Genotype) {
        self.individuals[index] = genotype;
    }

    // ------------------------------------------------------------------
    // Reproduction
    // ------------------------------------------------------------------

    /// Overwrites every slot with a copy of the individual at `best`.
    pub fn clone_best_individual(&mut self, best: usize) {
        let elite = self.individuals[best].clone();
        for (i, slot) in self.individuals.iter_mut().enumerate() {
            if i != best {
                slot.clone_from(&elite);
            }
        }
    }

    /// Appends a copy of every individual, doubling the population.
    pub fn clone_mo(&mut self) {
        self.individuals.extend_from_within(..);
    }

    /// Mutates the individuals in `range`.
    pub fn mutate<R: Rng>(
        &mut self,
        range: Range<usize>,
        strategy: MutationStrategy,
        point_rate: f64,
        rng: &mut R,
    ) {
        mutate_batch(&mut self.individuals[range], strategy, point_rate, rng);
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Functional error and transistor count for the individuals in `range`.
    pub fn evaluate_functional(
        &mut self,
        range: Range<usize>,
        engine: &mut BddManager,
        target: &Target,
        tech: &TechnologyModel,
    ) {
        for g in &mut self.individuals[range] {
            g.evaluate_functional_error(engine, target, tech);
        }
    }

    /// Functional error, delay and power for the individuals in `range`.
    ///
    /// Delay and power need no engine access and run on the rayon pool when
    /// `parallel` is set and the `parallel` feature is enabled.
    pub fn evaluate_multi_objective(
        &mut self,
        range: Range<usize>,
        engine: &mut BddManager,
        target: &Target,
        tech: &TechnologyModel,
        parallel: bool,
    ) {
        self.evaluate_functional(range.clone(), engine, target, tech);
        self.evaluate_timing(range, tech, parallel);
    }

    /// Delay and power only, for individuals whose functional error is
    /// already current.
    pub fn evaluate_timing(&mut self, range: Range<usize>, tech: &TechnologyModel, parallel: bool) {
        timing_pass(&mut self.individuals[range], tech, parallel);
    }

    // ------------------------------------------------------------------
    // Multi-objective selection
    // ------------------------------------------------------------------

    /// Constrained non-dominated sort of the whole population. Writes each
    /// individual's rank into its fitness record.
    pub fn fast_non_dominated_sort(&mut self, mre_threshold: f64) -> NondominatedSortResult {
        let individuals = &self.individuals;
        let result = non_dominated_sort_by(individuals.len(), |i, j| {
            constrained_dominance(individuals[i].fitness(), individuals[j].fitness(), mre_threshold)
        });
        for (g, &rank) in self.individuals.iter_mut().zip(&result.ranks) {
            g.fitness_mut().rank = rank;
        }
        result
    }

    /// Runs the given survivor selection.
    pub fn select(&mut self, strategy: SelectionStrategy, mre_threshold: f64) {
        match strategy {
            SelectionStrategy::Nsga2 => self.select_nsga2(mre_threshold),
            SelectionStrategy::Aps => self.select_aps(mre_threshold),
        }
    }

    /// NSGA-II survivor selection.
    ///
    /// Whole fronts are kept in rank order while they fit; the first front
    /// that overflows is truncated by crowding distance. Leaves exactly
    /// `min(len, max_size)` individuals.
    pub fn select_nsga2(&mut self, mre_threshold: f64) {
        let sort = self.fast_non_dominated_sort(mre_threshold);
        let capacity = self.max_size.min(self.len());
        let mut chosen = Vec::with_capacity(capacity);
        for front in &sort.fronts {
            if chosen.len() + front.len() <= capacity {
                chosen.extend_from_slice(front);
                continue;
            }
            let remaining = capacity - chosen.len();
            chosen.extend(self.least_crowded(front, remaining));
            break;
        }
        self.retain_indices(&chosen);
    }

    /// Adaptive population size selection.
    ///
    /// Keeps only the first front, truncated by crowding distance when it
    /// exceeds `max_size`. The population may shrink below `max_size`.
    pub fn select_aps(&mut self, mre_threshold: f64) {
        let sort = self.fast_non_dominated_sort(mre_threshold);
        let Some(front) = sort.fronts.first() else {
            return;
        };
        let chosen = if front.len() <= self.max_size {
            front.clone()
        } else {
            self.least_crowded(front, self.max_size)
        };
        self.retain_indices(&chosen);
    }

    /// Individuals of rank 0 as of the last sort.
    pub fn pareto_front(&self) -> Vec<Genotype> {
        self.individuals
            .iter()
            .filter(|g| g.fitness().rank == 0)
            .cloned()
            .collect()
    }

    /// The `k` members of `front` with the largest crowding distance.
    fn least_crowded(&self, front: &[usize], k: usize) -> Vec<usize> {
        let objectives: Vec<[f64; 3]> = front
            .iter()
            .map(|&i| self.individuals[i].fitness().objectives())
            .collect();
        let distances = crowding_distance(&objectives);
        crowded_truncate(&distances, k)
            .into_iter()
            .map(|p| front[p])
            .collect()
    }

    /// Keeps the individuals at `indices`, in that order.
    fn retain_indices(&mut self, indices: &[usize]) {
        let mut slots: Vec<Option<Genotype>> =
            std::mem::take(&mut self.individuals).into_iter().map(Some).collect();
        self.individuals = indices.iter().filter_map(|&i| slots[i].take()).collect();
    }
}

fn timing_pass(batch: &mut [Genotype], tech: &TechnologyModel, parallel: bool) {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            batch
                .par_iter_mut()
                .for_each(|g| g.evaluate_timing_and_power(tech));
            return;
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    for g in batch {
        g.evaluate_timing_and_power(tech);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgp::{Gate, GateKind};
    use crate::random::create_rng;

    fn layout() -> CircuitLayout {
        CircuitLayout::new(2, 1, 4, 4).unwrap()
    }

    /// A genotype with hand-set objectives, tagged by its transistor count.
    fn scored(tag: u32, error: u128, mre: f64, delay: f64, power: f64) -> Genotype {
        let mut rng = create_rng(u64::from(tag));
        let mut g = Genotype::random(layout(), &mut rng);
        let f = g.fitness_mut();
        f.error = error;
        f.mean_relative_error = mre;
        f.delay = delay;
        f.power = power;
        f.transistors = tag;
        g
    }

    fn tags(pop: &Population) -> Vec<u32> {
        pop.individuals().iter().map(|g| g.fitness().transistors).collect()
    }

    // ---- Reproduction ----

    #[test]
    fn test_initialize() {
        let mut rng = create_rng(1);
        let pop = Population::initialize(layout(), 6, &mut rng);
        assert_eq!(pop.len(), 6);
        assert_eq!(pop.max_size(), 6);
        assert!(pop.individuals().iter().all(|g| g.check_invariant().is_ok()));
    }

    #[test]
    fn test_clone_best_individual() {
        let mut rng = create_rng(2);
        let mut pop = Population::initialize(layout(), 5, &mut rng);
        let best = pop.get(3).clone();
        pop.clone_best_individual(3);
        assert!(pop.individuals().iter().all(|g| *g == best));
    }

    #[test]
    fn test_clone_mo_doubles() {
        let mut rng = create_rng(3);
        let mut pop = Population::initialize(layout(), 4, &mut rng);
        pop.clone_mo();
        assert_eq!(pop.len(), 8);
        assert_eq!(pop.max_size(), 4);
        for i in 0..4 {
            assert_eq!(pop.get(i), pop.get(i + 4));
        }
    }

    #[test]
    fn test_mutate_only_touches_range() {
        let mut rng = create_rng(4);
        let mut pop = Population::initialize(layout(), 4, &mut rng);
        pop.clone_best_individual(0);
        let elite = pop.get(0).clone();
        pop.mutate(1..4, MutationStrategy::SingleActive, 0.05, &mut rng);
        assert_eq!(*pop.get(0), elite);
        for i in 1..4 {
            assert_ne!(*pop.get(i), elite);
        }
    }

    // ---- Evaluation ----

    #[test]
    fn test_evaluate_multi_objective() {
        let mut engine = BddManager::new(2, 1024);
        let (a, b) = (engine.var(0), engine.var(1));
        let and = engine.and(a, b);
        let target = Target::new(2, vec![and]);
        let tech = TechnologyModel::default();
        let g = Genotype::from_parts(
            CircuitLayout::new(2, 1, 1, 1).unwrap(),
            vec![Gate::new(GateKind::And, 0, 1)],
            vec![2],
        )
        .unwrap();
        let mut pop = Population::from_individuals(vec![g.clone(), g]);
        pop.evaluate_multi_objective(1..2, &mut engine, &target, &tech, true);

        let evaluated = pop.get(1).fitness();
        assert_eq!(evaluated.error, 0);
        assert!((evaluated.delay - 2.4).abs() < 1e-12);
        assert!((evaluated.power - 0.1875).abs() < 1e-12);
        // Slot 0 was outside the range.
        assert_eq!(pop.get(0).fitness().error, u128::MAX);
    }

    // ---- Selection ----

    #[test]
    fn test_sort_writes_ranks() {
        let mut pop = Population::from_individuals(vec![
            scored(0, 1, 0.05, 1.0, 1.0),
            scored(1, 2, 0.05, 2.0, 2.0),
            scored(2, 9, 0.5, 0.0, 0.0),
        ]);
        let result = pop.fast_non_dominated_sort(0.1);
        assert_eq!(result.ranks, vec![0, 1, 2]);
        let ranks: Vec<usize> = pop.individuals().iter().map(|g| g.fitness().rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn test_aps_keeps_rank_zero_pair() {
        let mut pop = Population::from_individuals(vec![
            scored(10, 3, 0.05, 5.0, 5.0), // rank 1
            scored(11, 1, 0.02, 1.0, 3.0), // rank 0
            scored(12, 1, 0.02, 3.0, 1.0), // rank 0
            scored(13, 4, 0.08, 4.0, 6.0), // rank 1
        ]);
        let result = pop.fast_non_dominated_sort(0.1);
        assert_eq!(result.ranks, vec![1, 0, 0, 1]);
        pop.select_aps(0.1);
        assert_eq!(pop.len(), 2);
        let mut kept = tags(&pop);
        kept.sort();
        assert_eq!(kept, vec![11, 12]);
    }

    #[test]
    fn test_aps_truncates_large_front() {
        let front: Vec<Genotype> = (0..5)
            .map(|i| scored(i, 0, 0.0, f64::from(i), f64::from(4 - i)))
            .collect();
        let mut pop = Population::from_individuals(front.clone());
        pop.clone_mo();
        pop.select_aps(0.1);
        assert_eq!(pop.len(), 5);
    }

    #[test]
    fn test_nsga2_restores_max_size() {
        let mut pop = Population::from_individuals(vec![
            scored(0, 0, 0.0, 1.0, 9.0),
            scored(1, 0, 0.0, 5.0, 5.0),
            scored(2, 0, 0.0, 9.0, 1.0),
            scored(3, 2, 0.05, 9.0, 9.0),
        ]);
        pop.clone_mo();
        // Offspring: make them worse so the parents' front fills the slots.
        for i in 4..8 {
            let f = pop.individuals[i].fitness_mut();
            f.error += 10;
            f.mean_relative_error = 0.5;
        }
        pop.select_nsga2(0.1);
        assert_eq!(pop.len(), 4);
        let mut kept = tags(&pop);
        kept.sort();
        assert_eq!(kept, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_nsga2_truncation_keeps_boundaries() {
        // One front of five; keep three.
        let mut pop = Population::from_individuals(
            (0..5)
                .map(|i| scored(i, 0, 0.0, f64::from(i), f64::from(4 - i)))
                .collect(),
        );
        pop.max_size = 3;
        pop.select_nsga2(0.1);
        assert_eq!(pop.len(), 3);
        let kept = tags(&pop);
        assert!(kept.contains(&0) && kept.contains(&4), "kept {kept:?}");
    }

    #[test]
    fn test_pareto_front() {
        let mut pop = Population::from_individuals(vec![
            scored(0, 0, 0.0, 1.0, 2.0),
            scored(1, 0, 0.0, 2.0, 1.0),
            scored(2, 0, 0.0, 3.0, 3.0),
        ]);
        pop.fast_non_dominated_sort(0.1);
        let front: Vec<u32> = pop.pareto_front().iter().map(|g| g.fitness().transistors).collect();
        assert_eq!(front, vec![0, 1]);
    }
}
