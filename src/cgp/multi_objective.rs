//! Constrained Pareto ranking and crowding distance.
//!
//! All objectives are **minimized**. The objective vector of a genotype is
//! `(error, delay, power)`; mean relative error acts as a feasibility
//! constraint on top of plain Pareto dominance.
//!
//! # Algorithms
//!
//! - [`constrained_dominance`]: feasibility-first dominance
//! - [`non_dominated_sort_by`]: Fast non-dominated sorting (Deb et al., 2002)
//! - [`crowding_distance`]: Crowding distance with a fixed boundary bonus
//! - [`crowded_truncate`]: Keep the `k` least crowded solutions
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"
//! - IEEE Transactions on Evolutionary Computation, 6(2), 182-197

use super::types::Fitness;

/// Distance added to the first and last solution of a front per objective.
pub const BOUNDARY_DISTANCE: f64 = 1000.0;

/// Result of non-dominated sorting.
///
/// Each element of `ranks` corresponds to the Pareto rank of the solution
/// at the same index. Rank 0 is the Pareto front (non-dominated solutions).
#[derive(Debug, Clone)]
pub struct NondominatedSortResult {
    /// Pareto rank for each solution (0 = front).
    pub ranks: Vec<usize>,

    /// Indices grouped by front: `fronts[0]` contains rank-0 indices, etc.
    pub fronts: Vec<Vec<usize>>,
}

/// Dominance comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// Left dominates right.
    Left,
    /// Right dominates left.
    Right,
    /// Neither dominates the other.
    Neither,
}

impl Dominance {
    /// The same relation seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Dominance::Left => Dominance::Right,
            Dominance::Right => Dominance::Left,
            Dominance::Neither => Dominance::Neither,
        }
    }
}

/// Compare two objective vectors for Pareto dominance (minimization).
pub fn pareto_dominance(a: &[f64], b: &[f64]) -> Dominance {
    let mut a_better_in_some = false;
    let mut b_better_in_some = false;

    for (&va, &vb) in a.iter().zip(b.iter()) {
        if va < vb {
            a_better_in_some = true;
        } else if vb < va {
            b_better_in_some = true;
        }
    }

    match (a_better_in_some, b_better_in_some) {
        (true, false) => Dominance::Left,
        (false, true) => Dominance::Right,
        _ => Dominance::Neither,
    }
}

/// Feasibility-first dominance.
///
/// A solution is feasible when its mean relative error is at most
/// `threshold`.
///
/// - both feasible: Pareto dominance over `(error, delay, power)`
/// - exactly one feasible: it dominates
/// - neither feasible: the smaller mean relative error dominates; equal
///   errors dominate neither way
///
/// The relation is antisymmetric: `constrained_dominance(a, b, t)` is
/// always `constrained_dominance(b, a, t).flip()`.
pub fn constrained_dominance(a: &Fitness, b: &Fitness, threshold: f64) -> Dominance {
    let a_ok = a.mean_relative_error <= threshold;
    let b_ok = b.mean_relative_error <= threshold;
    match (a_ok, b_ok) {
        (true, true) => pareto_dominance(&a.objectives(), &b.objectives()),
        (true, false) => Dominance::Left,
        (false, true) => Dominance::Right,
        (false, false) => {
            if a.mean_relative_error < b.mean_relative_error {
                Dominance::Left
            } else if b.mean_relative_error < a.mean_relative_error {
                Dominance::Right
            } else {
                Dominance::Neither
            }
        }
    }
}

/// Fast non-dominated sorting under an arbitrary dominance relation.
///
/// `compare(i, j)` reports how solution `i` relates to solution `j`; it is
/// called once per unordered pair with `i < j`.
///
/// # Algorithm (Deb et al., 2002)
///
/// 1. For each pair of solutions, determine dominance
/// 2. Solutions dominated by no other belong to front 0 (rank 0)
/// 3. Remove front 0, repeat to find subsequent fronts
///
/// # Complexity
///
/// O(n²) comparisons for n solutions
///
/// # Example
///
/// ```
/// use u_cgp::cgp::multi_objective::{non_dominated_sort_by, pareto_dominance};
///
/// let objectives = [
///     [1.0, 5.0], // A
///     [3.0, 3.0], // B
///     [5.0, 1.0], // C
///     [4.0, 4.0], // D, dominated by B
/// ];
///
/// let result = non_dominated_sort_by(objectives.len(), |i, j| {
///     pareto_dominance(&objectives[i], &objectives[j])
/// });
///
/// assert_eq!(result.ranks, vec![0, 0, 0, 1]);
/// assert_eq!(result.fronts, vec![vec![0, 1, 2], vec![3]]);
/// ```
pub fn non_dominated_sort_by<F>(n: usize, compare: F) -> NondominatedSortResult
where
    F: Fn(usize, usize) -> Dominance,
{
    if n == 0 {
        return NondominatedSortResult {
            ranks: Vec::new(),
            fronts: Vec::new(),
        };
    }

    let mut domination_count = vec![0usize; n];
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut ranks = vec![0usize; n];
    let mut front_0 = Vec::new();

    // Compute dominance relationships
    for i in 0..n {
        for j in (i + 1)..n {
            match compare(i, j) {
                Dominance::Left => {
                    dominated_by[i].push(j);
                    domination_count[j] += 1;
                }
                Dominance::Right => {
                    dominated_by[j].push(i);
                    domination_count[i] += 1;
                }
                Dominance::Neither => {}
            }
        }

        if domination_count[i] == 0 {
            front_0.push(i);
        }
    }

    // Build subsequent fronts
    let mut fronts = vec![front_0];
    while let Some(current) = fronts.last() {
        let mut next_front = Vec::new();

        for &i in current {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    ranks[j] = fronts.len();
                    next_front.push(j);
                }
            }
        }

        if next_front.is_empty() {
            break;
        }
        fronts.push(next_front);
    }

    NondominatedSortResult { ranks, fronts }
}

/// Crowding distance of each solution within one front.
///
/// For every objective the solutions are sorted ascending; the first and
/// last receive [`BOUNDARY_DISTANCE`], and each interior solution adds
/// `(next - prev) / (max - min)`. Objectives with zero range contribute
/// only the boundary bonus.
///
/// # Complexity
///
/// O(m * n * log n) where m = number of objectives, n = number of solutions
///
/// # Example
///
/// ```
/// use u_cgp::cgp::multi_objective::{crowding_distance, BOUNDARY_DISTANCE};
///
/// let objectives = [[1.0, 5.0], [3.0, 3.0], [5.0, 1.0]];
/// let distances = crowding_distance(&objectives);
///
/// assert_eq!(distances[0], 2.0 * BOUNDARY_DISTANCE);
/// assert_eq!(distances[1], 2.0);
/// ```
pub fn crowding_distance<O: AsRef<[f64]>>(objectives: &[O]) -> Vec<f64> {
    let n = objectives.len();
    if n == 0 {
        return Vec::new();
    }

    let m = objectives[0].as_ref().len();
    let value = |i: usize, k: usize| objectives[i].as_ref()[k];
    let mut distances = vec![0.0f64; n];

    for k in 0..m {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.sort_by(|&a, &b| value(a, k).total_cmp(&value(b, k)));

        let first = indices[0];
        let last = indices[n - 1];
        distances[first] += BOUNDARY_DISTANCE;
        distances[last] += BOUNDARY_DISTANCE;

        let range = value(last, k) - value(first, k);
        if range > 0.0 {
            for w in indices.windows(3) {
                distances[w[1]] += (value(w[2], k) - value(w[0], k)) / range;
            }
        }
    }

    distances
}

/// Positions of the `k` largest crowding distances, largest first.
///
/// Ties keep their original order. Returns every position if `k` exceeds
/// the number of solutions.
pub fn crowded_truncate(distances: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..distances.len()).collect();
    order.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
    order.truncate(k);
    order
}

// ============================================================================
// Tests
// ============================================================================
