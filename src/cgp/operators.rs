//! Mutation operators for CGP genotypes.
//!
//! Every operator works in place and only draws values permitted by the
//! levels-back window, so the encoding invariant holds after any sequence
//! of mutations.
//!
//! # Operators
//!
//! - [`point_mutation`] (PM): redraw a fixed fraction of genes, active or not
//! - [`single_active_mutation`] (SAM): mutate random genes until an active
//!   one changes; inactive changes on the way are kept (neutral drift)
//! - [`guided_active_mutation`] (GAM): mutate one gene on the cone of the
//!   output with the most mismatches
//! - [`mutate_batch`] with [`MutationStrategy::Hybrid`] (SG): SAM on the first
//!   half of a batch, GAM on the second
//!
//! # References
//!
//! - Miller & Thomson (2000), "Cartesian Genetic Programming"
//! - Goldman & Punch (2013), "Reducing Wasted Evaluations in Cartesian
//!   Genetic Programming"

use super::config::ConfigError;
use super::genotype::Genotype;
use super::types::Gene;
use crate::random::pick;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Mutation strategy applied to every offspring.
///
/// # Examples
///
/// ```
/// use u_cgp::cgp::MutationStrategy;
///
/// let m: MutationStrategy = "gam".parse().unwrap();
/// assert_eq!(m, MutationStrategy::GuidedActive);
/// assert!("xyz".parse::<MutationStrategy>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MutationStrategy {
    /// `pm`: point mutation.
    Point,
    /// `sam`: single active mutation.
    #[default]
    SingleActive,
    /// `gam`: guided active mutation.
    GuidedActive,
    /// `sg`: SAM and GAM on the two halves of a batch.
    Hybrid,
}

impl MutationStrategy {
    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            MutationStrategy::Point => "pm",
            MutationStrategy::SingleActive => "sam",
            MutationStrategy::GuidedActive => "gam",
            MutationStrategy::Hybrid => "sg",
        }
    }
}

impl fmt::Display for MutationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MutationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pm" => Ok(MutationStrategy::Point),
            "sam" => Ok(MutationStrategy::SingleActive),
            "gam" => Ok(MutationStrategy::GuidedActive),
            "sg" => Ok(MutationStrategy::Hybrid),
            other => Err(ConfigError::UnknownMutation(other.to_string())),
        }
    }
}

/// Point mutation: redraws `round(rate * columns)` random genes, at least one.
///
/// Returns the number of genes whose value changed.
///
/// # Complexity
/// O(k) for k redrawn genes
pub fn point_mutation<R: Rng>(genotype: &mut Genotype, rate: f64, rng: &mut R) -> usize {
    let count = ((rate * genotype.layout().columns as f64).round() as usize).max(1);
    let mut changed = 0;
    for _ in 0..count {
        let gene = genotype.random_gene(rng);
        if genotype.mutate_gene(gene, rng) {
            changed += 1;
        }
    }
    changed
}

/// Single active mutation.
///
/// # Algorithm
///
/// 1. Compute the reachability mask of all outputs
/// 2. Pick a gene uniformly and redraw it
/// 3. Stop once a changed gene is active; otherwise repeat from 2
///
/// Inactive redraws never alter the mask, so it is computed once. Output
/// genes are always active and always have an alternative value, so the
/// loop terminates.
///
/// Returns the number of redraws performed.
pub fn single_active_mutation<R: Rng>(genotype: &mut Genotype, rng: &mut R) -> usize {
    let active = genotype.active_columns();
    let mut attempts = 0;
    loop {
        attempts += 1;
        let gene = genotype.random_gene(rng);
        if genotype.mutate_gene(gene, rng) && genotype.is_active_gene(gene, &active) {
            return attempts;
        }
    }
}

/// Guided active mutation.
///
/// Picks the output with the most mismatches (ties uniformly), restricts
/// the candidate genes to that output's cone plus every output gene, and
/// redraws random candidates until one changes.
///
/// Uses the mismatch counts of the last functional evaluation.
pub fn guided_active_mutation<R: Rng>(genotype: &mut Genotype, rng: &mut R) -> Gene {
    let output = worst_output(genotype, rng);
    let active = genotype.reachable_from(&[genotype.outputs()[output]]);
    let candidates: Vec<Gene> = (0..genotype.gene_count())
        .map(|k| genotype.gene(k))
        .filter(|&gene| genotype.is_active_gene(gene, &active))
        .collect();
    loop {
        let gene = pick(&candidates, rng);
        if genotype.mutate_gene(gene, rng) {
            return gene;
        }
    }
}

/// Index of the output with the largest mismatch count, ties uniformly.
fn worst_output<R: Rng>(genotype: &Genotype, rng: &mut R) -> usize {
    let mismatches = &genotype.fitness().mismatches;
    let worst = mismatches.iter().copied().max().unwrap_or(0);
    let tied: Vec<usize> = mismatches
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m == worst)
        .map(|(k, _)| k)
        .collect();
    if tied.is_empty() {
        rng.random_range(0..genotype.outputs().len())
    } else {
        pick(&tied, rng)
    }
}

/// Applies `strategy` to every genotype of `batch`.
///
/// [`MutationStrategy::Hybrid`] mutates the first `len / 2` genotypes with
/// SAM and the rest with GAM.
pub fn mutate_batch<R: Rng>(
    batch: &mut [Genotype],
    strategy: MutationStrategy,
    point_rate: f64,
    rng: &mut R,
) {
    match strategy {
        MutationStrategy::Point => {
            for g in batch {
                point_mutation(g, point_rate, rng);
            }
        }
        MutationStrategy::SingleActive => {
            for g in batch {
                single_active_mutation(g, rng);
            }
        }
        MutationStrategy::GuidedActive => {
            for g in batch {
                guided_active_mutation(g, rng);
            }
        }
        MutationStrategy::Hybrid => {
            let half = batch.len() / 2;
            let (first, second) = batch.split_at_mut(half);
            mutate_batch(first, MutationStrategy::SingleActive, point_rate, rng);
            mutate_batch(second, MutationStrategy::GuidedActive, point_rate, rng);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
