//! Survivor selection.
//!
//! Single-objective phases keep one winner per generation and clone it
//! into every slot (a (1 + λ) scheme). The winner is chosen by
//! [`best_by_error`] during feasibility search and by [`best_optimized`]
//! during transistor minimization. Multi-objective survivor selection
//! ([`SelectionStrategy`]) lives on [`Population`](super::Population).
//!
//! Ties are broken uniformly at random so that neutral offspring can
//! replace their parent, which is what drives genetic drift in CGP.
//!
//! # References
//!
//! - Miller (2011), *Cartesian Genetic Programming*, ch. 2 (1 + λ strategy)
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective GA: NSGA-II"

use super::config::ConfigError;
use super::genotype::Genotype;
use crate::random::pick;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Multi-objective survivor selection.
///
/// # Examples
///
/// ```
/// use u_cgp::cgp::SelectionStrategy;
///
/// assert_eq!("aps".parse::<SelectionStrategy>().unwrap(), SelectionStrategy::Aps);
/// assert_eq!(SelectionStrategy::default(), SelectionStrategy::Nsga2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionStrategy {
    /// Fill with whole Pareto fronts, truncate the overflowing front by
    /// crowding distance.
    #[default]
    Nsga2,
    /// Keep only the first front, truncated by crowding distance.
    Aps,
}

impl SelectionStrategy {
    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            SelectionStrategy::Nsga2 => "nsga2",
            SelectionStrategy::Aps => "aps",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nsga2" => Ok(SelectionStrategy::Nsga2),
            "aps" => Ok(SelectionStrategy::Aps),
            other => Err(ConfigError::UnknownSelection(other.to_string())),
        }
    }
}

/// Index of a minimum-error individual, ties uniformly at random.
///
/// # Panics
/// Panics if `individuals` is empty.
pub fn best_by_error<R: Rng>(individuals: &[Genotype], rng: &mut R) -> usize {
    assert!(!individuals.is_empty(), "cannot select from empty population");
    let best = individuals
        .iter()
        .map(|g| g.fitness().error)
        .min()
        .unwrap_or(u128::MAX);
    pick_where(individuals, rng, |g| g.fitness().error == best)
}

/// Index of the cheapest individual whose error equals `best_error`.
///
/// Among those, the one with the fewest transistors wins, ties uniformly at
/// random. If no individual reaches `best_error`, falls back to
/// [`best_by_error`].
///
/// # Panics
/// Panics if `individuals` is empty.
pub fn best_optimized<R: Rng>(individuals: &[Genotype], best_error: u128, rng: &mut R) -> usize {
    assert!(!individuals.is_empty(), "cannot select from empty population");
    let cheapest = individuals
        .iter()
        .filter(|g| g.fitness().error == best_error)
        .map(|g| g.fitness().transistors)
        .min();
    match cheapest {
        Some(t) => pick_where(individuals, rng, |g| {
            g.fitness().error == best_error && g.fitness().transistors == t
        }),
        None => best_by_error(individuals, rng),
    }
}

fn pick_where<R: Rng>(
    individuals: &[Genotype],
    rng: &mut R,
    keep: impl Fn(&Genotype) -> bool,
) -> usize {
    let tied: Vec<usize> = individuals
        .iter()
        .enumerate()
        .filter(|(_, g)| keep(g))
        .map(|(i, _)| i)
        .collect();
    pick(&tied, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgp::CircuitLayout;
    use crate::random::create_rng;

    fn with_fitness(error: u128, transistors: u32) -> Genotype {
        let mut rng = create_rng(0);
        let layout = CircuitLayout::new(2, 1, 3, 3).unwrap();
        let mut g = Genotype::random(layout, &mut rng);
        let f = g.fitness_mut();
        f.error = error;
        f.transistors = transistors;
        g
    }

    #[test]
    fn test_parse_strategies() {
        assert_eq!("nsga2".parse::<SelectionStrategy>().unwrap(), SelectionStrategy::Nsga2);
        assert_eq!(SelectionStrategy::Aps.to_string(), "aps");
        assert!(matches!(
            "so".parse::<SelectionStrategy>(),
            Err(ConfigError::UnknownSelection(_))
        ));
    }

    #[test]
    fn test_best_by_error_unique() {
        let mut rng = create_rng(1);
        let pop = vec![with_fitness(5, 0), with_fitness(2, 0), with_fitness(7, 0)];
        for _ in 0..20 {
            assert_eq!(best_by_error(&pop, &mut rng), 1);
        }
    }

    #[test]
    fn test_best_by_error_breaks_ties_randomly() {
        let mut rng = create_rng(2);
        let pop = vec![with_fitness(3, 0), with_fitness(1, 0), with_fitness(1, 0)];
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[best_by_error(&pop, &mut rng)] = true;
        }
        assert_eq!(seen, [false, true, true]);
    }

    #[test]
    fn test_best_optimized_prefers_fewer_transistors() {
        let mut rng = create_rng(3);
        let pop = vec![
            with_fitness(0, 40),
            with_fitness(0, 28),
            with_fitness(1, 10),
            with_fitness(0, 30),
        ];
        for _ in 0..20 {
            assert_eq!(best_optimized(&pop, 0, &mut rng), 1);
        }
    }

    #[test]
    fn test_best_optimized_falls_back_to_error() {
        let mut rng = create_rng(4);
        let pop = vec![with_fitness(4, 10), with_fitness(2, 50)];
        assert_eq!(best_optimized(&pop, 0, &mut rng), 1);
    }
}
