//! Seeded random number generation.
//!
//! Every stochastic component of the crate takes `&mut R where R: Rng`, so
//! runs are reproducible from a single `u64` seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates a deterministic RNG from a seed.
///
/// # Example
///
/// ```
/// use rand::Rng;
/// use u_cgp::random::create_rng;
///
/// let mut a = create_rng(7);
/// let mut b = create_rng(7);
/// assert_eq!(a.random::<u64>(), b.random::<u64>());
/// ```
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Picks one element of a non-empty slice uniformly at random.
///
/// # Panics
/// Panics if `items` is empty.
pub fn pick<T: Copy, R: Rng>(items: &[T], rng: &mut R) -> T {
    assert!(!items.is_empty(), "cannot pick from an empty slice");
    items[rng.random_range(0..items.len())]
}

/// Draws uniformly from `0..len` excluding `current`.
///
/// Returns `None` when `len <= 1`, i.e. there is no alternative value.
pub fn redraw_excluding<R: Rng>(len: usize, current: usize, rng: &mut R) -> Option<usize> {
    if len <= 1 {
        return None;
    }
    let r = rng.random_range(0..len - 1);
    Some(if r >= current { r + 1 } else { r })
}
