use crate::resolver::InvariantError;
use rand::Rng;
use rand_xoshiro::{Xoshiro256PlusPlus, rand_core::SeedableRng};

/// The random number generator used for sampling trajectories and emissions.
pub type SamplingRng = Xoshiro256PlusPlus;

/// Creates the sampling RNG from a seed, so a run is reproducible given its
/// [`DriverConfig`](crate::driver::DriverConfig).
#[inline]
#[must_use]
pub fn seeded_rng(seed: u64) -> SamplingRng {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// Draws a category from `probs` by inverse-CDF sampling with a fresh uniform
/// variate in `[0, 1)`. See [`select_category`].
///
/// ## Errors
///
/// Fails if no category has nonzero probability.
#[inline]
pub fn draw_category<R: Rng>(probs: &[f64], rng: &mut R) -> Result<usize, InvariantError> {
    select_category(probs, rng.random::<f64>())
}

/// Selects the category for the uniform variate `u`: the probabilities are
/// subtracted from `u` in order until the running value goes negative.
///
/// Categories with probability zero are never selected. When rounding leaves
/// `u` unexhausted after the final category, the last category with nonzero
/// probability is chosen.
///
/// ## Errors
///
/// Fails if no category has nonzero probability.
pub fn select_category(probs: &[f64], mut u: f64) -> Result<usize, InvariantError> {
    let mut last_possible = None;

    for (i, &p) in probs.iter().enumerate() {
        if p > 0.0 {
            last_possible = Some(i);
        }
        u -= p;
        if u < 0.0 {
            return Ok(i);
        }
    }

    last_possible.ok_or(InvariantError::EmptyDistribution)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn categories_follow_declared_order() {
        let probs = [0.1, 0.0, 0.2, 0.7];
        assert_eq!(select_category(&probs, 0.0), Ok(0));
        assert_eq!(select_category(&probs, 0.099), Ok(0));
        assert_eq!(select_category(&probs, 0.1), Ok(2));
        assert_eq!(select_category(&probs, 0.29), Ok(2));
        assert_eq!(select_category(&probs, 0.3), Ok(3));
        assert_eq!(select_category(&probs, 0.999_999), Ok(3));
    }

    #[test]
    fn rounding_falls_back_to_last_possible() {
        let probs = [0.5, 0.5 - 1e-12, 0.0];
        assert_eq!(select_category(&probs, 1.0 - 1e-13), Ok(1));
    }

    #[test]
    fn empty_distribution_fails() {
        assert_eq!(select_category(&[0.0, 0.0], 0.5), Err(InvariantError::EmptyDistribution));
        assert_eq!(select_category(&[], 0.5), Err(InvariantError::EmptyDistribution));
    }

    #[test]
    fn draws_match_frequencies() {
        const N: usize = 20_000;
        let probs = [0.25, 0.0, 0.75];
        let mut rng = seeded_rng(42);
        let mut counts = [0usize; 3];
        for _ in 0..N {
            counts[draw_category(&probs, &mut rng).unwrap()] += 1;
        }

        assert_eq!(counts[1], 0);
        #[allow(clippy::cast_precision_loss)]
        let frac = counts[0] as f64 / N as f64;
        assert!((frac - 0.25).abs() < 0.02);
    }
}
