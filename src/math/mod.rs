mod float_compare;

pub use float_compare::*;

/// The absolute tolerance within which every resolved transition row and
/// emission distribution must sum to one.
pub const PROB_TOLERANCE: f64 = 1e-10;

/// The relative tolerance used when checking that expected emission counts
/// agree with expected visits to the emitting state.
pub const STATS_TOLERANCE: f64 = 1e-6;

/// Returns whether `sum` is one within [`PROB_TOLERANCE`].
#[inline]
#[must_use]
pub(crate) fn sums_to_one(sum: f64) -> bool {
    NearlyEqualStrategy::Absolute { eps: PROB_TOLERANCE }.nearly_equal_float(sum, 1.0)
}

/// Natural log that maps probability zero to negative infinity without a NaN
/// for tiny negative rounding residue.
#[inline]
#[must_use]
pub(crate) fn ln_prob(p: f64) -> f64 {
    if p > 0.0 { p.ln() } else { f64::NEG_INFINITY }
}
