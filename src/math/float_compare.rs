/// A trait unifying the methods for comparing two probabilities or counts.
/// This is implemented for [`NearlyEqualStrategy`] (provided methods for
/// comparing floats) and `Fn(f64, f64) -> bool` closures (custom comparison
/// methods).
///
/// <div class="warning">
///
/// **Warning**
///
/// This is an implementation detail and *should not* be called directly! Use
/// [`is_fp_eq`] or [`assert_fp_eq`] instead.
///
/// </div>
#[doc(hidden)]
pub trait NearlyEqualMethod {
    fn nearly_equal_float(&self, a: f64, b: f64) -> bool;
}

/// An enum for provided floating point comparison methods.
#[doc(hidden)]
pub enum NearlyEqualStrategy {
    /// Compare the floating point values using relative error with a tolerance
    /// of `eps`
    Relative { eps: f64 },
    /// Compare the floating point values using absolute error with a tolerance
    /// of `eps`
    Absolute { eps: f64 },
}

impl NearlyEqualMethod for NearlyEqualStrategy {
    /// Tests if two floating points are approximately equal within an epsilon.
    /// Relative error port courtesy of
    /// <https://floating-point-gui.de/errors/comparison/>
    #[allow(clippy::float_cmp)]
    fn nearly_equal_float(&self, a: f64, b: f64) -> bool {
        match self {
            NearlyEqualStrategy::Relative { eps } => {
                let abs_a = a.abs();
                let abs_b = b.abs();
                let diff = (a - b).abs();

                if a == b {
                    // shortcut, handles infinities
                    true
                } else if a == 0.0 || b == 0.0 || (abs_a + abs_b < f64::MIN_POSITIVE) {
                    // relative error is less meaningful near zero
                    diff < *eps * f64::MIN_POSITIVE
                } else {
                    diff / (abs_a + abs_b).min(f64::MAX) < *eps
                }
            }
            NearlyEqualStrategy::Absolute { eps } => a == b || (a - b).abs() < *eps,
        }
    }
}

impl<F: Fn(f64, f64) -> bool> NearlyEqualMethod for F {
    fn nearly_equal_float(&self, a: f64, b: f64) -> bool {
        self(a, b)
    }
}

/// A trait for enabling equality comparisons of probabilities, counts, and the
/// tables holding them using a given comparison method.
#[doc(hidden)]
pub trait NearlyEqual {
    /// Check whether two values are approximately equal using `method`. The
    /// first value in the tuple is whether they are approximately equal.
    ///
    /// The second is optionally the first pair of unequal floats. It is `None`
    /// when the values differ in shape rather than content.
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, method: &M) -> (bool, Option<(f64, f64)>);
}

impl NearlyEqual for f64 {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, strategy: &M) -> (bool, Option<(f64, f64)>) {
        if strategy.nearly_equal_float(*self, *b) {
            (true, None)
        } else {
            (false, Some((*self, *b)))
        }
    }
}

impl<S: NearlyEqual> NearlyEqual for Option<S> {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, strategy: &M) -> (bool, Option<(f64, f64)>) {
        match (self, b) {
            (Some(x), Some(y)) => x.nearly_equal(y, strategy),
            (None, None) => (true, None),
            _ => (false, None),
        }
    }
}

impl<S: NearlyEqual> NearlyEqual for [S] {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, strategy: &M) -> (bool, Option<(f64, f64)>) {
        if self.len() != b.len() {
            return (false, None);
        }
        for (eq, vals) in self.iter().zip(b).map(|(x, y)| x.nearly_equal(y, strategy)) {
            if !eq {
                return (false, vals);
            }
        }
        (true, None)
    }
}

impl<S: NearlyEqual> NearlyEqual for Vec<S> {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, strategy: &M) -> (bool, Option<(f64, f64)>) {
        self.as_slice().nearly_equal(b.as_slice(), strategy)
    }
}

/// Assert that two floating point values (or tables of them) are
/// approximately equal.
///
/// The default compares with relative error and $\epsilon=10^{-8}$:
/// ```
/// # use hmmtrain::assert_fp_eq;
/// assert_fp_eq!(0.3, 0.1 + 0.2);
/// ```
///
/// The tolerance can be given as a third argument, and the method can be
/// switched to absolute error (`@absolute`) or a custom closure (`@custom`):
/// ```
/// # use hmmtrain::assert_fp_eq;
/// assert_fp_eq!(@relative, 3.0, 2.99999, 1e-4);
/// assert_fp_eq!(@absolute, 1.0 - 1e-12, 1.0, 1e-10);
/// assert_fp_eq!(@custom, 0.5, 0.5000001, |x: f64, y: f64| (x - y).abs() < 1e-3);
/// ```
///
/// Besides `f64`, `Option`, slices and `Vec` of comparable values can be
/// compared, as can [`TransitionMatrix`] and [`EmissionMatrix`].
///
/// [`TransitionMatrix`]: crate::resolver::TransitionMatrix
/// [`EmissionMatrix`]: crate::resolver::EmissionMatrix
#[macro_export]
macro_rules! assert_fp_eq {
    (@strategy, $a:expr, $b:expr, $strategy:expr, $epsilon:expr) => {
        let (eq, vals) = $crate::math::NearlyEqual::nearly_equal(&$a, &$b, &$strategy);
        if !eq {
            if let Some((a, b)) = vals {
                panic!("assertion failed: `(found ≈ expected)`\n left:\t`{:?}`,\n right:\t`{:?}`,\n eps:\t`{}`,\n\n Caused by the comparison of:\n left:\t`{:?}`,\n right:\t`{:?}`", $a, $b, $epsilon, a, b)
            } else {
                panic!("assertion failed: `(found ≈ expected)`\n left:\t`{:?}`,\n right:\t`{:?}`,\n eps:\t`{}`", $a, $b, $epsilon)
            }
        }
    };
    ($(@$method:tt,)? $a:expr, $b:expr) => {
        $crate::assert_fp_eq!($(@$method,)? $a, $b, 1e-8);
    };
    ($(@relative,)? $a:expr, $b:expr, $epsilon:expr) => {
        $crate::assert_fp_eq!(@strategy, $a, $b, $crate::math::NearlyEqualStrategy::Relative { eps: $epsilon }, $epsilon)
    };
    (@absolute, $a:expr, $b:expr, $epsilon:expr) => {
        $crate::assert_fp_eq!(@strategy, $a, $b, $crate::math::NearlyEqualStrategy::Absolute { eps: $epsilon }, $epsilon)
    };
    (@custom, $a:expr, $b:expr, $closure:expr) => {
        $crate::assert_fp_eq!(@strategy, $a, $b, $closure, "custom")
    };
}

/// Check whether two floating point values are approximately equal.
///
/// Similar to [`assert_fp_eq`], but returns a boolean rather than performing an
/// assertion.
#[macro_export]
macro_rules! is_fp_eq {
    ($(@$method:tt,)? $a:expr, $b:expr) => {
        $crate::is_fp_eq!($(@$method,)? $a, $b, 1e-8)
    };
    ($(@relative,)? $a:expr, $b:expr, $epsilon:expr) => {
        $crate::math::NearlyEqual::nearly_equal(&$a, &$b, &$crate::math::NearlyEqualStrategy::Relative { eps: $epsilon }).0
    };
    (@absolute, $a:expr, $b:expr, $epsilon:expr) => {
        $crate::math::NearlyEqual::nearly_equal(&$a, &$b, &$crate::math::NearlyEqualStrategy::Absolute { eps: $epsilon }).0
    };
    (@custom, $a:expr, $b:expr, $closure:expr) => {
        $crate::math::NearlyEqual::nearly_equal(&$a, &$b, &$closure).0
    };
}
