use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// The author's intent for a single transition or emission probability.
///
/// Codes are resolved into concrete probabilities by the
/// [`ProbabilityResolver`](crate::resolver::ProbabilityResolver).
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ProbCode {
    /// Not a valid transition or emission; always resolves to zero
    #[default]
    Forbidden,
    /// A fixed probability in `[0, 1]`
    Literal(f64),
    /// Takes the current value of the named free parameter
    Param(String),
    /// Takes whatever probability the rest of the row leaves over
    Auto,
}

impl ProbCode {
    /// Parses a single code token: `x`, `$auto`, `$name`, or a literal.
    /// Returns `None` for anything else, including literals outside `[0, 1]`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "x" => Some(ProbCode::Forbidden),
            "$auto" => Some(ProbCode::Auto),
            _ => {
                if let Some(name) = token.strip_prefix('$') {
                    if name.is_empty() {
                        None
                    } else {
                        Some(ProbCode::Param(name.to_string()))
                    }
                } else {
                    let value = token.parse::<f64>().ok()?;
                    (0.0..=1.0).contains(&value).then_some(ProbCode::Literal(value))
                }
            }
        }
    }

    /// The name of the referenced parameter, if any.
    #[inline]
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        match self {
            ProbCode::Param(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ProbCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProbCode::Forbidden => write!(f, "x"),
            ProbCode::Literal(v) => write!(f, "{v}"),
            ProbCode::Param(name) => write!(f, "${name}"),
            ProbCode::Auto => write!(f, "$auto"),
        }
    }
}

/// The transition codes of a model, arranged as a dense square table indexed
/// by `(from, to)` model state indices. Pairs never mentioned in the
/// specification are [`ProbCode::Forbidden`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionCodes {
    n:        usize,
    codes:    Vec<ProbCode>,
    declared: Vec<bool>,
}

impl TransitionCodes {
    /// Creates a table for `n` states with every transition forbidden.
    #[must_use]
    pub(crate) fn new(n: usize) -> Self {
        Self {
            n,
            codes: vec![ProbCode::Forbidden; n * n],
            declared: vec![false; n],
        }
    }

    /// The number of states.
    #[inline]
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.n
    }

    /// The codes of every transition out of `from`, indexed by destination.
    #[inline]
    #[must_use]
    pub fn row(&self, from: usize) -> &[ProbCode] {
        &self.codes[from * self.n..(from + 1) * self.n]
    }

    /// Whether the specification gave a row for `from`.
    #[inline]
    #[must_use]
    pub fn has_row(&self, from: usize) -> bool {
        self.declared[from]
    }

    #[inline]
    pub(crate) fn mark_row(&mut self, from: usize) {
        self.declared[from] = true;
    }
}

impl Index<(usize, usize)> for TransitionCodes {
    type Output = ProbCode;

    /// Retrieves the code for moving from state `index.0` to state `index.1`.
    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.codes[index.0 * self.n + index.1]
    }
}

impl IndexMut<(usize, usize)> for TransitionCodes {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.codes[index.0 * self.n + index.1]
    }
}

/// The tapes an emission distribution emits onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TapeSet {
    /// One symbol onto the given tape
    Single(usize),
    /// One symbol onto each of the two tapes, drawn jointly
    Joint,
}

impl TapeSet {
    /// Whether a distribution over this tape set emits onto `tape`.
    #[inline]
    #[must_use]
    pub fn covers(self, tape: usize) -> bool {
        match self {
            TapeSet::Single(t) => t == tape,
            TapeSet::Joint => true,
        }
    }

    /// Whether two tape sets emit onto a common tape.
    #[inline]
    #[must_use]
    pub fn overlaps(self, other: TapeSet) -> bool {
        match self {
            TapeSet::Single(t) => other.covers(t),
            TapeSet::Joint => true,
        }
    }

    /// The number of cells in a distribution over this tape set.
    #[inline]
    #[must_use]
    pub fn n_cells(self, n_symbols: usize) -> usize {
        match self {
            TapeSet::Single(_) => n_symbols,
            TapeSet::Joint => n_symbols * n_symbols,
        }
    }

    /// The symbols emitted by cell `cell`, as `(tape, symbol)` pairs.
    #[inline]
    #[must_use]
    pub fn symbols(self, cell: usize, n_symbols: usize) -> Vec<(usize, usize)> {
        match self {
            TapeSet::Single(t) => vec![(t, cell)],
            TapeSet::Joint => vec![(0, cell / n_symbols), (1, cell % n_symbols)],
        }
    }
}

/// The codes of one emission distribution of one emitting state.
///
/// For [`TapeSet::Single`], cells are indexed by symbol. For
/// [`TapeSet::Joint`], the cell for tape-1 symbol `a` and tape-2 symbol `b` is
/// `a * n_symbols + b`.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionCodes {
    pub(crate) state: usize,
    pub(crate) tapes: TapeSet,
    pub(crate) codes: Vec<ProbCode>,
}

impl EmissionCodes {
    /// The model index of the emitting state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> usize {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn tapes(&self) -> TapeSet {
        self.tapes
    }

    #[inline]
    #[must_use]
    pub fn codes(&self) -> &[ProbCode] {
        &self.codes
    }
}
