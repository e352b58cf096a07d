use crate::{
    math::{NearlyEqual, NearlyEqualMethod},
    model::{EmissionCodes, TapeSet},
};
use std::ops::{Index, IndexMut};

/// A dense square table of transition probabilities (or expected transition
/// counts), indexed by `(from, to)` model state indices.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrix {
    n:    usize,
    data: Vec<f64>,
}

impl TransitionMatrix {
    /// Creates an `n` by `n` table of zeros.
    #[inline]
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    #[inline]
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.n
    }

    /// The entries for every transition out of `from`, indexed by destination.
    #[inline]
    #[must_use]
    pub fn row(&self, from: usize) -> &[f64] {
        &self.data[from * self.n..(from + 1) * self.n]
    }

    #[inline]
    pub fn row_mut(&mut self, from: usize) -> &mut [f64] {
        &mut self.data[from * self.n..(from + 1) * self.n]
    }

    /// The sum of the entries moving into `to`.
    #[must_use]
    pub fn column_sum(&self, to: usize) -> f64 {
        (0..self.n).map(|from| self[(from, to)]).sum()
    }
}

impl Index<(usize, usize)> for TransitionMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.data[index.0 * self.n + index.1]
    }
}

impl IndexMut<(usize, usize)> for TransitionMatrix {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.data[index.0 * self.n + index.1]
    }
}

impl NearlyEqual for TransitionMatrix {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, method: &M) -> (bool, Option<(f64, f64)>) {
        if self.n == b.n {
            self.data.nearly_equal(&b.data, method)
        } else {
            (false, None)
        }
    }
}

/// One emission distribution of one emitting state, with the same cell layout
/// as its [`EmissionCodes`].
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionRow {
    state: usize,
    tapes: TapeSet,
    cells: Vec<f64>,
}

impl EmissionRow {
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
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut [f64] {
        &mut self.cells
    }

    /// The sum over every cell.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }
}

/// Every emission distribution of a model (probabilities, or expected
/// emission counts), in the declaration order of
/// [`ModelSpec::emission_codes`](crate::model::ModelSpec::emission_codes).
/// Indexing with `(row, cell)` retrieves a single entry.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionMatrix {
    rows:      Vec<EmissionRow>,
    n_symbols: usize,
}

impl EmissionMatrix {
    /// Creates a table of zeros shaped like `codes`, for an alphabet of
    /// `n_symbols` symbols.
    #[must_use]
    pub fn zeros(codes: &[EmissionCodes], n_symbols: usize) -> Self {
        let rows = codes
            .iter()
            .map(|c| EmissionRow {
                state: c.state(),
                tapes: c.tapes(),
                cells: vec![0.0; c.codes().len()],
            })
            .collect();
        Self { rows, n_symbols }
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[EmissionRow] {
        &self.rows
    }

    #[inline]
    #[must_use]
    pub fn row(&self, row: usize) -> &EmissionRow {
        &self.rows[row]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut EmissionRow {
        &mut self.rows[row]
    }

    /// The distributions of the state with model index `state`.
    #[inline]
    pub fn rows_for(&self, state: usize) -> impl Iterator<Item = &EmissionRow> {
        self.rows.iter().filter(move |r| r.state == state)
    }

    /// The probability that `state` emits `symbol` onto `tape`, marginalising
    /// over the other tape for joint distributions. Zero if `state` has no
    /// distribution covering `tape`.
    #[must_use]
    pub fn symbol_probability(&self, state: usize, tape: usize, symbol: usize) -> f64 {
        let Some(row) = self.rows_for(state).find(|r| r.tapes.covers(tape)) else {
            return 0.0;
        };

        match row.tapes {
            TapeSet::Single(_) => row.cells[symbol],
            TapeSet::Joint => {
                let n = self.n_symbols;
                if tape == 0 {
                    row.cells[symbol * n..(symbol + 1) * n].iter().sum()
                } else {
                    row.cells.iter().skip(symbol).step_by(n).sum()
                }
            }
        }
    }
}

impl Index<(usize, usize)> for EmissionMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.rows[index.0].cells[index.1]
    }
}

impl IndexMut<(usize, usize)> for EmissionMatrix {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.rows[index.0].cells[index.1]
    }
}

impl NearlyEqual for EmissionMatrix {
    fn nearly_equal<M: NearlyEqualMethod>(&self, b: &Self, method: &M) -> (bool, Option<(f64, f64)>) {
        if self.rows.len() != b.rows.len() || self.n_symbols != b.n_symbols {
            return (false, None);
        }
        for (x, y) in self.rows.iter().zip(&b.rows) {
            if x.state != y.state || x.tapes != y.tapes {
                return (false, None);
            }
            let (eq, vals) = x.cells.nearly_equal(&y.cells, method);
            if !eq {
                return (false, vals);
            }
        }
        (true, None)
    }
}
