//! The boundary to the numeric engine running the dynamic-programming
//! recursions.
//!
//! An engine implements [`Backend`]. Every table it returns numbers the model
//! states with its own integer ids, and those ids are only meaningful for that
//! one table instance: two tables (even from the same engine) may give the same
//! state different ids. Paths are therefore always translated to state names
//! through a [`StateIds`] lookup built from the table that produced them, and
//! compared by name.

use crate::{
    data::Sequences,
    generate::SamplingRng,
    math::STATS_TOLERANCE,
    model::ModelSpec,
    resolver::{EmissionMatrix, TransitionMatrix},
};

mod dense;
mod errors;

#[cfg(test)]
mod test;

pub use dense::*;
pub use errors::*;

/// A state path as a sequence of engine ids, valid only for the table that
/// produced it. A path lists the states entered after `start`, ending with
/// `stop`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Path(pub Vec<usize>);

impl Path {
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An engine table that can translate its own state ids to state names.
pub trait StateTable {
    /// The number of ids the table assigns.
    fn n_states(&self) -> usize;

    /// The name of the state with id `id` in this table, if there is one.
    fn state_name(&self, id: usize) -> Option<&str>;
}

/// An id to name lookup captured from a single engine table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateIds {
    names: Vec<String>,
}

impl StateIds {
    /// Captures the names of every id of `table`.
    ///
    /// ## Errors
    ///
    /// Fails if the table has no name for one of its ids.
    pub fn from_table<T: StateTable + ?Sized>(table: &T) -> Result<Self, EngineContractError> {
        let names = (0..table.n_states())
            .map(|id| {
                table
                    .state_name(id)
                    .map(str::to_string)
                    .ok_or(EngineContractError::MissingStateId { id })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { names })
    }

    /// The name of the state with id `id`.
    ///
    /// ## Errors
    ///
    /// Fails if the id was not issued by the table this lookup came from.
    #[inline]
    pub fn name(&self, id: usize) -> Result<&str, EngineContractError> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or(EngineContractError::MissingStateId { id })
    }

    /// Translates every id of `path` to its state name.
    ///
    /// ## Errors
    ///
    /// Fails on the first id with no mapping.
    pub fn translate(&self, path: &Path) -> Result<Vec<String>, EngineContractError> {
        path.ids().iter().map(|&id| self.name(id).map(str::to_string)).collect()
    }
}

/// The Baum-Welch sufficient statistics of one forward-backward pass: expected
/// transition counts indexed by `(from, to)` model state indices, and expected
/// emission counts with the same shape as the resolved emission table (one row
/// per emission distribution, one cell per symbol or symbol pair).
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    pub transitions: TransitionMatrix,
    pub emissions:   EmissionMatrix,
}

impl Statistics {
    /// Checks the forward-backward identity: every emission distribution of a
    /// state is used once per visit, so its expected counts must sum to the
    /// expected number of transitions into that state.
    ///
    /// ## Errors
    ///
    /// Returns [`EngineContractError::InconsistentStatistics`] for the first
    /// distribution whose total differs from the expected visits by more than
    /// [`STATS_TOLERANCE`] (relative, or absolute below one visit).
    pub fn check_consistency(&self, model: &ModelSpec) -> Result<(), EngineContractError> {
        let agrees = |emitted: f64, visits: f64| (emitted - visits).abs() <= STATS_TOLERANCE * visits.abs().max(1.0);

        for row in self.emissions.rows() {
            let visits = self.transitions.column_sum(row.state());
            let emitted = row.total();
            if !agrees(emitted, visits) {
                return Err(EngineContractError::InconsistentStatistics {
                    state: model.state_name(row.state()).to_string(),
                    emitted,
                    visits,
                });
            }
        }
        Ok(())
    }
}

/// The operations of a numeric HMM engine, parameterised by resolved
/// probability tables.
///
/// Each operation returns a fresh table that owns its own id numbering. The
/// forward and backward tables only live for one estimation iteration and the
/// Viterbi table only until its traceback, so none of them are retained by the
/// driver.
pub trait Backend {
    /// The backward table of the model with its emissions removed, used to
    /// sample a path.
    type NoEmissionTable: StateTable;
    type ForwardTable;
    type BackwardTable;
    type ViterbiTable: StateTable;

    /// Computes the no-emission backward table from the current transition
    /// probabilities.
    ///
    /// ## Errors
    ///
    /// Fails if `stop` cannot be reached from `start`.
    fn no_emission_backward(&mut self, transitions: &TransitionMatrix) -> Result<Self::NoEmissionTable, EngineContractError>;

    /// Samples a complete path from `start` to `stop`, in the ids of `table`.
    ///
    /// ## Errors
    ///
    /// Fails if the path does not terminate.
    fn sample_no_emission(
        &mut self, table: &Self::NoEmissionTable, rng: &mut SamplingRng,
    ) -> Result<Path, EngineContractError>;

    /// Runs the forward recursion, returning the natural log-likelihood of
    /// `sequences` and the forward table.
    ///
    /// ## Errors
    ///
    /// Fails if the model or sequence is unsupported, or the sequence is
    /// impossible.
    fn forward(
        &mut self, emissions: &EmissionMatrix, transitions: &TransitionMatrix, sequences: &Sequences,
    ) -> Result<(f64, Self::ForwardTable), EngineContractError>;

    /// Runs the backward recursion against a forward table from the same
    /// parameters and sequences, accumulating the Baum-Welch statistics.
    ///
    /// ## Errors
    ///
    /// Fails if `forward` does not match `sequences`.
    fn backward_with_statistics(
        &mut self, forward: &Self::ForwardTable, emissions: &EmissionMatrix, transitions: &TransitionMatrix,
        sequences: &Sequences,
    ) -> Result<(Statistics, Self::BackwardTable), EngineContractError>;

    /// Runs the Viterbi recursion.
    ///
    /// ## Errors
    ///
    /// Fails if the model or sequence is unsupported.
    fn viterbi_recurse(
        &mut self, emissions: &EmissionMatrix, transitions: &TransitionMatrix, sequences: &Sequences,
    ) -> Result<Self::ViterbiTable, EngineContractError>;

    /// Traces the most probable path back through a Viterbi table, in the ids
    /// of that table.
    ///
    /// ## Errors
    ///
    /// Fails with [`EngineContractError::NoPathFound`] if every path has
    /// probability zero.
    fn viterbi_trace(&mut self, table: &Self::ViterbiTable) -> Result<Path, EngineContractError>;
}
