//! Loading declarative model specifications.
//!
//! A specification is line oriented text. Lines beginning with `#` are
//! comments, lines beginning with `^` are directives, and everything else is a
//! row of the table block opened by the most recent table directive:
//!
//! ```text
//! # occasionally dishonest casino
//! ^alphabet 123456
//! ^states honest dishonest
//! ^silent_states start stop
//! ^parameter go_dishonest 0.05
//! ^parameter go_honest 0.1
//! ^parameter go_stop 0.001
//! ^transition_config
//!            honest      dishonest      stop
//! start      0.5         $auto          x
//! honest     $auto       $go_dishonest  $go_stop
//! dishonest  $go_honest  $auto          $go_stop
//! ^emission_config honest
//!         1    2    3    4    5    6
//! honest  0.2  0.2  0.2  0.2  0.1  $auto
//! ^emission_config dishonest
//!            1    2    3    4    5    6
//! dishonest  0.1  0.1  0.1  0.1  0.1  $auto
//! ```
//!
//! The table blocks (`^transition_config` and `^emission_config`) run until
//! the next table directive or the end of the file, so they must come last.
//! The silent states `start` and `stop` are required: the model is entered
//! from `start`, ends in `stop`, and neither emits.
//!
//! Each code is `x` (forbidden), a literal probability, `$name` (the value of
//! a declared parameter), or `$auto` (one minus the rest of the row).

use crate::{
    data::Alphabet,
    errors::HmmError,
    resolver::TransitionMatrix,
};
use std::{io::Read, path::Path};

mod codes;
mod errors;
mod parser;
mod writer;

#[cfg(test)]
pub(crate) mod test;

pub use codes::*;
pub use errors::*;

/// The reserved name of the silent state every path begins in.
pub const START: &str = "start";
/// The reserved name of the silent state every path ends in.
pub const STOP: &str = "stop";
/// The tape name used when a specification declares no `^tapes`.
pub const DEFAULT_TAPE: &str = "seq";

/// A named model state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub name:   String,
    /// Silent states transition but never emit
    pub silent: bool,
}

/// A validated model specification: states, alphabet, tapes, named
/// parameters, and the probability codes of every transition and emission.
///
/// States are identified by their index in declaration order. This index is
/// stable for the lifetime of the specification, unlike the ids assigned by a
/// [`Backend`](crate::backend::Backend).
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSpec {
    pub(crate) alphabet:    Alphabet,
    pub(crate) tapes:       Vec<String>,
    pub(crate) states:      Vec<State>,
    pub(crate) parameters:  Vec<(String, f64)>,
    pub(crate) transitions: TransitionCodes,
    pub(crate) emissions:   Vec<EmissionCodes>,
    pub(crate) start:       usize,
    pub(crate) stop:        usize,
}

impl ModelSpec {
    /// Parses a model specification from text.
    ///
    /// ## Errors
    ///
    /// Any malformed or inconsistent content results in a [`SpecError`]. No
    /// partially loaded model is ever returned.
    pub fn parse(text: &str) -> Result<Self, SpecError> {
        parser::SpecParser::default().parse(text)
    }

    /// Reads the whole source once and parses it.
    ///
    /// ## Errors
    ///
    /// Reading can fail with an I/O error, and parsing with a [`SpecError`].
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, HmmError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text)?)
    }

    /// Reads and parses the specification stored in `filename`.
    ///
    /// ## Errors
    ///
    /// See [`ModelSpec::from_reader`].
    pub fn from_file(filename: impl AsRef<Path>) -> Result<Self, HmmError> {
        Self::from_reader(std::fs::File::open(filename)?)
    }

    #[inline]
    #[must_use]
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// The declared tape names (one or two).
    #[inline]
    #[must_use]
    pub fn tapes(&self) -> &[String] {
        &self.tapes
    }

    #[inline]
    #[must_use]
    pub fn n_tapes(&self) -> usize {
        self.tapes.len()
    }

    /// All states in declaration order.
    #[inline]
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    #[inline]
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    /// Locates the model index of the state called `name`.
    #[inline]
    #[must_use]
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// The name of the state with model index `index`.
    ///
    /// ## Panics
    ///
    /// `index` must be less than [`ModelSpec::n_states`].
    #[inline]
    #[must_use]
    pub fn state_name(&self, index: usize) -> &str {
        &self.states[index].name
    }

    #[inline]
    #[must_use]
    pub fn is_silent(&self, index: usize) -> bool {
        self.states[index].silent
    }

    /// The model index of `start`.
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// The model index of `stop`.
    #[inline]
    #[must_use]
    pub fn stop(&self) -> usize {
        self.stop
    }

    /// The declared parameters and their initial values.
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[(String, f64)] {
        &self.parameters
    }

    #[inline]
    #[must_use]
    pub fn transition_codes(&self) -> &TransitionCodes {
        &self.transitions
    }

    /// Every emission distribution, in declaration order.
    #[inline]
    #[must_use]
    pub fn emission_codes(&self) -> &[EmissionCodes] {
        &self.emissions
    }

    /// Indices into [`ModelSpec::emission_codes`] of the distributions of
    /// `state`, in declaration order.
    pub fn emission_rows_for(&self, state: usize) -> impl Iterator<Item = usize> + '_ {
        self.emissions
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.state == state)
            .map(|(i, _)| i)
    }

    /// Verifies that every emitting state has at least one emission
    /// distribution.
    ///
    /// ## Errors
    ///
    /// Returns [`SpecError::NoEmissions`] naming the first offending state.
    pub fn check_emissions(&self) -> Result<(), SpecError> {
        for (i, state) in self.states.iter().enumerate() {
            if !state.silent && self.emission_rows_for(i).next().is_none() {
                return Err(SpecError::NoEmissions {
                    state: state.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// The largest resolved probability of an emitting state moving to
    /// `stop`, which bounds the expected length of a sampled trajectory from
    /// below. `None` if no emitting state can stop.
    #[must_use]
    pub fn stop_probability(&self, transitions: &TransitionMatrix) -> Option<f64> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.silent)
            .map(|(i, _)| transitions[(i, self.stop)])
            .filter(|&p| p > 0.0)
            .reduce(f64::max)
    }

    /// Iterates over every code referencing the parameter `name`, as
    /// `(row, cell)` pairs: transition codes yield `(Transition(from), to)` and
    /// emission codes yield `(Emission(row), cell)`.
    pub fn references(&self, name: &str) -> impl Iterator<Item = (CodeRow, usize)> {
        let n = self.n_states();
        let transitions = (0..n * n)
            .filter(move |&i| self.transitions[(i / n, i % n)].param() == Some(name))
            .map(move |i| (CodeRow::Transition(i / n), i % n));

        let emissions = self.emissions.iter().enumerate().flat_map(move |(row, e)| {
            e.codes
                .iter()
                .enumerate()
                .filter(move |(_, c)| c.param() == Some(name))
                .map(move |(cell, _)| (CodeRow::Emission(row), cell))
        });

        transitions.chain(emissions)
    }
}

/// Identifies a normalised row of codes: the transitions out of a state, or
/// one emission distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodeRow {
    /// The outgoing transitions of the state with this model index
    Transition(usize),
    /// The emission distribution at this index of
    /// [`ModelSpec::emission_codes`]
    Emission(usize),
}
