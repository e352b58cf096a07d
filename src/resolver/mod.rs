//! Resolving probability codes into concrete probability tables.
//!
//! The [`ProbabilityResolver`] owns the free parameters of a model. Consumers
//! read only the resolved [`TransitionMatrix`] and [`EmissionMatrix`], which
//! are unreadable (stale) from the moment a parameter is added until the next
//! successful [`resolve`](ProbabilityResolver::resolve).

use crate::{
    errors::HmmError,
    math::{PROB_TOLERANCE, sums_to_one},
    model::{EmissionCodes, ModelSpec, ProbCode, TransitionCodes},
};

mod errors;
mod tables;


pub use errors::*;
pub use tables::*;

/// Computes probability tables from the probability codes of a model and the
/// current values of its free parameters.
///
/// Each transition row and each emission distribution is normalised on its
/// own: literal and parameter entries are summed, the `$auto` slot (if any)
/// takes `1 - sum`, and the completed row must sum to one within
/// [`PROB_TOLERANCE`]. Forbidden entries are always exactly zero.
#[derive(Clone, Debug)]
pub struct ProbabilityResolver {
    state_names: Vec<String>,
    n_symbols:   usize,
    transitions: TransitionCodes,
    emissions:   Vec<EmissionCodes>,
    parameters:  Vec<(String, f64)>,
    resolved:    Option<(TransitionMatrix, EmissionMatrix)>,
}

impl ProbabilityResolver {
    /// Creates a resolver for the codes of `spec`, registering its declared
    /// parameters with their initial values. The tables start out stale; call
    /// [`ProbabilityResolver::resolve`] before reading them.
    #[must_use]
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            state_names: spec.states().iter().map(|s| s.name.clone()).collect(),
            n_symbols:   spec.alphabet().len(),
            transitions: spec.transition_codes().clone(),
            emissions:   spec.emission_codes().to_vec(),
            parameters:  spec.parameters().to_vec(),
            resolved:    None,
        }
    }

    /// Registers a new free parameter and marks the tables stale.
    ///
    /// ## Errors
    ///
    /// Fails with [`ParameterError::Duplicate`] if `name` is already defined.
    pub fn add_parameter(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        if self.parameters.iter().any(|(n, _)| n == name) {
            return Err(ParameterError::Duplicate { name: name.to_string() });
        }
        self.parameters.push((name.to_string(), value));
        self.resolved = None;
        Ok(())
    }

    /// Changes the value of an existing parameter and immediately resolves the
    /// tables again.
    ///
    /// ## Errors
    ///
    /// Fails with [`ParameterError::Unknown`] if `name` is not defined, in which
    /// case nothing changes. Otherwise any error of
    /// [`ProbabilityResolver::resolve`] is returned.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), HmmError> {
        self.set_parameters([(name, value)])
    }

    /// Changes the values of several existing parameters, then resolves the
    /// tables once.
    ///
    /// ## Errors
    ///
    /// If any name is not defined, [`ParameterError::Unknown`] is returned
    /// before any value is changed. Otherwise any error of
    /// [`ProbabilityResolver::resolve`] is returned.
    pub fn set_parameters<I, S>(&mut self, updates: I) -> Result<(), HmmError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>, {
        let mut staged = Vec::new();
        for (name, value) in updates {
            let name = name.as_ref();
            let slot = self
                .parameters
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| ParameterError::Unknown { name: name.to_string() })?;
            staged.push((slot, value));
        }

        for (slot, value) in staged {
            self.parameters[slot].1 = value;
        }
        self.resolved = None;
        self.resolve()
    }

    /// Recomputes every probability table from its codes and the current
    /// parameter values.
    ///
    /// The tables are computed into fresh storage and only become readable
    /// once every row has resolved. On failure the resolver is left stale.
    ///
    /// ## Errors
    ///
    /// Returns an [`InvariantError`] when a row is overfull before its `$auto`
    /// slot, does not sum to one, or references a parameter whose value is not
    /// a probability.
    pub fn resolve(&mut self) -> Result<(), HmmError> {
        self.resolved = None;

        let n = self.transitions.n_states();
        let mut transitions = TransitionMatrix::zeros(n);
        for from in (0..n).filter(|&i| self.transitions.has_row(i)) {
            self.resolve_row(self.transitions.row(from), transitions.row_mut(from), || {
                format!("transitions out of '{}'", self.state_names[from])
            })?;
        }

        let mut emissions = EmissionMatrix::zeros(&self.emissions, self.n_symbols);
        for (row, codes) in self.emissions.iter().enumerate() {
            self.resolve_row(codes.codes(), emissions.row_mut(row).cells_mut(), || {
                format!("emissions of '{}'", self.state_names[codes.state()])
            })?;
        }

        self.resolved = Some((transitions, emissions));
        Ok(())
    }

    /// Fills `out` with the probabilities for one row of `codes`.
    fn resolve_row(
        &self, codes: &[ProbCode], out: &mut [f64], describe: impl Fn() -> String,
    ) -> Result<(), InvariantError> {
        let mut sum = 0.0;
        for (slot, code) in out.iter_mut().zip(codes) {
            *slot = match code {
                ProbCode::Forbidden | ProbCode::Auto => 0.0,
                ProbCode::Literal(value) => *value,
                ProbCode::Param(name) => self.probability_of(name)?,
            };
            sum += *slot;
        }
        if sum > 1.0 + PROB_TOLERANCE {
            return Err(InvariantError::OverfullRow { row: describe(), sum });
        }

        if let Some(i) = codes.iter().position(|c| *c == ProbCode::Auto) {
            // Rounding may leave the remainder a hair below zero
            out[i] = (1.0 - sum).max(0.0);
        }

        let total: f64 = out.iter().sum();
        if sums_to_one(total) {
            Ok(())
        } else {
            Err(InvariantError::RowSum {
                row: describe(),
                sum: total,
            })
        }
    }

    /// Looks up a parameter referenced by a code, which must be a probability.
    fn probability_of(&self, name: &str) -> Result<f64, InvariantError> {
        // Codes only ever reference declared parameters
        let value = self
            .parameters
            .iter()
            .find(|(n, _)| n == name)
            .map_or(f64::NAN, |(_, v)| *v);

        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(InvariantError::OutOfRange {
                name: name.to_string(),
                value,
            })
        }
    }

    /// Whether the tables must be resolved before they can be read.
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.resolved.is_none()
    }

    /// The current parameters and their values, in registration order.
    ///
    /// ## Errors
    ///
    /// Fails with [`ParameterError::Stale`] if the tables are stale.
    #[inline]
    pub fn values(&self) -> Result<&[(String, f64)], ParameterError> {
        if self.is_stale() {
            Err(ParameterError::Stale)
        } else {
            Ok(&self.parameters)
        }
    }

    /// The current value of a single parameter.
    ///
    /// ## Errors
    ///
    /// Fails if the tables are stale or `name` is not defined.
    pub fn value(&self, name: &str) -> Result<f64, ParameterError> {
        self.values()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| ParameterError::Unknown { name: name.to_string() })
    }

    /// The resolved transition probabilities.
    ///
    /// ## Errors
    ///
    /// Fails with [`ParameterError::Stale`] if the tables are stale.
    #[inline]
    pub fn transitions(&self) -> Result<&TransitionMatrix, ParameterError> {
        self.resolved.as_ref().map(|(t, _)| t).ok_or(ParameterError::Stale)
    }

    /// The resolved emission probabilities.
    ///
    /// ## Errors
    ///
    /// Fails with [`ParameterError::Stale`] if the tables are stale.
    #[inline]
    pub fn emissions(&self) -> Result<&EmissionMatrix, ParameterError> {
        self.resolved.as_ref().map(|(_, e)| e).ok_or(ParameterError::Stale)
    }
}
