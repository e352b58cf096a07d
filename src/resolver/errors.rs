use crate::errors::GetCode;
use std::{error::Error, fmt};

/// An enum representing misuse of the free-parameter interface of a
/// [`ProbabilityResolver`](super::ProbabilityResolver).
#[non_exhaustive]
#[derive(Clone, Eq, PartialEq)]
pub enum ParameterError {
    /// A parameter with this name is already registered
    Duplicate { name: String },
    /// No parameter with this name is registered
    Unknown { name: String },
    /// The probability tables were read while stale
    Stale,
}

impl fmt::Display for ParameterError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParameterError::Duplicate { name } => write!(f, "the parameter '{name}' is already defined"),
            ParameterError::Unknown { name } => write!(f, "the parameter '{name}' is not defined"),
            ParameterError::Stale => write!(
                f,
                "the probability tables are stale and must be resolved before they are read"
            ),
        }
    }
}

impl fmt::Debug for ParameterError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for ParameterError {}
impl GetCode for ParameterError {
    #[inline]
    fn get_code(&self) -> i32 {
        4
    }
}

/// An enum representing a resolved probability row or distribution that
/// breaks the sum-to-one invariant. These indicate an authoring bug in the
/// model, so they are never corrected silently.
#[non_exhaustive]
#[derive(Clone, PartialEq)]
pub enum InvariantError {
    /// The resolved row does not sum to one within tolerance
    RowSum { row: String, sum: f64 },
    /// The literal and parameter entries of a row already exceed one before
    /// the `$auto` slot is filled
    OverfullRow { row: String, sum: f64 },
    /// A parameter referenced by a code is not a probability
    OutOfRange { name: String, value: f64 },
    /// A distribution to sample from has no category with nonzero probability
    EmptyDistribution,
}

impl fmt::Display for InvariantError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvariantError::RowSum { row, sum } => write!(f, "the {row} sum to {sum} rather than 1"),
            InvariantError::OverfullRow { row, sum } => {
                write!(f, "the {row} already sum to {sum} before the $auto slot is filled")
            }
            InvariantError::OutOfRange { name, value } => {
                write!(f, "the parameter '{name}' has value {value}, which is not a probability")
            }
            InvariantError::EmptyDistribution => write!(f, "cannot sample from a distribution with no possible outcome"),
        }
    }
}

impl fmt::Debug for InvariantError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for InvariantError {}
impl GetCode for InvariantError {
    #[inline]
    fn get_code(&self) -> i32 {
        3
    }
}
