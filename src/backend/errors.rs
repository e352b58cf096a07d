use crate::errors::GetCode;
use std::{error::Error, fmt};

/// An enum representing a broken contract between the training driver and a
/// [`Backend`](super::Backend) engine.
#[non_exhaustive]
#[derive(Clone, PartialEq)]
pub enum EngineContractError {
    /// A path contained an id the issuing table has no state for
    MissingStateId { id: usize },
    /// A name returned by the engine is not a state of the model
    UnknownState { name: String },
    /// Two sequences that must align position by position had different
    /// lengths
    LengthMismatch {
        what:     &'static str,
        expected: usize,
        found:    usize,
    },
    /// The engine cannot run this recursion for this model
    UnsupportedModel { reason: &'static str },
    /// A recursion was asked to run over an empty emission sequence
    EmptySequence,
    /// A symbol of the emission sequence is not in the model's alphabet
    SymbolOutOfRange {
        symbol:    usize,
        position:  usize,
        n_symbols: usize,
    },
    /// The emission sequence is impossible under the current model
    ZeroLikelihood,
    /// Viterbi decoding found no path with nonzero probability
    NoPathFound,
    /// No path from `start` can reach `stop`, or a sampled path never did
    UnterminatedPath,
    /// Expected emission counts disagree with expected visits to the state
    InconsistentStatistics {
        state:   String,
        emitted: f64,
        visits:  f64,
    },
    /// Every sampled trajectory was shorter than the minimum length
    SamplingExhausted { attempts: usize, min_length: f64 },
}

impl fmt::Display for EngineContractError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineContractError::MissingStateId { id } => write!(f, "the engine table has no state with id {id}"),
            EngineContractError::UnknownState { name } => write!(f, "the engine returned the unknown state '{name}'"),
            EngineContractError::LengthMismatch { what, expected, found } => {
                write!(f, "the {what} has length {found} but {expected} was required")
            }
            EngineContractError::UnsupportedModel { reason } => write!(f, "the engine does not support {reason}"),
            EngineContractError::EmptySequence => write!(f, "the emission sequence is empty"),
            EngineContractError::SymbolOutOfRange {
                symbol,
                position,
                n_symbols,
            } => write!(
                f,
                "the symbol {symbol} at position {position} is outside the alphabet of {n_symbols} symbols"
            ),
            EngineContractError::ZeroLikelihood => {
                write!(f, "the emission sequence has probability zero under the current model")
            }
            EngineContractError::NoPathFound => write!(f, "no state path with nonzero probability explains the sequence"),
            EngineContractError::UnterminatedPath => write!(f, "no sampled path can reach the stop state"),
            EngineContractError::InconsistentStatistics { state, emitted, visits } => write!(
                f,
                "the expected emission count of '{state}' is {emitted} but it is expected to be visited {visits} times"
            ),
            EngineContractError::SamplingExhausted { attempts, min_length } => write!(
                f,
                "none of {attempts} sampled trajectories reached the minimum length of {min_length}"
            ),
        }
    }
}

impl fmt::Debug for EngineContractError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for EngineContractError {}
impl GetCode for EngineContractError {
    #[inline]
    fn get_code(&self) -> i32 {
        5
    }
}
