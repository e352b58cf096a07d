use crate::{
    backend::EngineContractError,
    model::SpecError,
    resolver::{InvariantError, ParameterError},
};
use std::{error::Error, fmt};

/// Trait for specifying getting exit codes from errors.
pub trait GetCode {
    fn get_code(&self) -> i32 {
        1
    }
}

impl GetCode for std::io::Error {
    #[must_use]
    #[inline]
    fn get_code(&self) -> i32 {
        self.raw_os_error().unwrap_or(1)
    }
}

/// Trait for providing more graceful [`expect()`](std::result::Result::expect)
/// behavior but with a status code provided by [`GetCode`].
///
/// Every error in this crate is fatal to a training run, so binaries are
/// expected to finish with one of these rather than attempt recovery.
pub trait OrFail<T> {
    fn unwrap_or_fail(self) -> T;
    fn unwrap_or_die(self, msg: &str) -> T;
}

impl<T, E> OrFail<T> for Result<T, E>
where
    E: GetCode + fmt::Display,
{
    fn unwrap_or_fail(self) -> T {
        match self {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(e.get_code());
            }
        }
    }

    fn unwrap_or_die(self, msg: &str) -> T {
        match self {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Error: {msg}\n\n{e}");
                std::process::exit(e.get_code());
            }
        }
    }
}

/// The crate-wide error type, wrapping each failure kind raised while loading,
/// resolving, and training a model.
#[non_exhaustive]
pub enum HmmError {
    /// The model specification was malformed or inconsistent
    Spec(SpecError),
    /// A resolved probability row violated the sum-to-one invariant
    Invariant(InvariantError),
    /// A parameter was misused
    Parameter(ParameterError),
    /// The backend engine broke its contract with the driver
    Engine(EngineContractError),
    /// The model file could not be read
    Io(std::io::Error),
    /// A lifecycle phase was invoked before the phase it depends on
    OutOfOrder {
        phase:    &'static str,
        requires: &'static str,
    },
}

impl fmt::Display for HmmError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HmmError::Spec(e) => write!(f, "Malformed model specification: {e}"),
            HmmError::Invariant(e) => write!(f, "Probability invariant violated: {e}"),
            HmmError::Parameter(e) => write!(f, "Parameter error: {e}"),
            HmmError::Engine(e) => write!(f, "Engine contract violated: {e}"),
            HmmError::Io(e) => write!(f, "I/O error: {e}"),
            HmmError::OutOfOrder { phase, requires } => {
                write!(f, "The {phase} phase cannot run before the {requires} phase has completed!")
            }
        }
    }
}

impl fmt::Debug for HmmError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for HmmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HmmError::Spec(e) => Some(e),
            HmmError::Invariant(e) => Some(e),
            HmmError::Parameter(e) => Some(e),
            HmmError::Engine(e) => Some(e),
            HmmError::Io(e) => Some(e),
            HmmError::OutOfOrder { .. } => None,
        }
    }
}

impl GetCode for HmmError {
    #[inline]
    fn get_code(&self) -> i32 {
        match self {
            HmmError::Io(e) => e.get_code(),
            HmmError::Spec(_) => 2,
            HmmError::Invariant(_) => 3,
            HmmError::Parameter(_) => 4,
            HmmError::Engine(_) => 5,
            HmmError::OutOfOrder { .. } => 6,
        }
    }
}

impl From<SpecError> for HmmError {
    #[inline]
    fn from(e: SpecError) -> Self {
        HmmError::Spec(e)
    }
}

impl From<InvariantError> for HmmError {
    #[inline]
    fn from(e: InvariantError) -> Self {
        HmmError::Invariant(e)
    }
}

impl From<ParameterError> for HmmError {
    #[inline]
    fn from(e: ParameterError) -> Self {
        HmmError::Parameter(e)
    }
}

impl From<EngineContractError> for HmmError {
    #[inline]
    fn from(e: EngineContractError) -> Self {
        HmmError::Engine(e)
    }
}

impl From<std::io::Error> for HmmError {
    #[inline]
    fn from(e: std::io::Error) -> Self {
        HmmError::Io(e)
    }
}
