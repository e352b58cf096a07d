#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::wildcard_imports,
    clippy::enum_glob_use
)]

/// The numeric engine boundary and the reference dense engine.
pub mod backend;
/// Symbol alphabets and emission sequences.
pub mod data;
/// The training lifecycle and parameter updaters.
pub mod driver;
/// Error types and exit codes.
pub mod errors;
/// Loading, validating, and writing model specifications.
pub mod model;
/// Accuracy reports for decoded paths.
pub mod report;
/// Resolving probability codes into numeric tables.
pub mod resolver;

/// Seeded random draws.
pub mod generate;
/// Mathematical utilities and tolerances.
pub mod math;

/// Common structures and traits re-exported
pub mod prelude {
    pub use crate::backend::{Backend, DenseBackend, StateIds, Statistics};
    pub use crate::driver::{BaumWelchUpdater, DriverConfig, ParameterUpdater, TrainingDriver};
    pub use crate::errors::{GetCode, HmmError, OrFail};
    pub use crate::model::ModelSpec;
    pub use crate::report::AccuracyReport;
    pub use crate::resolver::ProbabilityResolver;
}
