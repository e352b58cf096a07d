//! The training lifecycle: sample a ground-truth trajectory from the model,
//! re-estimate the free parameters from its emissions by expectation
//! maximisation, decode the emissions with Viterbi and score the decoded path
//! against the truth.
//!
//! [`TrainingDriver`] runs the phases in order, `Init → Sample → Estimate ×N →
//! Decode → Report`. Each engine table is owned by the phase (or estimation
//! iteration) that asked for it and is dropped before the next one starts.

use crate::{
    backend::{Backend, EngineContractError, StateIds, Statistics},
    data::Sequences,
    errors::HmmError,
    generate::{SamplingRng, draw_category, seeded_rng},
    model::{ModelSpec, SpecError},
    report::AccuracyReport,
    resolver::ProbabilityResolver,
};
use std::path::Path;

mod update;


pub use update::*;

/// Run-level settings of a [`TrainingDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// The number of EM iterations of the Estimate phase
    pub iterations:          usize,
    /// The seed of the sampling RNG
    pub seed:                u64,
    /// The number of trajectories drawn before the Sample phase gives up
    pub max_sample_attempts: usize,
}

impl Default for DriverConfig {
    #[inline]
    fn default() -> Self {
        Self {
            iterations:          10,
            seed:                42,
            max_sample_attempts: 10_000,
        }
    }
}

impl DriverConfig {
    #[inline]
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_sample_attempts(mut self, max_sample_attempts: usize) -> Self {
        self.max_sample_attempts = max_sample_attempts;
        self
    }
}

/// A sampled ground truth: the state path, by name, and the symbols emitted
/// along it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampledTrajectory {
    /// The states entered after `start`, ending with `stop`
    pub path:      Vec<String>,
    pub sequences: Sequences,
    /// The number of emitting states on the path
    pub length:    usize,
    /// The number of draws it took to reach the minimum length
    pub attempts:  usize,
}

/// The Viterbi path and the id lookup of the table it was traced through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTrajectory {
    pub path: Vec<String>,
    pub ids:  StateIds,
}

/// The outcome of one EM iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    pub iteration:      usize,
    /// The natural log-likelihood of the sample under the parameters the
    /// iteration started from
    pub log_likelihood: f64,
    /// The parameter values the iteration produced
    pub parameters:     Vec<(String, f64)>,
}

/// Orchestrates a training experiment over a [`Backend`] engine, updating
/// parameters with a [`ParameterUpdater`].
pub struct TrainingDriver<B, U> {
    model:    ModelSpec,
    resolver: ProbabilityResolver,
    backend:  B,
    updater:  U,
    config:   DriverConfig,
    rng:      SamplingRng,
    sample:   Option<SampledTrajectory>,
    decoded:  Option<DecodedTrajectory>,
    history:  Vec<IterationRecord>,
}

impl<B: Backend, U: ParameterUpdater> TrainingDriver<B, U> {
    /// Runs the Init phase: resolves the probability tables of `model` and
    /// checks that every emitting state has an emission distribution.
    ///
    /// ## Errors
    ///
    /// Fails if the initial parameters do not resolve or a state cannot emit.
    pub fn new(model: ModelSpec, backend: B, updater: U, config: DriverConfig) -> Result<Self, HmmError> {
        let mut resolver = ProbabilityResolver::new(&model);
        resolver.resolve()?;
        model.check_emissions()?;

        tracing::info!(
            "Initialised a model with {} states, {} parameters and {} tape(s)",
            model.n_states(),
            model.parameters().len(),
            model.n_tapes()
        );

        Ok(Self {
            model,
            resolver,
            backend,
            updater,
            rng: seeded_rng(config.seed),
            config,
            sample: None,
            decoded: None,
            history: Vec::new(),
        })
    }

    /// Loads the model file at `path` and runs the Init phase, building the
    /// engine from the parsed model with `make_backend`.
    ///
    /// ## Errors
    ///
    /// Fails if the file cannot be read or parsed, or on any error of
    /// [`TrainingDriver::new`].
    pub fn from_file(
        path: impl AsRef<Path>, make_backend: impl FnOnce(&ModelSpec) -> B, updater: U, config: DriverConfig,
    ) -> Result<Self, HmmError> {
        let model = ModelSpec::from_file(path)?;
        let backend = make_backend(&model);
        Self::new(model, backend, updater, config)
    }

    /// Runs the Sample phase: draws start to stop paths from the no-emission
    /// reduction of the model until one holds at least `1 / P(stop)` emitting
    /// states, then emits a symbol from each distribution of each emitting
    /// state on it. Any previous sample, decode and history are discarded.
    ///
    /// ## Errors
    ///
    /// Fails if no emitting state can stop, the engine breaks its contract,
    /// or every one of [`DriverConfig::max_sample_attempts`] draws is too
    /// short.
    pub fn sample(&mut self) -> Result<&SampledTrajectory, HmmError> {
        self.sample = None;
        self.decoded = None;
        self.history.clear();

        let transitions = self.resolver.transitions()?;
        let p_stop = self
            .model
            .stop_probability(transitions)
            .ok_or(SpecError::NoStopTransition)?;
        let min_length = 1.0 / p_stop;

        for attempt in 1..=self.config.max_sample_attempts {
            let (path, emitting) = {
                let table = self.backend.no_emission_backward(transitions)?;
                let path = self.backend.sample_no_emission(&table, &mut self.rng)?;
                let names = StateIds::from_table(&table)?.translate(&path)?;
                let emitting = emitting_states(&self.model, &names)?;
                (names, emitting)
            };

            #[allow(clippy::cast_precision_loss)]
            let too_short = (emitting.len() as f64) < min_length;
            if too_short {
                tracing::debug!(
                    "Rejected sample {}: length {} is below {:.1}",
                    attempt,
                    emitting.len(),
                    min_length
                );
                continue;
            }

            let emissions = self.resolver.emissions()?;
            let n_symbols = self.model.alphabet().len();
            let mut sequences = Sequences::new(self.model.n_tapes());
            for &state in &emitting {
                for r in self.model.emission_rows_for(state) {
                    let row = emissions.row(r);
                    let cell = draw_category(row.cells(), &mut self.rng)?;
                    for (tape, symbol) in row.tapes().symbols(cell, n_symbols) {
                        sequences.push(tape, symbol);
                    }
                }
            }

            tracing::info!("Sampled a trajectory of length {} after {} draw(s)", emitting.len(), attempt);

            return Ok(&*self.sample.insert(SampledTrajectory {
                length: emitting.len(),
                path,
                sequences,
                attempts: attempt,
            }));
        }

        Err(EngineContractError::SamplingExhausted {
            attempts: self.config.max_sample_attempts,
            min_length,
        }
        .into())
    }

    /// Runs the Estimate phase: [`DriverConfig::iterations`] EM iterations,
    /// each computing the sufficient statistics of the sample under the
    /// current parameters and handing them to the updater.
    ///
    /// ## Errors
    ///
    /// Fails with [`HmmError::OutOfOrder`] before [`TrainingDriver::sample`].
    /// Otherwise fails if the engine breaks its contract, the statistics are
    /// inconsistent, or the updated parameters do not resolve.
    pub fn estimate(&mut self) -> Result<&[IterationRecord], HmmError> {
        let Some(sample) = &self.sample else {
            return Err(HmmError::OutOfOrder {
                phase:    "estimate",
                requires: "sample",
            });
        };
        self.decoded = None;

        for iteration in 1..=self.config.iterations {
            let transitions = self.resolver.transitions()?;
            let emissions = self.resolver.emissions()?;

            // The forward and backward tables are released with this block
            let (log_likelihood, statistics) = {
                let (log_likelihood, forward) = self.backend.forward(emissions, transitions, &sample.sequences)?;
                let (statistics, _backward) =
                    self.backend
                        .backward_with_statistics(&forward, emissions, transitions, &sample.sequences)?;
                (log_likelihood, statistics)
            };

            statistics.check_consistency(&self.model)?;
            tracing::info!("Iteration {}: log-likelihood={:.6}", iteration, log_likelihood);
            log_statistics(&self.model, &statistics);

            self.updater.update(&statistics, &self.model, &mut self.resolver)?;
            if self.resolver.is_stale() {
                self.resolver.resolve()?;
            }

            self.history.push(IterationRecord {
                iteration,
                log_likelihood,
                parameters: self.resolver.values()?.to_vec(),
            });
        }

        Ok(self.history.as_slice())
    }

    /// Runs the Decode phase: the Viterbi path of the sampled emissions under
    /// the current parameters.
    ///
    /// ## Errors
    ///
    /// Fails with [`HmmError::OutOfOrder`] before [`TrainingDriver::sample`],
    /// or if the engine finds no path or breaks its contract.
    pub fn decode(&mut self) -> Result<&DecodedTrajectory, HmmError> {
        let Some(sample) = &self.sample else {
            return Err(HmmError::OutOfOrder {
                phase:    "decode",
                requires: "sample",
            });
        };

        let transitions = self.resolver.transitions()?;
        let emissions = self.resolver.emissions()?;

        let (path, ids) = {
            let table = self.backend.viterbi_recurse(emissions, transitions, &sample.sequences)?;
            let path = self.backend.viterbi_trace(&table)?;
            (path, StateIds::from_table(&table)?)
        };
        let path = ids.translate(&path)?;

        tracing::info!("Decoded a path through {} states", path.len());
        Ok(&*self.decoded.insert(DecodedTrajectory { path, ids }))
    }

    /// Runs the Report phase, scoring the decoded path against the sampled
    /// one.
    ///
    /// ## Errors
    ///
    /// Fails with [`HmmError::OutOfOrder`] before [`TrainingDriver::decode`],
    /// or if the two paths do not align.
    pub fn report(&self) -> Result<AccuracyReport, HmmError> {
        let (Some(sample), Some(decoded)) = (&self.sample, &self.decoded) else {
            return Err(HmmError::OutOfOrder {
                phase:    "report",
                requires: "decode",
            });
        };

        let report = AccuracyReport::compare(&self.model, &decoded.path, &sample.path, &sample.sequences)?;
        tracing::info!(
            "Decoding accuracy {:.4} ({}/{})",
            report.accuracy(),
            report.matches(),
            report.total()
        );
        Ok(report)
    }

    /// Runs every phase after Init in order.
    ///
    /// ## Errors
    ///
    /// Returns the first error of any phase.
    pub fn run(&mut self) -> Result<AccuracyReport, HmmError> {
        self.sample()?;
        self.estimate()?;
        self.decode()?;
        self.report()
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &ProbabilityResolver {
        &self.resolver
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The EM iterations run since the last sample.
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    #[inline]
    #[must_use]
    pub fn sampled(&self) -> Option<&SampledTrajectory> {
        self.sample.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn decoded(&self) -> Option<&DecodedTrajectory> {
        self.decoded.as_ref()
    }
}

/// The model indices of the emitting states on a path of state names.
fn emitting_states(model: &ModelSpec, names: &[String]) -> Result<Vec<usize>, EngineContractError> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let index = model
            .state_index(name)
            .ok_or_else(|| EngineContractError::UnknownState { name: name.clone() })?;
        if !model.is_silent(index) {
            out.push(index);
        }
    }
    Ok(out)
}

fn log_statistics(model: &ModelSpec, statistics: &Statistics) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    for from in 0..model.n_states() {
        let counts = statistics.transitions.row(from);
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            tracing::debug!("Expected transitions out of {}: {:?}", model.state_name(from), counts);
        }
    }
    for row in statistics.emissions.rows() {
        tracing::debug!(
            "Expected emissions of {}: {:?}",
            model.state_name(row.state()),
            row.cells()
        );
    }
}
