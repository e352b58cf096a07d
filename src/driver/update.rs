use crate::{
    backend::Statistics,
    errors::HmmError,
    model::{CodeRow, ModelSpec, ProbCode},
    resolver::ProbabilityResolver,
};

/// Computes new values for the free parameters of a model from the sufficient
/// statistics of one forward-backward pass.
///
/// The driver re-resolves the tables after every update, so an updater only
/// has to write parameter values. Any closure with the same signature as
/// [`ParameterUpdater::update`] is an updater.
pub trait ParameterUpdater {
    /// Writes the parameter values for the next iteration into `resolver`.
    ///
    /// ## Errors
    ///
    /// Fails if a parameter is unknown or the new values break a probability
    /// row.
    fn update(
        &mut self, statistics: &Statistics, model: &ModelSpec, resolver: &mut ProbabilityResolver,
    ) -> Result<(), HmmError>;
}

impl<F> ParameterUpdater for F
where
    F: FnMut(&Statistics, &ModelSpec, &mut ProbabilityResolver) -> Result<(), HmmError>,
{
    #[inline]
    fn update(
        &mut self, statistics: &Statistics, model: &ModelSpec, resolver: &mut ProbabilityResolver,
    ) -> Result<(), HmmError> {
        self(statistics, model, resolver)
    }
}

/// The Baum-Welch ratio applied to every declared parameter.
///
/// Literal cells keep their probability, so only the remaining mass of a row,
/// `1 - Σ literals`, is shared out among its `$param` and `$auto` cells in
/// proportion to their expected counts. A parameter `p` becomes
///
/// ```text
/// Σ count(cells coded $p) / Σ (free_count(row) / free_mass(row))
/// ```
///
/// summed over every cell coded `$p`, where `free_count` is the expected
/// count of the `$param` and `$auto` cells of that cell's row. For a
/// parameter coding one transition of a row without literals this is
/// `count(A→B) / Σ_C count(A→C)`. Parameters whose rows were never used, or
/// leave no free mass, keep their value, and all updates are applied in one
/// batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct BaumWelchUpdater;

impl BaumWelchUpdater {
    /// The re-estimated value of the parameter `name`, or `None` when no row
    /// referencing it has any expected count in its free cells.
    #[must_use]
    pub fn estimate(statistics: &Statistics, model: &ModelSpec, name: &str) -> Option<f64> {
        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for (row, cell) in model.references(name) {
            let (codes, counts) = match row {
                CodeRow::Transition(from) => (model.transition_codes().row(from), statistics.transitions.row(from)),
                CodeRow::Emission(r) => (model.emission_codes()[r].codes(), statistics.emissions.row(r).cells()),
            };

            let (free_mass, free_count) = free_share(codes, counts);
            if free_mass <= 0.0 {
                return None;
            }
            numerator += counts[cell];
            denominator += free_count / free_mass;
        }

        (denominator > 0.0).then(|| numerator / denominator)
    }
}

/// The probability mass a row leaves to its `$param` and `$auto` cells, and
/// the expected count of those cells.
fn free_share(codes: &[ProbCode], counts: &[f64]) -> (f64, f64) {
    let mut literal = 0.0;
    let mut free_count = 0.0;
    for (code, count) in codes.iter().zip(counts) {
        match code {
            ProbCode::Literal(value) => literal += value,
            ProbCode::Param(_) | ProbCode::Auto => free_count += count,
            ProbCode::Forbidden => {}
        }
    }
    (1.0 - literal, free_count)
}

impl ParameterUpdater for BaumWelchUpdater {
    fn update(
        &mut self, statistics: &Statistics, model: &ModelSpec, resolver: &mut ProbabilityResolver,
    ) -> Result<(), HmmError> {
        let updates: Vec<(&str, f64)> = model
            .parameters()
            .iter()
            .filter_map(|(name, _)| Self::estimate(statistics, model, name).map(|value| (name.as_str(), value)))
            .collect();

        resolver.set_parameters(updates)
    }
}
