//! Scoring a decoded path against the sampled ground truth.

use crate::{backend::EngineContractError, data::Sequences, model::ModelSpec};
use std::fmt;

/// The outcome of comparing a decoded path with the true path, position by
/// position and by state name.
///
/// Both paths list the states entered after `start`, ending with `stop`, and
/// must have exactly the same length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccuracyReport {
    emitted: Vec<String>,
    decoded: String,
    truth:   String,
    matches: usize,
    total:   usize,
}

impl AccuracyReport {
    /// Compares the `decoded` path with the `truth` path, both as state names,
    /// and renders the emitted `sequences` with the symbols of `model`.
    ///
    /// ## Errors
    ///
    /// Fails if the paths differ in length, the decoded path is empty, or a
    /// path names a state that is not in `model`.
    pub fn compare(
        model: &ModelSpec, decoded: &[String], truth: &[String], sequences: &Sequences,
    ) -> Result<Self, EngineContractError> {
        if decoded.is_empty() {
            return Err(EngineContractError::EmptySequence);
        }
        if decoded.len() != truth.len() {
            return Err(EngineContractError::LengthMismatch {
                what:     "true path",
                expected: decoded.len(),
                found:    truth.len(),
            });
        }

        let matches = decoded.iter().zip(truth).filter(|(d, t)| d == t).count();

        Ok(Self {
            emitted: sequences.render(model.alphabet()),
            decoded: labels(model, decoded)?,
            truth: labels(model, truth)?,
            matches,
            total: decoded.len(),
        })
    }

    /// The fraction of positions where the decoded state equals the true
    /// state.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        self.matches as f64 / self.total as f64
    }

    #[inline]
    #[must_use]
    pub fn matches(&self) -> usize {
        self.matches
    }

    /// The length of the decoded path.
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// The rendered emission sequence of each tape.
    #[inline]
    #[must_use]
    pub fn emitted(&self) -> &[String] {
        &self.emitted
    }

    #[inline]
    #[must_use]
    pub fn decoded_labels(&self) -> &str {
        &self.decoded
    }

    #[inline]
    #[must_use]
    pub fn true_labels(&self) -> &str {
        &self.truth
    }
}

/// One character per emitting state on `path`: the first character of its
/// name. Silent states are skipped.
fn labels(model: &ModelSpec, path: &[String]) -> Result<String, EngineContractError> {
    let mut out = String::with_capacity(path.len());
    for name in path {
        let index = model
            .state_index(name)
            .ok_or_else(|| EngineContractError::UnknownState { name: name.clone() })?;
        if !model.is_silent(index) {
            out.extend(name.chars().next());
        }
    }
    Ok(out)
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, tape) in self.emitted.iter().enumerate() {
            let heading = if i == 0 { "emitted sequence" } else { "" };
            writeln!(f, "{heading:<16} {tape}")?;
        }
        writeln!(f, "{:<16} {}", "vtb path", self.decoded)?;
        writeln!(f, "{:<16} {}", "true path", self.truth)?;
        write!(
            f,
            "{:<16} {:.4} ({}/{})",
            "accuracy",
            self.accuracy(),
            self.matches,
            self.total
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::test::CASINO;

    fn names(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn accuracy_counts_positions() {
        let model = ModelSpec::parse(CASINO).unwrap();
        let seqs = Sequences::from_tapes(vec![vec![5, 5, 0]]);
        let decoded = names(&["dishonest", "dishonest", "dishonest", "stop"]);
        let truth = names(&["dishonest", "dishonest", "honest", "stop"]);

        let report = AccuracyReport::compare(&model, &decoded, &truth, &seqs).unwrap();
        assert_eq!(report.matches(), 3);
        assert_eq!(report.total(), 4);
        assert_eq!(report.accuracy(), 0.75);
        assert_eq!(report.decoded_labels(), "ddd");
        assert_eq!(report.true_labels(), "ddh");
        assert_eq!(report.emitted(), &["661".to_string()]);

        assert_eq!(
            report.to_string(),
            "emitted sequence 661\nvtb path         ddd\ntrue path        ddh\naccuracy         0.7500 (3/4)"
        );
    }

    #[test]
    fn paths_must_align() {
        let model = ModelSpec::parse(CASINO).unwrap();
        let seqs = Sequences::from_tapes(vec![vec![5]]);
        let decoded = names(&["honest", "stop"]);
        let truth = names(&["honest", "honest", "stop"]);

        assert_eq!(
            AccuracyReport::compare(&model, &decoded, &truth, &seqs),
            Err(EngineContractError::LengthMismatch {
                what:     "true path",
                expected: 2,
                found:    3,
            })
        );
        assert_eq!(
            AccuracyReport::compare(&model, &[], &[], &seqs),
            Err(EngineContractError::EmptySequence)
        );

        let truth = names(&["cheating", "stop"]);
        assert!(matches!(
            AccuracyReport::compare(&model, &decoded, &truth, &seqs),
            Err(EngineContractError::UnknownState { .. })
        ));
    }
}
