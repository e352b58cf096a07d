use crate::{
    backend::{Backend, EngineContractError, Path, StateTable, Statistics},
    data::Sequences,
    generate::{SamplingRng, draw_category, seeded_rng},
    math::ln_prob,
    model::ModelSpec,
    resolver::{EmissionMatrix, TransitionMatrix},
};
use rand::seq::SliceRandom;

/// Sampled paths longer than this are treated as never terminating.
const MAX_PATH_STEPS: usize = 10_000_000;

/// The state numbering of one table instance: a fresh random permutation of
/// the model states.
#[derive(Clone, Debug)]
pub struct StateNumbering {
    names: Vec<String>,
    to_id: Vec<usize>,
}

impl StateNumbering {
    fn shuffled(model: &ModelSpec, rng: &mut SamplingRng) -> Self {
        let mut to_model: Vec<usize> = (0..model.n_states()).collect();
        to_model.shuffle(rng);

        let mut to_id = vec![0; to_model.len()];
        for (id, &index) in to_model.iter().enumerate() {
            to_id[index] = id;
        }
        let names = to_model.iter().map(|&i| model.state_name(i).to_string()).collect();

        Self { names, to_id }
    }

    /// The id of the state with model index `index`.
    #[inline]
    fn id(&self, index: usize) -> usize {
        self.to_id[index]
    }
}

impl StateTable for StateNumbering {
    #[inline]
    fn n_states(&self) -> usize {
        self.names.len()
    }

    #[inline]
    fn state_name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

/// The probability of eventually reaching `stop` from each state, ignoring
/// emissions.
#[derive(Clone, Debug)]
pub struct DenseNoEmission {
    ids:         StateNumbering,
    transitions: TransitionMatrix,
    reach:       Vec<f64>,
    start:       usize,
    stop:        usize,
}

impl DenseNoEmission {
    /// The probability of reaching `stop` from the state with model index
    /// `index`.
    #[inline]
    #[must_use]
    pub fn reach(&self, index: usize) -> f64 {
        self.reach[index]
    }
}

impl StateTable for DenseNoEmission {
    #[inline]
    fn n_states(&self) -> usize {
        self.ids.n_states()
    }

    #[inline]
    fn state_name(&self, id: usize) -> Option<&str> {
        self.ids.state_name(id)
    }
}

/// Scaled forward variables: row `t` holds the forward probabilities of the
/// emitting states at position `t`, normalised to sum to one by `scales[t]`.
#[derive(Clone, Debug)]
pub struct DenseForward {
    alpha:  Vec<f64>,
    scales: Vec<f64>,
    /// Scaled probability of the whole sequence followed by `stop`
    end:    f64,
}

impl DenseForward {
    /// The number of sequence positions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

/// Scaled backward variables, laid out like [`DenseForward`].
#[derive(Clone, Debug)]
pub struct DenseBackward {
    beta: Vec<f64>,
    len:  usize,
}

impl DenseBackward {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.beta.is_empty()
    }
}

/// The Viterbi traceback pointers and the best scoring final state.
#[derive(Clone, Debug)]
pub struct DenseViterbi {
    ids:  StateNumbering,
    back: Vec<usize>,
    len:  usize,
    best: Option<(usize, f64)>,
}

impl DenseViterbi {
    /// The natural log-probability of the most probable path, if any path is
    /// possible.
    #[inline]
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.best.map(|(_, score)| score)
    }
}

impl StateTable for DenseViterbi {
    #[inline]
    fn n_states(&self) -> usize {
        self.ids.n_states()
    }

    #[inline]
    fn state_name(&self, id: usize) -> Option<&str> {
        self.ids.state_name(id)
    }
}

/// A reference dense engine implementing [`Backend`] directly over the
/// resolved tables.
///
/// The no-emission backward table and sampling support any topology. The
/// forward, backward, and Viterbi recursions support single-tape models whose
/// only silent states are `start` and `stop`.
///
/// Every returned table numbers the states with a fresh random permutation, so
/// ids must always be translated through the issuing table.
#[derive(Clone, Debug)]
pub struct DenseBackend {
    model:    ModelSpec,
    emitting: Vec<usize>,
    rng:      SamplingRng,
}

impl DenseBackend {
    /// Creates an engine for `model`, seeding the permutations of its state
    /// numberings with `seed`.
    #[must_use]
    pub fn new(model: &ModelSpec, seed: u64) -> Self {
        let emitting = (0..model.n_states()).filter(|&i| !model.is_silent(i)).collect();
        Self {
            model: model.clone(),
            emitting,
            rng: seeded_rng(seed),
        }
    }

    #[inline]
    fn numbering(&mut self) -> StateNumbering {
        StateNumbering::shuffled(&self.model, &mut self.rng)
    }

    /// Validates that the recursions can run, returning the single tape.
    fn recursion_input<'a>(&self, sequences: &'a Sequences) -> Result<&'a [usize], EngineContractError> {
        if self.model.n_tapes() != 1 {
            return Err(EngineContractError::UnsupportedModel {
                reason: "two-tape models in the forward, backward, and Viterbi recursions",
            });
        }
        if self.emitting.len() + 2 != self.model.n_states() {
            return Err(EngineContractError::UnsupportedModel {
                reason: "silent states other than start and stop in the forward, backward, and Viterbi recursions",
            });
        }
        if sequences.n_tapes() != 1 {
            return Err(EngineContractError::LengthMismatch {
                what:     "set of emission tapes",
                expected: 1,
                found:    sequences.n_tapes(),
            });
        }

        let x = sequences.tape(0);
        if x.is_empty() {
            return Err(EngineContractError::EmptySequence);
        }
        let n_symbols = self.model.alphabet().len();
        if let Some((position, &symbol)) = x.iter().enumerate().find(|&(_, &s)| s >= n_symbols) {
            return Err(EngineContractError::SymbolOutOfRange {
                symbol,
                position,
                n_symbols,
            });
        }
        Ok(x)
    }
}

impl Backend for DenseBackend {
    type NoEmissionTable = DenseNoEmission;
    type ForwardTable = DenseForward;
    type BackwardTable = DenseBackward;
    type ViterbiTable = DenseViterbi;

    fn no_emission_backward(&mut self, transitions: &TransitionMatrix) -> Result<DenseNoEmission, EngineContractError> {
        let start = self.model.start();
        let stop = self.model.stop();

        let reach = reach_probabilities(transitions, stop)?;

        if reach[start] <= 0.0 {
            return Err(EngineContractError::UnterminatedPath);
        }

        Ok(DenseNoEmission {
            ids: self.numbering(),
            transitions: transitions.clone(),
            reach,
            start,
            stop,
        })
    }

    fn sample_no_emission(&mut self, table: &DenseNoEmission, rng: &mut SamplingRng) -> Result<Path, EngineContractError> {
        let mut weights = vec![0.0; table.reach.len()];
        let mut current = table.start;
        let mut path = Vec::new();

        for _ in 0..MAX_PATH_STEPS {
            // Successors are weighted by their chance of still reaching stop
            for (j, w) in weights.iter_mut().enumerate() {
                *w = table.transitions[(current, j)] * table.reach[j];
            }
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return Err(EngineContractError::UnterminatedPath);
            }
            weights.iter_mut().for_each(|w| *w /= total);

            current = draw_category(&weights, rng).map_err(|_| EngineContractError::UnterminatedPath)?;
            path.push(table.ids.id(current));
            if current == table.stop {
                return Ok(Path(path));
            }
        }

        Err(EngineContractError::UnterminatedPath)
    }

    fn forward(
        &mut self, emissions: &EmissionMatrix, transitions: &TransitionMatrix, sequences: &Sequences,
    ) -> Result<(f64, DenseForward), EngineContractError> {
        let x = self.recursion_input(sequences)?;
        let m = self.emitting.len();
        let start = self.model.start();
        let stop = self.model.stop();

        let mut alpha = vec![0.0; x.len() * m];
        let mut scales = Vec::with_capacity(x.len());

        for (t, &symbol) in x.iter().enumerate() {
            for (k, &j) in self.emitting.iter().enumerate() {
                let into = if t == 0 {
                    transitions[(start, j)]
                } else {
                    let prev = &alpha[(t - 1) * m..t * m];
                    self.emitting.iter().zip(prev).map(|(&i, a)| a * transitions[(i, j)]).sum::<f64>()
                };
                alpha[t * m + k] = into * emissions.symbol_probability(j, 0, symbol);
            }

            let column = &mut alpha[t * m..(t + 1) * m];
            let scale: f64 = column.iter().sum();
            if scale <= 0.0 {
                return Err(EngineContractError::ZeroLikelihood);
            }
            column.iter_mut().for_each(|a| *a /= scale);
            scales.push(scale);
        }

        let last = &alpha[(x.len() - 1) * m..];
        let end: f64 = self.emitting.iter().zip(last).map(|(&i, a)| a * transitions[(i, stop)]).sum();
        if end <= 0.0 {
            return Err(EngineContractError::ZeroLikelihood);
        }

        let log_likelihood = scales.iter().map(|c| c.ln()).sum::<f64>() + end.ln();
        Ok((log_likelihood, DenseForward { alpha, scales, end }))
    }

    fn backward_with_statistics(
        &mut self, forward: &DenseForward, emissions: &EmissionMatrix, transitions: &TransitionMatrix,
        sequences: &Sequences,
    ) -> Result<(Statistics, DenseBackward), EngineContractError> {
        let x = self.recursion_input(sequences)?;
        if forward.len() != x.len() {
            return Err(EngineContractError::LengthMismatch {
                what:     "forward table",
                expected: x.len(),
                found:    forward.len(),
            });
        }

        let m = self.emitting.len();
        let len = x.len();
        let start = self.model.start();
        let stop = self.model.stop();
        let alpha = &forward.alpha;
        let scales = &forward.scales;

        let mut beta = vec![0.0; len * m];
        for (k, &i) in self.emitting.iter().enumerate() {
            beta[(len - 1) * m + k] = transitions[(i, stop)];
        }
        for t in (0..len - 1).rev() {
            for (k, &i) in self.emitting.iter().enumerate() {
                let mut sum = 0.0;
                for (l, &j) in self.emitting.iter().enumerate() {
                    sum += transitions[(i, j)] * emissions.symbol_probability(j, 0, x[t + 1]) * beta[(t + 1) * m + l];
                }
                beta[t * m + k] = sum / scales[t + 1];
            }
        }

        let z = forward.end;
        let mut stats = Statistics {
            transitions: TransitionMatrix::zeros(self.model.n_states()),
            emissions:   EmissionMatrix::zeros(self.model.emission_codes(), self.model.alphabet().len()),
        };

        for (t, &symbol) in x.iter().enumerate() {
            for (k, &i) in self.emitting.iter().enumerate() {
                let gamma = alpha[t * m + k] * beta[t * m + k] / z;
                for row in self.model.emission_rows_for(i) {
                    stats.emissions[(row, symbol)] += gamma;
                }

                if t == 0 {
                    stats.transitions[(start, i)] += gamma;
                }
                if t + 1 == len {
                    stats.transitions[(i, stop)] += gamma;
                } else {
                    let next = x[t + 1];
                    for (l, &j) in self.emitting.iter().enumerate() {
                        stats.transitions[(i, j)] += alpha[t * m + k]
                            * transitions[(i, j)]
                            * emissions.symbol_probability(j, 0, next)
                            * beta[(t + 1) * m + l]
                            / (scales[t + 1] * z);
                    }
                }
            }
        }

        Ok((stats, DenseBackward { beta, len }))
    }

    fn viterbi_recurse(
        &mut self, emissions: &EmissionMatrix, transitions: &TransitionMatrix, sequences: &Sequences,
    ) -> Result<DenseViterbi, EngineContractError> {
        let x = self.recursion_input(sequences)?;
        let m = self.emitting.len();
        let start = self.model.start();
        let stop = self.model.stop();

        let mut scores: Vec<f64> = self
            .emitting
            .iter()
            .map(|&j| ln_prob(transitions[(start, j)]) + ln_prob(emissions.symbol_probability(j, 0, x[0])))
            .collect();
        let mut back = vec![0; x.len() * m];
        let mut next = vec![f64::NEG_INFINITY; m];

        for (t, &symbol) in x.iter().enumerate().skip(1) {
            for (k, &j) in self.emitting.iter().enumerate() {
                let (from, best) = best_predecessor(&self.emitting, &scores, |i| ln_prob(transitions[(i, j)]));
                back[t * m + k] = from;
                next[k] = best + ln_prob(emissions.symbol_probability(j, 0, symbol));
            }
            std::mem::swap(&mut scores, &mut next);
        }

        let (last, score) = best_predecessor(&self.emitting, &scores, |i| ln_prob(transitions[(i, stop)]));
        let best = (score > f64::NEG_INFINITY).then_some((last, score));

        Ok(DenseViterbi {
            ids: self.numbering(),
            back,
            len: x.len(),
            best,
        })
    }

    fn viterbi_trace(&mut self, table: &DenseViterbi) -> Result<Path, EngineContractError> {
        let (mut k, _) = table.best.ok_or(EngineContractError::NoPathFound)?;
        let m = self.emitting.len();

        let mut states = Vec::with_capacity(table.len + 1);
        for t in (0..table.len).rev() {
            states.push(self.emitting[k]);
            if t > 0 {
                k = table.back[t * m + k];
            }
        }
        states.reverse();
        states.push(self.model.stop());

        Ok(Path(states.into_iter().map(|i| table.ids.id(i)).collect()))
    }
}

/// The probability of eventually reaching `stop` from every state.
///
/// States with no path of nonzero transitions to `stop` have probability
/// zero. For the others, `r = T r + t_stop` restricted to those states is
/// solved directly by Gaussian elimination with partial pivoting.
fn reach_probabilities(transitions: &TransitionMatrix, stop: usize) -> Result<Vec<f64>, EngineContractError> {
    let n = transitions.n_states();

    let mut can_stop = vec![false; n];
    can_stop[stop] = true;
    let mut frontier = vec![stop];
    while let Some(j) = frontier.pop() {
        for (i, seen) in can_stop.iter_mut().enumerate() {
            if !*seen && transitions[(i, j)] > 0.0 {
                *seen = true;
                frontier.push(i);
            }
        }
    }

    let live: Vec<usize> = (0..n).filter(|&i| i != stop && can_stop[i]).collect();
    let m = live.len();

    // Augmented rows of (I - T) r = t_stop over the live states
    let mut system: Vec<Vec<f64>> = live
        .iter()
        .enumerate()
        .map(|(a, &i)| {
            let mut row: Vec<f64> = live.iter().map(|&j| -transitions[(i, j)]).collect();
            row[a] += 1.0;
            row.push(transitions[(i, stop)]);
            row
        })
        .collect();

    for col in 0..m {
        let pivot = (col..m)
            .max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
            .unwrap_or(col);
        if system[pivot][col].abs() < f64::EPSILON {
            return Err(EngineContractError::UnterminatedPath);
        }
        system.swap(col, pivot);

        let (done, rest) = system.split_at_mut(col + 1);
        let pivot_row = &done[col];
        for row in rest {
            let factor = row[col] / pivot_row[col];
            for (x, p) in row[col..].iter_mut().zip(&pivot_row[col..]) {
                *x -= factor * p;
            }
        }
    }

    let mut solution = vec![0.0; m];
    for a in (0..m).rev() {
        let known: f64 = (a + 1..m).map(|b| system[a][b] * solution[b]).sum();
        solution[a] = (system[a][m] - known) / system[a][a];
    }

    let mut reach = vec![0.0; n];
    reach[stop] = 1.0;
    for (&i, r) in live.iter().zip(solution) {
        reach[i] = r.clamp(0.0, 1.0);
    }
    Ok(reach)
}

/// Finds the position in `states` maximising its score plus `step`, taking the
/// first on ties.
fn best_predecessor(states: &[usize], scores: &[f64], step: impl Fn(usize) -> f64) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (l, (&i, &score)) in states.iter().zip(scores).enumerate() {
        let candidate = score + step(i);
        if candidate > best.1 {
            best = (l, candidate);
        }
    }
    best
}
