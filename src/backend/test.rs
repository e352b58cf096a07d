use super::*;
use crate::{
    assert_fp_eq,
    generate::seeded_rng,
    model::test::{CASINO, PAIR},
    resolver::ProbabilityResolver,
};

struct Fixture {
    spec:        ModelSpec,
    transitions: TransitionMatrix,
    emissions:   EmissionMatrix,
}

fn fixture(text: &str) -> Fixture {
    let spec = ModelSpec::parse(text).unwrap();
    let mut resolver = ProbabilityResolver::new(&spec);
    resolver.resolve().unwrap();
    Fixture {
        transitions: resolver.transitions().unwrap().clone(),
        emissions: resolver.emissions().unwrap().clone(),
        spec,
    }
}

fn dice(rolls: &str) -> Sequences {
    let alphabet = crate::data::Alphabet::from_tokens(&["123456"]).unwrap();
    Sequences::from_tapes(vec![alphabet.encode(rolls).unwrap()])
}

/// Every path of emitting states as long as `x`, with its probability of
/// emitting `x` and then stopping.
fn enumerate_paths(f: &Fixture, x: &[usize]) -> Vec<(Vec<usize>, f64)> {
    let emitting: Vec<usize> = (0..f.spec.n_states()).filter(|&i| !f.spec.is_silent(i)).collect();
    let mut paths = vec![(Vec::new(), 1.0)];

    for &symbol in x {
        let mut next = Vec::new();
        for (path, p) in &paths {
            let from = path.last().copied().unwrap_or(f.spec.start());
            for &j in &emitting {
                let mut extended: Vec<usize> = path.clone();
                extended.push(j);
                next.push((extended, p * f.transitions[(from, j)] * f.emissions.symbol_probability(j, 0, symbol)));
            }
        }
        paths = next;
    }

    paths
        .into_iter()
        .map(|(path, p)| {
            let last = *path.last().unwrap();
            (path, p * f.transitions[(last, f.spec.stop())])
        })
        .collect()
}

#[test]
fn state_ids_translate_paths() {
    let f = fixture(CASINO);
    let mut backend = DenseBackend::new(&f.spec, 1);
    let table = backend.no_emission_backward(&f.transitions).unwrap();
    let ids = StateIds::from_table(&table).unwrap();

    let mut names: Vec<&str> = (0..table.n_states()).map(|id| ids.name(id).unwrap()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["dishonest", "honest", "start", "stop"]);

    assert_eq!(ids.name(4), Err(EngineContractError::MissingStateId { id: 4 }));
    assert_eq!(
        ids.translate(&Path(vec![0, 9])),
        Err(EngineContractError::MissingStateId { id: 9 })
    );
}

#[test]
fn tables_number_states_independently() {
    let f = fixture(CASINO);
    let mut backend = DenseBackend::new(&f.spec, 3);

    let numberings: Vec<Vec<String>> = (0..10)
        .map(|_| {
            let table = backend.no_emission_backward(&f.transitions).unwrap();
            let ids = StateIds::from_table(&table).unwrap();
            (0..4).map(|id| ids.name(id).unwrap().to_string()).collect()
        })
        .collect();

    assert!(numberings.iter().any(|n| n != &numberings[0]));
}

#[test]
fn sampled_paths_end_in_stop() {
    let f = fixture(CASINO);
    let mut backend = DenseBackend::new(&f.spec, 5);
    let mut rng = seeded_rng(11);

    for _ in 0..20 {
        let table = backend.no_emission_backward(&f.transitions).unwrap();
        assert_fp_eq!(table.reach(f.spec.start()), 1.0);

        let path = backend.sample_no_emission(&table, &mut rng).unwrap();
        let names = StateIds::from_table(&table).unwrap().translate(&path).unwrap();
        assert_eq!(names.last().map(String::as_str), Some("stop"));
        assert!(names[..names.len() - 1].iter().all(|n| n == "honest" || n == "dishonest"));
    }
}

#[test]
fn unreachable_stop() {
    let text = CASINO
        .replace("$go_dishonest  $go_stop", "$go_dishonest  x")
        .replace("$auto          $go_stop", "$auto          x");
    let f = fixture(&text);
    let mut backend = DenseBackend::new(&f.spec, 5);
    assert!(matches!(
        backend.no_emission_backward(&f.transitions),
        Err(EngineContractError::UnterminatedPath)
    ));
}

#[test]
fn slowly_stopping_chains_reach_stop() {
    let f = fixture(&CASINO.replace("go_stop 0.01", "go_stop 0.00001"));
    let mut backend = DenseBackend::new(&f.spec, 5);
    let table = backend.no_emission_backward(&f.transitions).unwrap();

    for state in ["start", "honest", "dishonest"] {
        assert_fp_eq!(table.reach(f.spec.state_index(state).unwrap()), 1.0, 1e-9);
    }
}

#[test]
fn trap_states_never_reach_stop() {
    let f = fixture(&CASINO.replace("dishonest  $go_honest  $auto          $go_stop", "dishonest  x  $auto  x"));
    let mut backend = DenseBackend::new(&f.spec, 5);
    let table = backend.no_emission_backward(&f.transitions).unwrap();

    let honest = f.spec.state_index("honest").unwrap();
    let dishonest = f.spec.state_index("dishonest").unwrap();
    assert_fp_eq!(table.reach(f.spec.stop()), 1.0);
    assert_fp_eq!(table.reach(dishonest), 0.0);
    assert_fp_eq!(table.reach(honest), 1.0 / 6.0, 1e-12);
    assert_fp_eq!(table.reach(f.spec.start()), 1.0 / 12.0, 1e-12);

    let mut rng = seeded_rng(3);
    let ids = StateIds::from_table(&table).unwrap();
    for _ in 0..10 {
        let path = backend.sample_no_emission(&table, &mut rng).unwrap();
        let names = ids.translate(&path).unwrap();
        assert!(!names.iter().any(|n| n == "dishonest"));
    }
}

#[test]
fn symbols_outside_the_alphabet() {
    let f = fixture(CASINO);
    let mut backend = DenseBackend::new(&f.spec, 5);
    let x = Sequences::from_tapes(vec![vec![0, 9]]);

    assert!(matches!(
        backend.forward(&f.emissions, &f.transitions, &x),
        Err(EngineContractError::SymbolOutOfRange {
            symbol:    9,
            position:  1,
            n_symbols: 6,
        })
    ));
    assert!(matches!(
        backend.viterbi_recurse(&f.emissions, &f.transitions, &x),
        Err(EngineContractError::SymbolOutOfRange { symbol: 9, .. })
    ));
}

#[test]
fn forward_matches_enumeration() {
    let f = fixture(CASINO);
    let x = dice("6616236");
    let mut backend = DenseBackend::new(&f.spec, 5);

    let (log_likelihood, table) = backend.forward(&f.emissions, &f.transitions, &x).unwrap();
    assert_eq!(table.len(), 7);

    let total: f64 = enumerate_paths(&f, x.tape(0)).iter().map(|(_, p)| p).sum();
    assert_fp_eq!(log_likelihood, total.ln(), 1e-10);
}

#[test]
fn viterbi_matches_enumeration() {
    let f = fixture(CASINO);
    let x = dice("6666612345");
    let mut backend = DenseBackend::new(&f.spec, 5);

    let table = backend.viterbi_recurse(&f.emissions, &f.transitions, &x).unwrap();
    let path = backend.viterbi_trace(&table).unwrap();
    let names = StateIds::from_table(&table).unwrap().translate(&path).unwrap();
    let score = table.score().unwrap();
    drop(table);

    assert_eq!(names.len(), 11);
    assert_eq!(names[10], "stop");

    let paths = enumerate_paths(&f, x.tape(0));
    let best = paths.iter().map(|(_, p)| *p).fold(0.0, f64::max);
    let decoded: Vec<usize> = names[..10].iter().map(|n| f.spec.state_index(n).unwrap()).collect();
    let (_, p) = paths.iter().find(|(path, _)| *path == decoded).unwrap();

    assert_fp_eq!(*p, best, 1e-9);
    assert_fp_eq!(score, best.ln(), 1e-9);
}

#[test]
fn statistics_are_consistent() {
    let f = fixture(CASINO);
    let x = dice("3616662141");
    let mut backend = DenseBackend::new(&f.spec, 5);

    let (_, forward) = backend.forward(&f.emissions, &f.transitions, &x).unwrap();
    let (stats, backward) = backend
        .backward_with_statistics(&forward, &f.emissions, &f.transitions, &x)
        .unwrap();
    assert_eq!(backward.len(), 10);
    stats.check_consistency(&f.spec).unwrap();

    let n = f.spec.n_states();
    let transitions: f64 = (0..n).map(|i| stats.transitions.row(i).iter().sum::<f64>()).sum();
    assert_fp_eq!(transitions, 11.0);
    assert_fp_eq!(stats.transitions.row(f.spec.start()).iter().sum::<f64>(), 1.0);
    assert_fp_eq!(stats.transitions.column_sum(f.spec.stop()), 1.0);

    let emitted: f64 = stats.emissions.rows().iter().map(|r| r.total()).sum();
    assert_fp_eq!(emitted, 10.0);
    // Only symbols that occur in the sequence are counted
    assert_eq!(stats.emissions[(0, 4)], 0.0);
}

#[test]
fn posterior_counts_match_enumeration() {
    let f = fixture(CASINO);
    let x = dice("66261");
    let mut backend = DenseBackend::new(&f.spec, 5);
    let (_, forward) = backend.forward(&f.emissions, &f.transitions, &x).unwrap();
    let (stats, _) = backend
        .backward_with_statistics(&forward, &f.emissions, &f.transitions, &x)
        .unwrap();

    let paths = enumerate_paths(&f, x.tape(0));
    let total: f64 = paths.iter().map(|(_, p)| p).sum();
    let honest = f.spec.state_index("honest").unwrap();
    let dishonest = f.spec.state_index("dishonest").unwrap();

    let expected: f64 = paths
        .iter()
        .map(|(path, p)| p * path.windows(2).filter(|w| w[0] == honest && w[1] == dishonest).count() as f64)
        .sum::<f64>()
        / total;
    assert_fp_eq!(stats.transitions[(honest, dishonest)], expected, 1e-9);
}

#[test]
fn inconsistent_statistics_are_rejected() {
    let f = fixture(CASINO);
    let mut stats = Statistics {
        transitions: TransitionMatrix::zeros(f.spec.n_states()),
        emissions:   EmissionMatrix::zeros(f.spec.emission_codes(), 6),
    };
    let honest = f.spec.state_index("honest").unwrap();
    stats.transitions[(f.spec.start(), honest)] = 2.0;
    stats.emissions[(0, 3)] = 2.0;
    stats.check_consistency(&f.spec).unwrap();

    // Emission counts keyed to the wrong distribution
    stats.emissions[(0, 3)] = 0.0;
    stats.emissions[(1, 3)] = 2.0;
    assert!(matches!(
        stats.check_consistency(&f.spec),
        Err(EngineContractError::InconsistentStatistics { ref state, .. }) if state == "honest"
    ));
}

#[test]
fn recursion_preconditions() {
    let f = fixture(CASINO);
    let mut backend = DenseBackend::new(&f.spec, 5);
    assert!(matches!(
        backend.forward(&f.emissions, &f.transitions, &Sequences::new(1)),
        Err(EngineContractError::EmptySequence)
    ));

    let (_, short) = backend.forward(&f.emissions, &f.transitions, &dice("12")).unwrap();
    assert!(matches!(
        backend.backward_with_statistics(&short, &f.emissions, &f.transitions, &dice("123")),
        Err(EngineContractError::LengthMismatch { expected: 3, found: 2, .. })
    ));

    let pair = fixture(PAIR);
    let mut backend = DenseBackend::new(&pair.spec, 5);
    let x = Sequences::from_tapes(vec![vec![0, 1], vec![1]]);
    assert!(matches!(
        backend.viterbi_recurse(&pair.emissions, &pair.transitions, &x),
        Err(EngineContractError::UnsupportedModel { .. })
    ));
    // Sampling supports any topology
    let table = backend.no_emission_backward(&pair.transitions).unwrap();
    assert!(backend.sample_no_emission(&table, &mut seeded_rng(1)).is_ok());
}

#[test]
fn impossible_sequences() {
    let text = CASINO.replace("1    2    3    4    5    6\nhonest  0.2  0.2  0.2  0.2  0.1  $auto", "1    2    3    4    5    6\nhonest  0.2  0.2  0.2  0.2  0.2  x");
    let text = text.replace("dishonest  0.1  0.1  0.1  0.1  0.1  $auto", "dishonest  0.2  0.2  0.2  0.2  0.2  x");
    let f = fixture(&text);
    let mut backend = DenseBackend::new(&f.spec, 5);

    assert!(matches!(
        backend.forward(&f.emissions, &f.transitions, &dice("126")),
        Err(EngineContractError::ZeroLikelihood)
    ));
    let table = backend.viterbi_recurse(&f.emissions, &f.transitions, &dice("126")).unwrap();
    assert_eq!(table.score(), None);
    assert!(matches!(backend.viterbi_trace(&table), Err(EngineContractError::NoPathFound)));
}
