use super::*;

pub(crate) const CASINO: &str = "\
# occasionally dishonest casino
^alphabet 123456
^states honest dishonest
^silent_states start stop
^parameter go_dishonest 0.05
^parameter go_honest 0.1
^parameter go_stop 0.01
^transition_config
           honest      dishonest      stop
start      0.5         $auto          x
honest     $auto       $go_dishonest  $go_stop
dishonest  $go_honest  $auto          $go_stop
^emission_config honest
        1    2    3    4    5    6
honest  0.2  0.2  0.2  0.2  0.1  $auto
^emission_config dishonest
           1    2    3    4    5    6
dishonest  0.1  0.1  0.1  0.1  0.1  $auto
";

pub(crate) const PAIR: &str = "\
^alphabet AC
^tapes x y
^states match ins del
^silent_states start stop
^parameter gap 0.1
^transition_config
       match  ins   del   stop
start  $auto  0.1   0.1   x
match  $auto  $gap  $gap  0.05
ins    $auto  0.2   x     0.05
del    $auto  x     0.2   0.05
^emission_config match
   A     C
A  0.4   $auto
C  0.05  0.4
^emission_config ins x
     A    C
ins  0.5  $auto
^emission_config del y
     A    C
del  0.5  $auto
";

fn replace_line(text: &str, from: &str, to: &str) -> String {
    assert!(text.contains(from));
    text.replacen(from, to, 1)
}

#[test]
fn parse_casino() {
    let spec = ModelSpec::parse(CASINO).unwrap();

    assert_eq!(spec.alphabet().len(), 6);
    assert_eq!(spec.tapes(), &["seq".to_string()]);
    assert_eq!(spec.n_states(), 4);
    assert_eq!(spec.state_index("dishonest"), Some(1));
    assert_eq!(spec.start(), 2);
    assert_eq!(spec.stop(), 3);
    assert!(spec.is_silent(spec.stop()));
    assert_eq!(spec.parameters().len(), 3);

    let honest = spec.state_index("honest").unwrap();
    let dishonest = spec.state_index("dishonest").unwrap();
    let codes = spec.transition_codes();
    assert_eq!(codes[(honest, honest)], ProbCode::Auto);
    assert_eq!(codes[(honest, dishonest)], ProbCode::Param("go_dishonest".to_string()));
    assert_eq!(codes[(spec.start(), honest)], ProbCode::Literal(0.5));
    assert_eq!(codes[(spec.start(), spec.stop())], ProbCode::Forbidden);
    assert_eq!(codes[(honest, spec.start())], ProbCode::Forbidden);
    assert!(!codes.has_row(spec.stop()));

    let rows: Vec<usize> = spec.emission_rows_for(dishonest).collect();
    assert_eq!(rows, vec![1]);
    let emission = &spec.emission_codes()[1];
    assert_eq!(emission.tapes(), TapeSet::Single(0));
    assert_eq!(emission.codes()[0], ProbCode::Literal(0.1));
    assert_eq!(emission.codes()[5], ProbCode::Auto);

    let references: Vec<(CodeRow, usize)> = spec.references("go_stop").collect();
    assert_eq!(
        references,
        vec![(CodeRow::Transition(honest), spec.stop()), (CodeRow::Transition(dishonest), spec.stop())]
    );
    assert!(spec.check_emissions().is_ok());
}

#[test]
fn parse_pair_model() {
    let spec = ModelSpec::parse(PAIR).unwrap();
    assert_eq!(spec.n_tapes(), 2);

    let joint = &spec.emission_codes()[0];
    assert_eq!(joint.tapes(), TapeSet::Joint);
    assert_eq!(joint.codes().len(), 4);
    assert_eq!(joint.codes()[1], ProbCode::Auto);
    assert_eq!(joint.codes()[2], ProbCode::Literal(0.05));

    assert_eq!(spec.emission_codes()[1].tapes(), TapeSet::Single(0));
    assert_eq!(spec.emission_codes()[2].tapes(), TapeSet::Single(1));
}

#[test]
fn emission_header_order_is_mapped_to_alphabet() {
    let text = replace_line(
        CASINO,
        "        1    2    3    4    5    6\nhonest  0.2  0.2  0.2  0.2  0.1  $auto",
        "        6      1\nhonest  $auto  0.5",
    );
    let spec = ModelSpec::parse(&text).unwrap();
    let codes = spec.emission_codes()[0].codes();
    assert_eq!(codes[0], ProbCode::Literal(0.5));
    assert_eq!(codes[1], ProbCode::Forbidden);
    assert_eq!(codes[5], ProbCode::Auto);
}

#[test]
fn display_round_trips() {
    for text in [CASINO, PAIR] {
        let spec = ModelSpec::parse(text).unwrap();
        let written = spec.to_string();
        assert_eq!(ModelSpec::parse(&written).unwrap(), spec, "{written}");
    }
}

#[test]
fn unknown_directive() {
    let text = format!("^colour blue\n{CASINO}");
    assert_eq!(
        ModelSpec::parse(&text),
        Err(SpecError::UnknownDirective {
            line:      1,
            directive: "colour".to_string(),
        })
    );
}

#[test]
fn undeclared_state_in_table() {
    let text = replace_line(CASINO, "dishonest  $go_honest", "cheating  $go_honest");
    assert!(matches!(
        ModelSpec::parse(&text),
        Err(SpecError::UndeclaredState { name, .. }) if name == "cheating"
    ));

    let text = replace_line(CASINO, "^emission_config honest", "^emission_config fair");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::UndeclaredState { .. })));
}

#[test]
fn emission_label_mismatch() {
    let text = replace_line(CASINO, "dishonest  0.1  0.1", "honest  0.1  0.1");
    assert_eq!(
        ModelSpec::parse(&text),
        Err(SpecError::LabelMismatch {
            line:     18,
            expected: "dishonest".to_string(),
            found:    "honest".to_string(),
        })
    );

    let text = replace_line(PAIR, "C  0.05  0.4", "G  0.05  0.4");
    assert!(matches!(
        ModelSpec::parse(&text),
        Err(SpecError::LabelMismatch { expected, .. }) if expected == "C"
    ));
}

#[test]
fn failed_reload_keeps_loaded_model() {
    let mut spec = ModelSpec::parse(CASINO).unwrap();
    let before = spec.clone();

    let bad = replace_line(CASINO, "dishonest  0.1  0.1", "honest  0.1  0.1");
    match ModelSpec::parse(&bad) {
        Ok(reloaded) => spec = reloaded,
        Err(e) => assert!(matches!(e, SpecError::LabelMismatch { .. })),
    }

    assert_eq!(spec, before);
}

#[test]
fn directive_after_table() {
    let text = format!("{CASINO}^parameter late 0.5\n");
    assert!(matches!(
        ModelSpec::parse(&text),
        Err(SpecError::DirectiveAfterTable { directive, .. }) if directive == "parameter"
    ));
}

#[test]
fn malformed_rows() {
    let text = replace_line(CASINO, "honest     $auto       $go_dishonest  $go_stop", "honest $auto $auto 0.1");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::MultipleAuto { .. })));

    let text = replace_line(CASINO, "honest     $auto       $go_dishonest  $go_stop", "honest $auto 0.1");
    assert!(matches!(
        ModelSpec::parse(&text),
        Err(SpecError::RowLength {
            expected: 3,
            found:    2,
            ..
        })
    ));

    let text = replace_line(CASINO, "$go_dishonest  $go_stop", "$go_cheat  $go_stop");
    assert!(matches!(
        ModelSpec::parse(&text),
        Err(SpecError::UnknownParameter { name, .. }) if name == "go_cheat"
    ));

    let text = replace_line(CASINO, "start      0.5", "start      1.5");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::InvalidCode { .. })));

    let text = replace_line(CASINO, "           honest      dishonest      stop", "   honest dishonest start");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::InvalidTransition { .. })));

    let text = format!("{CASINO}^transition_config\nhonest\nhonest 1\n");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::DuplicateRow { .. })));
}

#[test]
fn missing_declarations() {
    let text = replace_line(CASINO, "^silent_states start stop", "^silent_states start");
    assert_eq!(ModelSpec::parse(&text), Err(SpecError::MissingSilentState { name: STOP }));

    let text = replace_line(CASINO, "^alphabet 123456\n", "");
    assert_eq!(ModelSpec::parse(&text), Err(SpecError::MissingDirective { directive: "alphabet" }));

    let text = replace_line(CASINO, "dishonest  $go_honest  $auto          $go_stop\n", "");
    assert_eq!(
        ModelSpec::parse(&text),
        Err(SpecError::MissingTransitionRow {
            state: "dishonest".to_string(),
        })
    );

    let text = replace_line(CASINO, "^states honest dishonest", "^states honest dishonest stop");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::ReservedName { .. })));

    let text = replace_line(CASINO, "^parameter go_honest 0.1", "^parameter auto 0.1");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::ReservedName { .. })));

    let text = replace_line(CASINO, "^parameter go_honest 0.1", "^parameter go_honest often");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::InvalidNumber { .. })));
}

#[test]
fn emission_table_constraints() {
    let text = format!("{CASINO}^emission_config stop\n 1\nstop 1\n");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::SilentEmission { .. })));

    let text = format!("{CASINO}^emission_config honest\n 1\nhonest 1\n");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::DuplicateEmission { .. })));

    let text = format!("{PAIR}^emission_config ins y\n A\nins 1\n");
    assert!(ModelSpec::parse(&text).is_ok());

    let text = format!("{PAIR}^emission_config ins\n A\nA 1\n");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::DuplicateEmission { .. })));

    let text = format!("{PAIR}^emission_config ins z\n A\nins 1\n");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::UnknownTape { .. })));

    let text = replace_line(PAIR, "C  0.05  0.4\n", "");
    assert!(matches!(
        ModelSpec::parse(&text),
        Err(SpecError::RowCount {
            expected: 2,
            found:    1,
            ..
        })
    ));

    let text = replace_line(CASINO, "        1    2    3    4    5    6\n", "        1    2    3    4    5    7\n");
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::UnknownSymbol { .. })));
}

#[test]
fn emitting_state_without_emissions() {
    let text = replace_line(CASINO, "^emission_config honest", "^emission_config dishonest");
    let text = replace_line(&text, "honest  0.2", "dishonest  0.2");
    // dishonest is now declared twice
    assert!(matches!(ModelSpec::parse(&text), Err(SpecError::DuplicateEmission { .. })));

    let cut = CASINO.find("^emission_config honest").unwrap();
    let spec = ModelSpec::parse(&CASINO[..cut]).unwrap();
    assert_eq!(
        spec.check_emissions(),
        Err(SpecError::NoEmissions {
            state: "honest".to_string(),
        })
    );
}

#[test]
fn tapes_directive() {
    let text = format!("^tapes a b c\n{CASINO}");
    assert_eq!(ModelSpec::parse(&text), Err(SpecError::TooManyTapes { line: 1 }));

    let text = format!("^tapes dice\n{CASINO}");
    assert_eq!(ModelSpec::parse(&text).unwrap().tapes(), &["dice".to_string()]);
}
