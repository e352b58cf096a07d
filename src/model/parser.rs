use crate::{
    data::Alphabet,
    model::{DEFAULT_TAPE, EmissionCodes, ModelSpec, ProbCode, START, STOP, SpecError, State, TapeSet, TransitionCodes},
};

/// The table block currently receiving rows.
enum Block {
    None,
    Transition {
        /// Destination state indices, in column order
        header: Option<Vec<usize>>,
    },
    Emission {
        line:   usize,
        state:  usize,
        tapes:  TapeSet,
        /// Header symbol labels and their alphabet indices, in column order
        header: Option<Vec<(String, usize)>>,
        rows:   usize,
        codes:  Vec<ProbCode>,
    },
}

/// Line-by-line parser state for a [`ModelSpec`].
#[derive(Default)]
pub(crate) struct SpecParser {
    line:        usize,
    alphabet:    Option<Alphabet>,
    tapes:       Option<Vec<String>>,
    states:      Vec<State>,
    parameters:  Vec<(String, f64)>,
    param_refs:  Vec<(usize, String)>,
    transitions: Option<TransitionCodes>,
    emissions:   Vec<EmissionCodes>,
    block:       Option<Block>,
}

impl SpecParser {
    pub(crate) fn parse(mut self, text: &str) -> Result<ModelSpec, SpecError> {
        for (i, raw) in text.lines().enumerate() {
            self.line = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(directive) = line.strip_prefix('^') {
                let mut tokens = directive.split_whitespace();
                let keyword = tokens.next().unwrap_or("");
                let args: Vec<&str> = tokens.collect();
                self.directive(keyword, &args)?;
            } else {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                self.row(&tokens)?;
            }
        }

        self.finish_block()?;
        self.finish()
    }

    fn in_tables(&self) -> bool {
        self.block.is_some()
    }

    fn directive(&mut self, keyword: &str, args: &[&str]) -> Result<(), SpecError> {
        let line = self.line;
        match keyword {
            "transition_config" => {
                self.finish_block()?;
                self.freeze()?;
                self.block = Some(Block::Transition { header: None });
                return Ok(());
            }
            "emission_config" => {
                self.finish_block()?;
                self.freeze()?;
                return self.open_emission(args);
            }
            _ => {}
        }

        if self.in_tables() {
            return Err(SpecError::DirectiveAfterTable {
                line,
                directive: keyword.to_string(),
            });
        }

        match keyword {
            "alphabet" => {
                if self.alphabet.is_some() {
                    return Err(SpecError::RepeatedDirective {
                        line,
                        directive: "alphabet",
                    });
                }
                if args.is_empty() {
                    return Err(SpecError::MissingArgument {
                        line,
                        directive: "alphabet",
                    });
                }
                let alphabet = Alphabet::from_tokens(args).map_err(|name| SpecError::DuplicateName { line, name })?;
                self.alphabet = Some(alphabet);
            }
            "states" | "silent_states" => {
                let silent = keyword == "silent_states";
                if args.is_empty() {
                    return Err(SpecError::MissingArgument {
                        line,
                        directive: if silent { "silent_states" } else { "states" },
                    });
                }
                for &name in args {
                    if self.states.iter().any(|s| s.name == name) {
                        return Err(SpecError::DuplicateName {
                            line,
                            name: name.to_string(),
                        });
                    }
                    if !silent && (name == START || name == STOP) {
                        return Err(SpecError::ReservedName {
                            line,
                            name: name.to_string(),
                        });
                    }
                    self.states.push(State {
                        name: name.to_string(),
                        silent,
                    });
                }
            }
            "tapes" => {
                if self.tapes.is_some() {
                    return Err(SpecError::RepeatedDirective { line, directive: "tapes" });
                }
                match args {
                    [] => return Err(SpecError::MissingArgument { line, directive: "tapes" }),
                    [a, b] if a == b => {
                        return Err(SpecError::DuplicateName {
                            line,
                            name: (*a).to_string(),
                        });
                    }
                    [_] | [_, _] => self.tapes = Some(args.iter().map(|t| (*t).to_string()).collect()),
                    _ => return Err(SpecError::TooManyTapes { line }),
                }
            }
            "parameter" => {
                let [name, value] = args else {
                    return Err(SpecError::MissingArgument {
                        line,
                        directive: "parameter",
                    });
                };
                if *name == "auto" {
                    return Err(SpecError::ReservedName {
                        line,
                        name: (*name).to_string(),
                    });
                }
                if self.parameters.iter().any(|(p, _)| p == name) {
                    return Err(SpecError::DuplicateName {
                        line,
                        name: (*name).to_string(),
                    });
                }
                let value = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| SpecError::InvalidNumber {
                        line,
                        token: (*value).to_string(),
                    })?;
                self.parameters.push(((*name).to_string(), value));
            }
            _ => {
                return Err(SpecError::UnknownDirective {
                    line,
                    directive: keyword.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Fixes the state and tape declarations once the first table block
    /// opens, since no further declarations may follow.
    fn freeze(&mut self) -> Result<(), SpecError> {
        if self.transitions.is_some() {
            return Ok(());
        }
        if self.alphabet.is_none() {
            return Err(SpecError::MissingDirective { directive: "alphabet" });
        }
        for name in [START, STOP] {
            if !self.states.iter().any(|s| s.silent && s.name == name) {
                return Err(SpecError::MissingSilentState { name });
            }
        }
        if self.tapes.is_none() {
            self.tapes = Some(vec![DEFAULT_TAPE.to_string()]);
        }
        self.transitions = Some(TransitionCodes::new(self.states.len()));
        Ok(())
    }

    fn state_index(&self, name: &str) -> Result<usize, SpecError> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SpecError::UndeclaredState {
                line: self.line,
                name: name.to_string(),
            })
    }

    fn open_emission(&mut self, args: &[&str]) -> Result<(), SpecError> {
        let line = self.line;
        let tapes = self.tapes.as_deref().unwrap_or_default();

        let (state_name, tape_name) = match args {
            [state] => (*state, None),
            [state, tape] => (*state, Some(*tape)),
            [] => {
                return Err(SpecError::MissingArgument {
                    line,
                    directive: "emission_config",
                });
            }
            [_, _, extra, ..] => {
                return Err(SpecError::UnknownTape {
                    line,
                    tape: (*extra).to_string(),
                });
            }
        };

        let state = self.state_index(state_name)?;
        if self.states[state].silent {
            return Err(SpecError::SilentEmission {
                line,
                state: state_name.to_string(),
            });
        }

        let tape_set = match tape_name {
            Some(tape) => TapeSet::Single(tapes.iter().position(|t| t == tape).ok_or_else(|| SpecError::UnknownTape {
                line,
                tape: tape.to_string(),
            })?),
            None if tapes.len() == 1 => TapeSet::Single(0),
            None => TapeSet::Joint,
        };

        if self.emissions.iter().any(|e| e.state == state && e.tapes.overlaps(tape_set)) {
            return Err(SpecError::DuplicateEmission {
                line,
                state: state_name.to_string(),
            });
        }

        let n_symbols = self.alphabet.as_ref().map_or(0, Alphabet::len);
        self.block = Some(Block::Emission {
            line,
            state,
            tapes: tape_set,
            header: None,
            rows: 0,
            codes: vec![ProbCode::Forbidden; tape_set.n_cells(n_symbols)],
        });
        Ok(())
    }

    fn parse_code(&mut self, token: &str) -> Result<ProbCode, SpecError> {
        let code = ProbCode::parse(token).ok_or_else(|| SpecError::InvalidCode {
            line: self.line,
            code: token.to_string(),
        })?;
        if let Some(name) = code.param() {
            self.param_refs.push((self.line, name.to_string()));
        }
        Ok(code)
    }

    fn row(&mut self, tokens: &[&str]) -> Result<(), SpecError> {
        match self.block.take() {
            None | Some(Block::None) => Err(SpecError::RowOutsideTable { line: self.line }),
            Some(Block::Transition { header: None }) => {
                let header = self.transition_header(tokens)?;
                self.block = Some(Block::Transition { header: Some(header) });
                Ok(())
            }
            Some(Block::Transition { header: Some(header) }) => {
                self.transition_row(&header, tokens)?;
                self.block = Some(Block::Transition { header: Some(header) });
                Ok(())
            }
            Some(Block::Emission {
                line,
                state,
                tapes,
                header,
                rows,
                mut codes,
            }) => {
                let header = match header {
                    None => Some(self.emission_header(tokens)?),
                    Some(header) => {
                        self.emission_row(state, tapes, &header, rows, tokens, &mut codes)?;
                        self.block = Some(Block::Emission {
                            line,
                            state,
                            tapes,
                            header: Some(header),
                            rows: rows + 1,
                            codes,
                        });
                        return Ok(());
                    }
                };
                self.block = Some(Block::Emission {
                    line,
                    state,
                    tapes,
                    header,
                    rows,
                    codes,
                });
                Ok(())
            }
        }
    }

    fn transition_header(&self, tokens: &[&str]) -> Result<Vec<usize>, SpecError> {
        if tokens.is_empty() {
            return Err(SpecError::EmptyHeader { line: self.line });
        }
        let mut header = Vec::with_capacity(tokens.len());
        for &name in tokens {
            let to = self.state_index(name)?;
            if header.contains(&to) {
                return Err(SpecError::DuplicateName {
                    line: self.line,
                    name: name.to_string(),
                });
            }
            header.push(to);
        }
        Ok(header)
    }

    fn transition_row(&mut self, header: &[usize], tokens: &[&str]) -> Result<(), SpecError> {
        let line = self.line;
        let [label, cells @ ..] = tokens else {
            return Err(SpecError::RowOutsideTable { line });
        };
        if cells.len() != header.len() {
            return Err(SpecError::RowLength {
                line,
                expected: header.len(),
                found: cells.len(),
            });
        }

        let from = self.state_index(label)?;
        let mut codes = Vec::with_capacity(cells.len());
        for &cell in cells {
            codes.push(self.parse_code(cell)?);
        }

        let stop = self.state_index(STOP)?;
        let start = self.state_index(START)?;
        let Some(transitions) = self.transitions.as_mut() else {
            return Err(SpecError::RowOutsideTable { line });
        };

        if transitions.has_row(from) {
            return Err(SpecError::DuplicateRow {
                line,
                state: (*label).to_string(),
            });
        }
        if codes.iter().filter(|c| **c == ProbCode::Auto).count() > 1 {
            return Err(SpecError::MultipleAuto {
                line,
                row: (*label).to_string(),
            });
        }

        for (&to, code) in header.iter().zip(codes) {
            if code != ProbCode::Forbidden && (from == stop || to == start) {
                return Err(SpecError::InvalidTransition {
                    line,
                    from: (*label).to_string(),
                    to: self.states[to].name.clone(),
                });
            }
            transitions[(from, to)] = code;
        }
        transitions.mark_row(from);
        Ok(())
    }

    fn emission_header(&self, tokens: &[&str]) -> Result<Vec<(String, usize)>, SpecError> {
        if tokens.is_empty() {
            return Err(SpecError::EmptyHeader { line: self.line });
        }
        let Some(alphabet) = self.alphabet.as_ref() else {
            return Err(SpecError::MissingDirective { directive: "alphabet" });
        };

        let mut header: Vec<(String, usize)> = Vec::with_capacity(tokens.len());
        for &symbol in tokens {
            let index = alphabet.index_of(symbol).ok_or_else(|| SpecError::UnknownSymbol {
                line:   self.line,
                symbol: symbol.to_string(),
            })?;
            if header.iter().any(|(_, i)| *i == index) {
                return Err(SpecError::DuplicateName {
                    line: self.line,
                    name: symbol.to_string(),
                });
            }
            header.push((symbol.to_string(), index));
        }
        Ok(header)
    }

    fn emission_row(
        &mut self, state: usize, tapes: TapeSet, header: &[(String, usize)], rows: usize, tokens: &[&str],
        codes: &mut [ProbCode],
    ) -> Result<(), SpecError> {
        let line = self.line;
        let [label, cells @ ..] = tokens else {
            return Err(SpecError::RowOutsideTable { line });
        };

        // A one-tape table has a single row labelled by its state; a joint
        // table has one row per tape-1 symbol, in header order.
        let (expected_rows, expected_label) = match tapes {
            TapeSet::Single(_) => (1, self.states[state].name.as_str()),
            TapeSet::Joint => (header.len(), header.get(rows).map_or("", |(s, _)| s.as_str())),
        };
        if rows >= expected_rows {
            return Err(SpecError::RowCount {
                line,
                expected: expected_rows,
                found: rows + 1,
            });
        }
        if *label != expected_label {
            return Err(SpecError::LabelMismatch {
                line,
                expected: expected_label.to_string(),
                found: (*label).to_string(),
            });
        }
        if cells.len() != header.len() {
            return Err(SpecError::RowLength {
                line,
                expected: header.len(),
                found: cells.len(),
            });
        }

        let n_symbols = self.alphabet.as_ref().map_or(0, Alphabet::len);
        let offset = match tapes {
            TapeSet::Single(_) => 0,
            TapeSet::Joint => header[rows].1 * n_symbols,
        };
        for (&cell, (_, column)) in cells.iter().zip(header) {
            codes[offset + column] = self.parse_code(cell)?;
        }
        Ok(())
    }

    /// Closes the current table block, validating emission tables as a whole.
    fn finish_block(&mut self) -> Result<(), SpecError> {
        if let Some(Block::Emission {
            line,
            state,
            tapes,
            header,
            rows,
            codes,
        }) = self.block.take()
        {
            let expected = match (tapes, &header) {
                (_, None) => return Err(SpecError::EmptyHeader { line }),
                (TapeSet::Single(_), Some(_)) => 1,
                (TapeSet::Joint, Some(header)) => header.len(),
            };
            if rows != expected {
                return Err(SpecError::RowCount {
                    line,
                    expected,
                    found: rows,
                });
            }
            if codes.iter().filter(|c| **c == ProbCode::Auto).count() > 1 {
                return Err(SpecError::MultipleAuto {
                    line,
                    row: self.states[state].name.clone(),
                });
            }
            self.emissions.push(EmissionCodes { state, tapes, codes });
        }
        self.block = Some(Block::None);
        Ok(())
    }

    fn finish(mut self) -> Result<ModelSpec, SpecError> {
        self.freeze()?;
        if self.states.iter().all(|s| s.silent) {
            return Err(SpecError::MissingDirective { directive: "states" });
        }

        for (line, name) in &self.param_refs {
            if !self.parameters.iter().any(|(p, _)| p == name) {
                return Err(SpecError::UnknownParameter {
                    line: *line,
                    name: name.clone(),
                });
            }
        }

        let start = self.state_index(START)?;
        let stop = self.state_index(STOP)?;
        let transitions = self.transitions.unwrap_or_else(|| TransitionCodes::new(self.states.len()));
        for (i, state) in self.states.iter().enumerate() {
            if i != stop && !transitions.has_row(i) {
                return Err(SpecError::MissingTransitionRow {
                    state: state.name.clone(),
                });
            }
        }

        Ok(ModelSpec {
            alphabet: self.alphabet.unwrap_or_default(),
            tapes: self.tapes.unwrap_or_default(),
            states: self.states,
            parameters: self.parameters,
            transitions,
            emissions: self.emissions,
            start,
            stop,
        })
    }
}
