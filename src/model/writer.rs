use crate::model::{ModelSpec, TapeSet};
use std::fmt::{self, Write};

/// Writes rows of tokens with each column padded to its widest token.
fn write_table(f: &mut fmt::Formatter, rows: &[Vec<String>]) -> fmt::Result {
    let n_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..n_cols)
        .map(|c| rows.iter().filter_map(|r| r.get(c)).map(String::len).max().unwrap_or(0))
        .collect();

    for row in rows {
        let mut line = String::new();
        for (c, token) in row.iter().enumerate() {
            if c + 1 == row.len() {
                line.push_str(token);
            } else {
                write!(line, "{token:<w$}  ", w = widths[c])?;
            }
        }
        writeln!(f, "{}", line.trim_end())?;
    }
    Ok(())
}

impl fmt::Display for ModelSpec {
    /// Writes the specification in its canonical text form. Parsing the output
    /// with [`ModelSpec::parse`] yields an equal specification.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbols: Vec<&str> = self.alphabet.iter().collect();
        if self.alphabet.is_compact() {
            writeln!(f, "^alphabet {}", symbols.concat())?;
        } else {
            writeln!(f, "^alphabet {}", symbols.join(" "))?;
        }
        writeln!(f, "^tapes {}", self.tapes.join(" "))?;

        // Consecutive runs keep the declaration order, and thus the state
        // indices, intact
        for run in self.states.chunk_by(|a, b| a.silent == b.silent) {
            let directive = if run[0].silent { "silent_states" } else { "states" };
            let names: Vec<&str> = run.iter().map(|s| s.name.as_str()).collect();
            writeln!(f, "^{directive} {}", names.join(" "))?;
        }

        for (name, value) in &self.parameters {
            writeln!(f, "^parameter {name} {value}")?;
        }

        writeln!(f, "^transition_config")?;
        let destinations: Vec<usize> = (0..self.n_states()).filter(|&i| i != self.start).collect();
        let mut rows = vec![
            std::iter::once(String::new())
                .chain(destinations.iter().map(|&i| self.state_name(i).to_string()))
                .collect::<Vec<_>>(),
        ];
        for from in (0..self.n_states()).filter(|&i| self.transitions.has_row(i)) {
            let mut row = vec![self.state_name(from).to_string()];
            row.extend(destinations.iter().map(|&to| self.transitions[(from, to)].to_string()));
            rows.push(row);
        }
        write_table(f, &rows)?;

        let n_symbols = self.alphabet.len();
        for emission in &self.emissions {
            let state = self.state_name(emission.state);
            match emission.tapes {
                TapeSet::Single(tape) if self.n_tapes() > 1 => {
                    writeln!(f, "^emission_config {state} {}", self.tapes[tape])?;
                }
                _ => writeln!(f, "^emission_config {state}")?,
            }

            let mut rows = vec![
                std::iter::once(String::new())
                    .chain(symbols.iter().map(|s| (*s).to_string()))
                    .collect::<Vec<_>>(),
            ];
            match emission.tapes {
                TapeSet::Single(_) => {
                    let mut row = vec![state.to_string()];
                    row.extend(emission.codes.iter().map(ToString::to_string));
                    rows.push(row);
                }
                TapeSet::Joint => {
                    for (a, chunk) in emission.codes.chunks(n_symbols).enumerate() {
                        let mut row = vec![symbols[a].to_string()];
                        row.extend(chunk.iter().map(ToString::to_string));
                        rows.push(row);
                    }
                }
            }
            write_table(f, &rows)?;
        }

        Ok(())
    }
}
