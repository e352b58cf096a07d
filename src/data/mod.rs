//! Symbol alphabets and the emission sequences thrown on each tape.

/// An ordered, finite set of symbol labels shared by the emitting states of
/// every tape. The declared order is the order used for inverse-CDF sampling
/// and for indexing emission tables.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Alphabet {
    symbols: Vec<String>,
}

impl Alphabet {
    /// Builds an alphabet from the tokens of an `^alphabet` directive. A single
    /// token is split into one symbol per character; several tokens are taken
    /// as one symbol each.
    ///
    /// ## Errors
    ///
    /// Returns the first duplicated symbol.
    pub fn from_tokens(tokens: &[&str]) -> Result<Self, String> {
        let symbols: Vec<String> = match tokens {
            [single] => single.chars().map(String::from).collect(),
            _ => tokens.iter().map(|t| (*t).to_string()).collect(),
        };

        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(symbol.clone());
            }
        }

        Ok(Self { symbols })
    }

    /// The number of symbols.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Retrieves the label of the symbol at `index`.
    #[inline]
    #[must_use]
    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    /// Locates the index of a symbol label.
    #[inline]
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == label)
    }

    /// Iterates over the symbol labels in declared order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    /// Whether every symbol is a single character, in which case sequences are
    /// rendered without separators.
    #[inline]
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.symbols.iter().all(|s| s.chars().count() == 1)
    }

    /// Encodes text into symbol indices for a compact alphabet, returning
    /// `None` if a character is not in the alphabet.
    #[must_use]
    pub fn encode(&self, text: &str) -> Option<Vec<usize>> {
        let mut buf = [0u8; 4];
        text.chars().map(|c| self.index_of(c.encode_utf8(&mut buf))).collect()
    }
}

/// The emission sequences on each tape, stored as indices into an
/// [`Alphabet`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Sequences {
    tapes: Vec<Vec<usize>>,
}

impl Sequences {
    /// Creates empty sequences for `n_tapes` tapes.
    #[inline]
    #[must_use]
    pub fn new(n_tapes: usize) -> Self {
        Self {
            tapes: vec![Vec::new(); n_tapes],
        }
    }

    /// Wraps already encoded sequences, one per tape.
    #[inline]
    #[must_use]
    pub fn from_tapes(tapes: Vec<Vec<usize>>) -> Self {
        Self { tapes }
    }

    #[inline]
    #[must_use]
    pub fn n_tapes(&self) -> usize {
        self.tapes.len()
    }

    /// The encoded sequence on tape `tape`.
    ///
    /// ## Panics
    ///
    /// `tape` must be less than [`Sequences::n_tapes`].
    #[inline]
    #[must_use]
    pub fn tape(&self, tape: usize) -> &[usize] {
        &self.tapes[tape]
    }

    /// Appends a symbol to tape `tape`.
    #[inline]
    pub(crate) fn push(&mut self, tape: usize, symbol: usize) {
        self.tapes[tape].push(symbol);
    }

    /// Renders each tape using the labels of `alphabet`.
    #[must_use]
    pub fn render(&self, alphabet: &Alphabet) -> Vec<String> {
        let sep = if alphabet.is_compact() { "" } else { " " };
        self.tapes
            .iter()
            .map(|tape| {
                tape.iter()
                    .map(|&s| alphabet.symbol(s).unwrap_or("?"))
                    .collect::<Vec<_>>()
                    .join(sep)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alphabet_forms() {
        let dice = Alphabet::from_tokens(&["123456"]).unwrap();
        assert_eq!(dice.len(), 6);
        assert_eq!(dice.index_of("4"), Some(3));
        assert!(dice.is_compact());

        let codons = Alphabet::from_tokens(&["AAA", "AAC", "AAG"]).unwrap();
        assert_eq!(codons.symbol(2), Some("AAG"));
        assert!(!codons.is_compact());

        assert_eq!(Alphabet::from_tokens(&["ACGA"]), Err("A".to_string()));
    }

    #[test]
    fn render_and_encode() {
        let dna = Alphabet::from_tokens(&["ACGT"]).unwrap();
        let encoded = dna.encode("GATTACA").unwrap();
        let seqs = Sequences::from_tapes(vec![encoded]);
        assert_eq!(seqs.render(&dna), vec!["GATTACA".to_string()]);
        assert_eq!(dna.encode("GAUC"), None);

        let words = Alphabet::from_tokens(&["hi", "lo"]).unwrap();
        let seqs = Sequences::from_tapes(vec![vec![0, 1, 1]]);
        assert_eq!(seqs.render(&words), vec!["hi lo lo".to_string()]);
    }
}
