use crate::errors::GetCode;
use std::{error::Error, fmt};

/// An enum representing a malformed or inconsistent model specification. Each
/// variant carrying a `line` refers to the 1-based line of the source text.
#[non_exhaustive]
#[derive(Clone, Eq, PartialEq)]
pub enum SpecError {
    /// A `^` line named a directive that does not exist
    UnknownDirective { line: usize, directive: String },
    /// A directive was given without its required arguments
    MissingArgument { line: usize, directive: &'static str },
    /// A directive that may only appear once was repeated
    RepeatedDirective { line: usize, directive: &'static str },
    /// A non-table directive appeared after the first table block
    DirectiveAfterTable { line: usize, directive: String },
    /// A directive required by every model never appeared
    MissingDirective { directive: &'static str },
    /// A table row was found outside of any table block
    RowOutsideTable { line: usize },
    /// A parameter value could not be read as a finite number
    InvalidNumber { line: usize, token: String },
    /// A probability code was neither `x`, `$name`, nor a literal in `[0, 1]`
    InvalidCode { line: usize, code: String },
    /// A state was referenced without being declared
    UndeclaredState { line: usize, name: String },
    /// A symbol was referenced that is not part of the alphabet
    UnknownSymbol { line: usize, symbol: String },
    /// A tape was referenced that was never declared
    UnknownTape { line: usize, tape: String },
    /// More than two tapes were declared
    TooManyTapes { line: usize },
    /// A state, parameter, symbol, or column label was declared twice
    DuplicateName { line: usize, name: String },
    /// A reserved name was used for a parameter or an emitting state
    ReservedName { line: usize, name: String },
    /// One of the reserved silent states `start` or `stop` was not declared
    MissingSilentState { name: &'static str },
    /// A row label did not match the label expected at that position
    LabelMismatch {
        line:     usize,
        expected: String,
        found:    String,
    },
    /// A table header declared no columns
    EmptyHeader { line: usize },
    /// A row did not provide exactly one code per header column
    RowLength {
        line:     usize,
        expected: usize,
        found:    usize,
    },
    /// An emission block had too few or too many rows
    RowCount {
        line:     usize,
        expected: usize,
        found:    usize,
    },
    /// A transition row for the same source state was given twice
    DuplicateRow { line: usize, state: String },
    /// A row or distribution contained more than one `$auto` slot
    MultipleAuto { line: usize, row: String },
    /// A transition into `start` or out of `stop` was given a nonzero code
    InvalidTransition { line: usize, from: String, to: String },
    /// A non-stop state has no outgoing transition row
    MissingTransitionRow { state: String },
    /// An emission table was declared for a silent state
    SilentEmission { line: usize, state: String },
    /// A tape of a state was given more than one emission table
    DuplicateEmission { line: usize, state: String },
    /// An emitting state has no emission table
    NoEmissions { state: String },
    /// A code referenced a parameter that was never declared
    UnknownParameter { line: usize, name: String },
    /// No emitting state can move to `stop`
    NoStopTransition,
}

impl fmt::Display for SpecError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpecError::UnknownDirective { line, directive } => write!(f, "line {line}: unknown directive '^{directive}'"),
            SpecError::MissingArgument { line, directive } => {
                write!(f, "line {line}: the '^{directive}' directive is missing an argument")
            }
            SpecError::RepeatedDirective { line, directive } => {
                write!(f, "line {line}: the '^{directive}' directive may only be given once")
            }
            SpecError::DirectiveAfterTable { line, directive } => write!(
                f,
                "line {line}: '^{directive}' must come before the transition and emission tables, which end the file"
            ),
            SpecError::MissingDirective { directive } => write!(f, "the required '^{directive}' directive was not found"),
            SpecError::RowOutsideTable { line } => write!(f, "line {line}: table row found outside of a table block"),
            SpecError::InvalidNumber { line, token } => write!(f, "line {line}: '{token}' is not a finite number"),
            SpecError::InvalidCode { line, code } => write!(
                f,
                "line {line}: '{code}' is not a valid probability code (expected x, $auto, $parameter, or a value in [0, 1])"
            ),
            SpecError::UndeclaredState { line, name } => write!(f, "line {line}: state '{name}' was never declared"),
            SpecError::UnknownSymbol { line, symbol } => write!(f, "line {line}: '{symbol}' is not in the alphabet"),
            SpecError::UnknownTape { line, tape } => write!(f, "line {line}: tape '{tape}' was never declared"),
            SpecError::TooManyTapes { line } => write!(f, "line {line}: at most two tapes are supported"),
            SpecError::DuplicateName { line, name } => write!(f, "line {line}: '{name}' was declared more than once"),
            SpecError::ReservedName { line, name } => write!(f, "line {line}: '{name}' is a reserved name"),
            SpecError::MissingSilentState { name } => write!(f, "the silent state '{name}' must be declared"),
            SpecError::LabelMismatch { line, expected, found } => {
                write!(f, "line {line}: expected a row labelled '{expected}' but found '{found}'")
            }
            SpecError::EmptyHeader { line } => write!(f, "line {line}: the table header has no columns"),
            SpecError::RowLength { line, expected, found } => {
                write!(f, "line {line}: expected {expected} codes in the row but found {found}")
            }
            SpecError::RowCount { line, expected, found } => {
                write!(f, "line {line}: expected {expected} rows in the emission table but found {found}")
            }
            SpecError::DuplicateRow { line, state } => {
                write!(f, "line {line}: the transition row for '{state}' was given more than once")
            }
            SpecError::MultipleAuto { line, row } => write!(f, "line {line}: more than one $auto slot in '{row}'"),
            SpecError::InvalidTransition { line, from, to } => write!(
                f,
                "line {line}: the transition {from} -> {to} must be forbidden (nothing enters start or leaves stop)"
            ),
            SpecError::MissingTransitionRow { state } => write!(f, "state '{state}' has no outgoing transition row"),
            SpecError::SilentEmission { line, state } => {
                write!(f, "line {line}: silent state '{state}' cannot have an emission table")
            }
            SpecError::DuplicateEmission { line, state } => {
                write!(f, "line {line}: a tape of state '{state}' already has an emission table")
            }
            SpecError::NoEmissions { state } => write!(f, "emitting state '{state}' has no emission table"),
            SpecError::UnknownParameter { line, name } => write!(f, "line {line}: parameter '{name}' was never declared"),
            SpecError::NoStopTransition => write!(f, "no emitting state can transition to stop"),
        }
    }
}

impl fmt::Debug for SpecError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for SpecError {}
impl GetCode for SpecError {
    #[inline]
    fn get_code(&self) -> i32 {
        2
    }
}
