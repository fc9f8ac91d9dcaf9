//! Crate-wide error type.
//!
//! Covers every recoverable failure an operation can report. Internal
//! consistency failures (corrupted coset-table or union-find invariants)
//! are not represented here: they are `assert!`/`debug_assert!` panics,
//! treated as fatal bugs rather than recoverable conditions.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CongruenceError {
    #[error("operation requires an alphabet, but none has been set")]
    AlphabetNotSet,

    #[error("unknown letter '{0}' is not in the presentation's alphabet")]
    UnknownLetter(char),

    #[error("semigroup presentations do not admit the empty word")]
    EmptyWord,

    #[error("cannot modify the presentation or add generating pairs after the race has started")]
    AlreadyStarted,

    #[error("prefilled coset table is invalid: {0}")]
    InvalidTable(String),

    #[error("race has no runners installed")]
    NoRunners,

    #[error("operation requires a two-sided congruence")]
    NotTwoSided,

    #[error("query could not be decided before cancellation or timeout")]
    Undecidable,
}

pub type Result<T> = std::result::Result<T, CongruenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_non_empty() {
        let errs = [
            CongruenceError::AlphabetNotSet,
            CongruenceError::UnknownLetter('z'),
            CongruenceError::EmptyWord,
            CongruenceError::AlreadyStarted,
            CongruenceError::InvalidTable("bad row".into()),
            CongruenceError::NoRunners,
            CongruenceError::NotTwoSided,
            CongruenceError::Undecidable,
        ];
        for e in errs {
            assert!(!e.to_string().is_empty());
        }
    }
}
