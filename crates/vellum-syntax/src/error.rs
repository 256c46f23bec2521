use thiserror::Error;

/// Errors produced while parsing notation source.
///
/// Offsets are byte offsets into the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected}, found `{found}` at byte {offset}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        offset: usize,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("expected `</{expected}>`, found `</{found}>` at byte {offset}")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("unexpected closing tag `{name}` at byte {offset}")]
    UnexpectedClose { name: String, offset: usize },

    #[error("unclosed element `{name}` opened at byte {offset}")]
    Unclosed { name: String, offset: usize },
}

impl ParseError {
    /// Byte offset the error points at, if it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedToken { offset, .. }
            | ParseError::MismatchedClose { offset, .. }
            | ParseError::UnexpectedClose { offset, .. }
            | ParseError::Unclosed { offset, .. } => Some(*offset),
            ParseError::UnexpectedEnd { .. } => None,
        }
    }
}
