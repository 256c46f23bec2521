use thiserror::Error;

/// Every way an engine operation can fail.
///
/// All failures are synchronous and abort only the primitive that raised
/// them; a transaction stays usable afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("offset {offset} is out of bounds (max {max})")]
    OffsetOutOfBounds { offset: usize, max: usize },

    #[error("path {path:?} no longer resolves: {reason}")]
    StalePath {
        path: Vec<usize>,
        reason: &'static str,
    },

    #[error("{operation} requires a range confined to a single parent")]
    Unconfined { operation: &'static str },

    #[error("selection has no {missing}")]
    IncompleteSelection { missing: &'static str },

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("step listeners still appending after {passes} passes")]
    ListenerLoop { passes: usize },

    #[error("notation: {0}")]
    Notation(#[from] vellum_syntax::ParseError),
}

impl EngineError {
    pub(crate) fn assertion(message: impl Into<String>) -> Self {
        EngineError::Assertion(message.into())
    }

    pub(crate) fn stale(path: &[usize], reason: &'static str) -> Self {
        EngineError::StalePath {
            path: path.to_vec(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
