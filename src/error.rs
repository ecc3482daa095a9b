use crate::ValueKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("property \"{0}\" does not exist")]
    PropertyNotFound(String),

    #[error("property \"{0}\" is already being observed")]
    AlreadyObserved(String),

    #[error("cannot observe constant property \"{0}\"")]
    ConstantProperty(String),

    #[error("cannot modify constant property \"{0}\"")]
    ConstantWrite(String),

    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),

    #[error("index {index} is out of bounds for a sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("\"{0}\" is not a valid sequence index")]
    InvalidIndex(String),

    #[error("{0} values are not object-typed")]
    NotObject(ValueKind),

    #[error("{0} values have no keyed members")]
    NotKeyed(ValueKind),

    #[error("{kind} values have no method \"{method}\"")]
    UnknownMethod { kind: ValueKind, method: String },

    #[error("method \"{method}\" expects {expected}")]
    MethodArguments {
        method: &'static str,
        expected: &'static str,
    },

    #[error("deletion polling requires a Tokio runtime; disable it with with_poll_deletions(false)")]
    RuntimeUnavailable,
}
