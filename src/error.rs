//! Error kinds surfaced by the codec and the ABI registry.

use revm::primitives::{Address, B256};

/// Every failure the codec or the registry can report.
///
/// Each variant is terminal for the invocation that produced it. Nothing is
/// retried internally and no partial payload accompanies an error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("malformed interface description: {0}")]
    MalformedInterface(String),
    #[error("method `{0}` not found in interface description")]
    MethodNotFound(String),
    #[error("no overload of `{0}` accepts the supplied arguments")]
    NoMatchingOverload(String),
    #[error("method `{method}` takes {expected} argument(s), {actual} supplied")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("argument {index} of `{method}`: expected {expected}, {reason}")]
    ArgumentTypeMismatch {
        method: String,
        index: usize,
        expected: String,
        reason: String,
    },
    #[error("no interface description stored for account {0}")]
    NotFound(Address),
    #[error("account {0} cannot hold an interface description")]
    InvalidAccount(Address),
    #[error("state storage unavailable: {0}")]
    StorageUnavailable(#[from] StateError),
}

/// Failures reported by a state storage backend.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("unknown state root {0}")]
    UnknownRoot(B256),
    #[error("no state bound to this instance")]
    Unbound,
    #[error("{0}")]
    Backend(String),
}

/// Shape error raised while checking a single argument, before the caller
/// attaches the method name and position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Mismatch {
    pub(crate) expected: String,
    pub(crate) reason: String,
}

impl Mismatch {
    pub(crate) fn new(expected: impl ToString, reason: impl Into<String>) -> Self {
        Self { expected: expected.to_string(), reason: reason.into() }
    }

    pub(crate) fn at(self, method: &str, index: usize) -> AbiError {
        AbiError::ArgumentTypeMismatch {
            method: method.to_string(),
            index,
            expected: self.expected,
            reason: self.reason,
        }
    }
}
