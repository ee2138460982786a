//! Error taxonomy shared by every layer.

use serde::{Deserialize, Serialize};

/// Failures surfaced at the load/resolve boundary. Serializable so a remote
/// frontend can carry them unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum DexError {
    /// Transport, DNS, timeout or unexpected non-success status.
    #[error("network: {0}")]
    Network(String),
    /// The remote answered "not found" for a reference.
    #[error("not_found: {0}")]
    NotFound(String),
    /// The body did not have the expected JSON shape.
    #[error("malformed_response: {0}")]
    MalformedResponse(String),
}

pub type DexResult<T> = Result<T, DexError>;

impl DexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DexError::NotFound(_))
    }

    /// Same kind, rewritten message.
    pub fn map_message(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            DexError::Network(m) => DexError::Network(f(m)),
            DexError::NotFound(m) => DexError::NotFound(f(m)),
            DexError::MalformedResponse(m) => DexError::MalformedResponse(f(m)),
        }
    }
}
