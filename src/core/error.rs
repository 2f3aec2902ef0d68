//! Error types for rate resolution.

use thiserror::Error;

use super::task::TaskId;

/// Errors surfaced to the caller of a resolution request.
///
/// Client contract violations abort a request. Unknown assets and
/// exhausted oracle chains are recovered per item and never reach the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The request contained no identifiers at all.
    #[error("List cant be empty")]
    EmptyRequest,

    /// An identifier was supplied as something other than a string.
    #[error("Tried to initialize an asset out of a non-string identifier (found {found})")]
    InvalidIdentifierType { found: String },

    /// An identifier was an empty string.
    #[error("Tried to initialize an asset out of an empty identifier")]
    EmptyIdentifier,

    /// No asset matches the identifier.
    #[error("Unknown asset {0} provided")]
    UnknownAsset(String),

    /// A background query was dispatched outside a Tokio runtime.
    #[error("Background queries need a running Tokio runtime")]
    NoRuntime,
}

/// Failure of a single rate source for a single asset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The source could not be reached, returned an error status or timed out.
    #[error("{oracle} unavailable: {message}")]
    SourceUnavailable { oracle: String, message: String },

    /// The source answered with something that could not be understood.
    #[error("{oracle} returned a malformed response: {message}")]
    SourceMalformed { oracle: String, message: String },

    /// The source answered with a rate that is not a positive finite number.
    #[error("{oracle} returned an invalid rate: {rate}")]
    InvalidRate { oracle: String, rate: f64 },

    /// The source has no notion of the requested asset.
    #[error("{oracle} does not support {asset}")]
    Unsupported { oracle: String, asset: String },
}

impl OracleError {
    pub fn unavailable(oracle: &str, message: impl ToString) -> Self {
        OracleError::SourceUnavailable {
            oracle: oracle.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(oracle: &str, message: impl ToString) -> Self {
        OracleError::SourceMalformed {
            oracle: oracle.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors from the task polling interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("No task with id {0} exists")]
    UnknownTask(TaskId),
}
