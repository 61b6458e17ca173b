use std::fmt;

/// Convenience result type used across the token pipeline.
pub type TokenResult<T> = Result<T, TokenError>;

/// Why a network-backed image request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The request did not finish before its deadline and was aborted.
    Timeout,
    /// The remote answered with a non-success status.
    Status(u16),
    /// The resource could not be reached at all.
    Unavailable,
    /// The request was cancelled before it completed.
    Aborted,
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::Unavailable => f.write_str("unreachable"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Top-level error taxonomy used by the pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    /// Source bytes are not a decodable image.
    #[error("decode error: {0}")]
    Decode(String),

    /// A fetch for a source, gradient or texture image failed.
    #[error("network error: {failure} while trying to reach {url}")]
    Network {
        /// The URL as requested (before any proxy rewrite).
        url: String,
        /// Failure kind.
        failure: NetworkFailure,
    },

    /// A precondition on buffer or kernel geometry was violated.
    #[error("shape error: {0}")]
    Shape(String),

    /// Invalid user-provided settings or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Encoding the finished token failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing settings.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TokenError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn network(url: impl Into<String>, failure: NetworkFailure) -> Self {
        Self::Network {
            url: url.into(),
            failure,
        }
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Network failures are reported to the user and retried on the next change; everything
    /// else is a local precondition failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
