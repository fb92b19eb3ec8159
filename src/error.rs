use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

/// Stable machine-readable code for every [`Error`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    UnsupportedMethod,
    Transport,
    HttpStatus,
    ReadBody,
    FutureTimeout,
    FutureCanceled,
    FutureConsumed,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedMethod => "unsupported_method",
            Self::Transport => "transport",
            Self::HttpStatus => "http_status",
            Self::ReadBody => "read_body",
            Self::FutureTimeout => "future_timeout",
            Self::FutureCanceled => "future_canceled",
            Self::FutureConsumed => "future_consumed",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured method is outside the supported set, or the transport
    /// does not implement it. Raised before any transmission.
    #[error("http method {method} is not supported by this transport")]
    UnsupportedMethod { method: Method },

    /// A physical transmission failed below the HTTP layer. The underlying
    /// transport error is preserved unchanged as the source.
    #[error("transport error for {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The final response of an execute loop was unsuccessful and the
    /// request was configured to surface that as an error.
    #[error("http status error {status} for {method} {url}: {body}")]
    HttpStatus {
        status: StatusCode,
        headers: HeaderMap,
        method: Method,
        url: String,
        body: String,
    },

    #[error("failed to read response body: {source}")]
    ReadBody {
        #[source]
        source: std::io::Error,
    },

    /// Blocking retrieval with a bound elapsed before the task completed.
    /// The underlying task keeps running.
    #[error("response future not complete within {timeout_ms}ms")]
    FutureTimeout { timeout_ms: u128 },

    #[error("response future was canceled before the request ran")]
    FutureCanceled,

    #[error("response future result was already retrieved")]
    FutureConsumed,
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedMethod { .. } => ErrorCode::UnsupportedMethod,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::HttpStatus { .. } => ErrorCode::HttpStatus,
            Self::ReadBody { .. } => ErrorCode::ReadBody,
            Self::FutureTimeout { .. } => ErrorCode::FutureTimeout,
            Self::FutureCanceled => ErrorCode::FutureCanceled,
            Self::FutureConsumed => ErrorCode::FutureConsumed,
        }
    }

    /// Status code carried by an [`Error::HttpStatus`], if that is what
    /// this error is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
