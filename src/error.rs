use std::fmt::Write;
use std::time::Duration;
use thiserror::Error;

/// Formats an error and its entire source chain with each error on a new line
///
/// This produces output like:
/// ```text
/// Error message
///   Caused by: First cause
///   Caused by: Root cause
/// ```
pub fn format_error_chain(err: &dyn std::error::Error) -> String {
    let mut output = String::new();
    write!(&mut output, "{}", err).ok();

    let mut source = err.source();
    while let Some(err) = source {
        write!(&mut output, "\n  Caused by: {}", err).ok();
        source = err.source();
    }

    output
}

/// Formats an anyhow::Error with its full chain
pub fn format_anyhow_chain(err: &anyhow::Error) -> String {
    let mut output = String::new();

    let chain: Vec<_> = err.chain().collect();

    if let Some((first, rest)) = chain.split_first() {
        write!(&mut output, "{}", first).ok();
        for cause in rest {
            write!(&mut output, "\n  Caused by: {}", cause).ok();
        }
    }

    output
}

/// Central application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The remote API answered with a structured error payload
    #[error("API error (HTTP {code}): {detail}")]
    Api { code: u16, detail: String },

    /// A response that is neither an error, a 404, nor a decodable object
    #[error("Malformed response (HTTP {code}): {reason}")]
    MalformedResponse { code: u16, reason: String },

    /// The remote object settled in one of its failure states
    #[error("{reason}")]
    MutationFailed {
        id: String,
        status: String,
        reason: String,
    },

    /// The remote object settled in the access-denied state
    #[error("{reason}")]
    AccessDenied {
        id: String,
        status: String,
        reason: String,
    },

    /// The remote object reports a status no policy covers
    #[error("{kind} {id} reported unrecognized status {status:?}")]
    UnknownStatus {
        kind: String,
        id: String,
        status: String,
    },

    /// Polling ran out of time while the object was still pending
    #[error("{kind} {id} still {last_status:?} after {}s", elapsed.as_secs())]
    Timeout {
        kind: String,
        id: String,
        elapsed: Duration,
        last_status: String,
    },

    /// The calling context cancelled the operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// HTTP client errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/Deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Generic internal errors with context
    #[error("Internal error: {0}")]
    Internal(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
