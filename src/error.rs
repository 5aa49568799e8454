//! Error taxonomy for API calls and its classification at the process boundary.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Maximum number of characters of a response body kept when rendering an [`ApiError`].
pub const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Replacement for redacted secret values.
pub const REDACTED: &str = "[REDACTED]";

const TRUNCATION_MARKER: &str = "... (truncated)";

/// Fixed reason used for every 401/403 response.
pub const AUTH_FAILURE_REASON: &str = "invalid API key or insufficient permissions";

/// Errors produced by the API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad or insufficient credential. Never carries server-provided detail.
    #[error("authentication failed: {reason}")]
    Auth { reason: &'static str },

    /// Upstream throttling outlasted the retry budget.
    #[error("rate limit exceeded, retry after {retry_after} seconds")]
    RateLimit { retry_after: u64 },

    /// Locally detected invalid input; nothing was sent to the network.
    #[error("validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("circuit breaker open: too many consecutive failures, requests temporarily blocked")]
    CircuitOpen,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("request timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to marshal request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("unexpected API response format (got: {preview}): {source}")]
    Decode {
        preview: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "docuseal not configured - set DOCUSEAL_URL and DOCUSEAL_API_KEY or pass --url and --api-key"
    )]
    NotConfigured,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The boundary classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth { .. } => ErrorKind::Auth,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::CircuitOpen => ErrorKind::CircuitOpen,
            Error::Timeout => ErrorKind::Timeout,
            Error::NotConfigured => ErrorKind::NotConfigured,
            Error::Transport(e) if e.is_timeout() => ErrorKind::Timeout,
            _ => ErrorKind::Unknown,
        }
    }

    /// Seconds to wait before re-invoking, for rate-limit failures.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimit { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// A non-success response from the API.
///
/// The body may echo secrets back, so [`fmt::Display`] only ever renders the
/// sanitized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: u16,
    body: String,
}

impl ApiError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The unsanitized response body. Not for user-facing output.
    pub fn raw_body(&self) -> &str {
        &self.body
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API error (status {}): {}",
            self.status,
            sanitize_error_body(&self.body)
        )
    }
}

impl std::error::Error for ApiError {}

static SECRET_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("(?:api[_-]?key|token|password|secret|authorization|auth)")\s*:\s*"[^"]*""#)
        .expect("secret field pattern is valid")
});

static BEARER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"bearer\s+[A-Za-z0-9\-._~+/]+=*""#).expect("bearer pattern is valid")
});

/// Truncates a response body and redacts known secret values from it.
pub fn sanitize_error_body(body: &str) -> String {
    let mut body = match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}{}", &body[..cut], TRUNCATION_MARKER),
        None => body.to_string(),
    };

    body = SECRET_FIELD
        .replace_all(&body, format!(r#"$1: "{}""#, REDACTED).as_str())
        .into_owned();
    BEARER_TOKEN
        .replace_all(&body, format!(r#""{}""#, REDACTED).as_str())
        .into_owned()
}

/// Stable failure categories exposed to automated callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    RateLimit,
    NotConfigured,
    CircuitOpen,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Process exit code. These values are part of the CLI contract.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Validation => 2,
            ErrorKind::Auth => 3,
            ErrorKind::RateLimit => 4,
            ErrorKind::NotConfigured => 5,
            ErrorKind::CircuitOpen => 6,
            ErrorKind::Timeout => 7,
            ErrorKind::Unknown => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::CircuitOpen => "circuit_breaker",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies an error surfaced to the process boundary.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    if let Some(e) = err.downcast_ref::<Error>() {
        return e.kind();
    }
    if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return ErrorKind::Timeout;
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        if e.is_timeout() {
            return ErrorKind::Timeout;
        }
    }
    ErrorKind::Unknown
}

/// Exit code for an error surfaced to the process boundary.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    classify(err).exit_code()
}
