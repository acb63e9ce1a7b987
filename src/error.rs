//! Error types for the pdf2xlsx library.
//!
//! Every step of a conversion fails into exactly one [`ConversionError`]
//! variant. Failures reported by the remote service are further described by
//! a [`ServiceFault`], which keeps the HTTP status and the service's own error
//! code when the response carried them.
//!
//! The variants double as the exit-code table of the `pdf2xlsx` binary (see
//! [`ConversionError::exit_code`]), so scripts can tell a missing input apart
//! from a rejected upload without scraping the log.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::credentials::{CLIENT_ID_VAR, CLIENT_SECRET_VAR};

/// All fatal errors returned by a conversion run.
#[derive(Debug, Error)]
pub enum ConversionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input path does not reference a readable regular file.
    #[error("The specified PDF file does not exist: '{}'", .path.display())]
    InputNotFound { path: PathBuf },

    /// Reading the input or writing the output failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// One or both service credentials are unset or empty.
    #[error(
        "Environment variables {} and {} must be set (missing: {})",
        CLIENT_ID_VAR,
        CLIENT_SECRET_VAR,
        .missing.join(", ")
    )]
    MissingCredentials { missing: Vec<&'static str> },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The remote service rejected a request or the export job failed.
    #[error("{0}")]
    Service(#[from] ServiceFault),

    /// The remote job did not finish in time, or a request timed out.
    #[error("Timed out after {secs}s waiting for {operation}")]
    ServiceTimeout { operation: String, secs: u64 },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("{0}")]
    Unexpected(String),
}

impl ConversionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category label used as the prefix of the logged error line.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InputNotFound { .. } | Self::Io { .. } => "File error",
            Self::MissingCredentials { .. } | Self::InvalidConfig(_) => "Configuration error",
            Self::Service(_) => "PDF Services API error",
            Self::ServiceTimeout { .. } => "PDF Services timeout",
            Self::Unexpected(_) => "An unexpected error occurred",
        }
    }

    /// Process exit code reported for this error under
    /// [`crate::config::FailurePolicy::Report`].
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Unexpected(_) => 1,
            Self::InputNotFound { .. } => 3,
            Self::Io { .. } => 4,
            Self::MissingCredentials { .. } | Self::InvalidConfig(_) => 5,
            Self::Service(_) => 6,
            Self::ServiceTimeout { .. } => 7,
        }
    }
}

/// Which side of the service contract produced a [`ServiceFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The service answered with an error (bad request, auth, failed job).
    Api,
    /// The account's usage quota or rate limit was exceeded.
    Usage,
    /// The client could not talk to the service or decode its answer.
    Sdk,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultKind::Api => "service error",
            FaultKind::Usage => "usage limit exceeded",
            FaultKind::Sdk => "client error",
        })
    }
}

/// A failure reported by, or while talking to, the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFault {
    pub kind: FaultKind,
    /// HTTP status of the failing response, if there was one.
    pub status: Option<u16>,
    /// Service-specific error code (e.g. `BAD_PDF`).
    pub code: Option<String>,
    pub message: String,
}

impl ServiceFault {
    pub fn api(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Api,
            status,
            code,
            message: message.into(),
        }
    }

    pub fn usage(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Usage,
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn sdk(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Sdk,
            status: None,
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match (self.status, self.code.as_deref()) {
            (Some(status), Some(code)) => write!(f, " (HTTP {status}, {code})")?,
            (Some(status), None) => write!(f, " (HTTP {status})")?,
            (None, Some(code)) => write!(f, " ({code})")?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ServiceFault {}
