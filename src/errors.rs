//! Harness Error Types
//!
//! Unified error handling across input loading, prompt assembly, model
//! calls, and result persistence.

use std::fmt;

/// Error kind categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessErrorKind {
    /// No input document to work on
    NoActiveInput,
    /// Workspace or destination folder missing
    MissingWorkspace,
    /// Filename not supplied
    MissingFilename,
    /// Target file already exists and will not be overwritten
    AlreadyExists,
    /// Structured experiment could not be decoded
    InvalidExperiment,
    /// Experiment context list skips an expected key
    MissingContext,
    /// Configuration value could not be interpreted
    InvalidConfig,
    /// Backend name not recognized
    UnknownBackend,
    /// Backend recognized but not implemented
    BackendUnavailable,
    /// Model backend failed (network, HTTP status, response shape)
    Backend,
    /// Model returned no usable text
    EmptyResponse,
    /// Filesystem failure
    Io,
}

impl fmt::Display for HarnessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessErrorKind::NoActiveInput => write!(f, "NoActiveInput"),
            HarnessErrorKind::MissingWorkspace => write!(f, "MissingWorkspace"),
            HarnessErrorKind::MissingFilename => write!(f, "MissingFilename"),
            HarnessErrorKind::AlreadyExists => write!(f, "AlreadyExists"),
            HarnessErrorKind::InvalidExperiment => write!(f, "InvalidExperiment"),
            HarnessErrorKind::MissingContext => write!(f, "MissingContext"),
            HarnessErrorKind::InvalidConfig => write!(f, "InvalidConfig"),
            HarnessErrorKind::UnknownBackend => write!(f, "UnknownBackend"),
            HarnessErrorKind::BackendUnavailable => write!(f, "BackendUnavailable"),
            HarnessErrorKind::Backend => write!(f, "Backend"),
            HarnessErrorKind::EmptyResponse => write!(f, "EmptyResponse"),
            HarnessErrorKind::Io => write!(f, "Io"),
        }
    }
}

/// Harness error with context
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct HarnessError {
    /// Error category
    pub kind: HarnessErrorKind,
    /// Human-readable message
    pub message: String,
}

impl HarnessError {
    /// Create a new error
    pub fn new(kind: HarnessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // --- Convenience constructors ---

    /// No input document was supplied or it could not be read
    pub fn no_active_input(detail: impl Into<String>) -> Self {
        Self::new(HarnessErrorKind::NoActiveInput, detail)
    }

    /// Workspace or destination folder is missing
    pub fn missing_workspace(path: &std::path::Path) -> Self {
        Self::new(
            HarnessErrorKind::MissingWorkspace,
            format!("No workspace folder is open: {}", path.display()),
        )
    }

    /// Filename was empty
    pub fn missing_filename() -> Self {
        Self::new(HarnessErrorKind::MissingFilename, "No filename was provided")
    }

    /// Refusing to overwrite an existing file
    pub fn already_exists(path: &std::path::Path) -> Self {
        Self::new(
            HarnessErrorKind::AlreadyExists,
            format!("File already exists: {}", path.display()),
        )
    }

    /// Structured experiment is malformed
    pub fn invalid_experiment(msg: impl Into<String>) -> Self {
        Self::new(HarnessErrorKind::InvalidExperiment, msg)
    }

    /// Experiment context entry at `index` lacks its `context<index+1>` key
    pub fn missing_context(key: &str) -> Self {
        Self::new(
            HarnessErrorKind::MissingContext,
            format!("Context is missing: {}", key),
        )
    }

    /// Configuration value is unusable
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(HarnessErrorKind::InvalidConfig, msg)
    }

    /// Unrecognized backend selector
    pub fn unknown_backend(name: &str) -> Self {
        Self::new(
            HarnessErrorKind::UnknownBackend,
            format!("Unknown LLM backend '{}'", name),
        )
    }

    /// Recognized backend without an implementation
    pub fn backend_unavailable(name: &str) -> Self {
        Self::new(
            HarnessErrorKind::BackendUnavailable,
            format!("LLM backend '{}' is not implemented", name),
        )
    }

    /// Model backend failure
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::new(HarnessErrorKind::Backend, msg)
    }

    /// Model produced no text
    pub fn empty_response() -> Self {
        Self::new(HarnessErrorKind::EmptyResponse, "The model returned an empty response")
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::new(HarnessErrorKind::Io, err.to_string())
    }
}

impl From<serde_yaml::Error> for HarnessError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::invalid_experiment(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::backend(format!("Malformed JSON: {}", err))
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::backend("Request timeout - the model took too long to respond")
        } else if err.is_connect() {
            Self::backend("Connection error - unable to reach the model endpoint")
        } else {
            Self::backend(format!("Network error: {}", err))
        }
    }
}

/// Result type alias for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
