//! Error types for the resume matching engine.
//!
//! This module defines all error types used throughout the library,
//! providing structured error handling with context and error chaining.
//!
//! # Error Hierarchy
//!
//! - [`EngineError`] - Main error enum containing all error variants
//! - Each variant is tagged with a [`Category`] corresponding to the
//!   retry/propagation taxonomy the workflow engine acts on.
//!
//! # Example
//!
//! ```rust
//! use resume_match_engine::error::{EngineError, Result};
//!
//! fn load_config(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .map_err(|e| EngineError::io(format!("failed to read config: {path}"), e))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Taxonomy a [`EngineError`] belongs to, used by the workflow engine to
/// decide whether to retry, skip, or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// A network blip, 5xx from the LLM, or a store timeout. Retried with
    /// backoff; promoted to `PermanentExternal` once retries are exhausted.
    TransientExternal,
    /// An invalid request, a schema mismatch, or a rejected write. Not
    /// retried; the job's outcome is `Error`.
    PermanentExternal,
    /// The job itself is not eligible for matching (missing embedding,
    /// already processed). Silently skipped, never counted as an error.
    Eligibility,
    /// A cooperative cancellation signal was observed.
    Cancellation,
    /// An invalid configuration. Rejected at startup; no recovery.
    Fatal,
}

/// Main error type for the resume matching engine.
#[derive(Error, Debug)]
pub enum EngineError {
    // -------------------------
    // Configuration errors (Fatal)
    // -------------------------
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing configuration file.
        path: PathBuf,
    },

    /// Configuration parsing error.
    #[error("failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation error.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {message}")]
    ConfigInvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    // -------------------------
    // I/O errors
    // -------------------------
    /// General I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // -------------------------
    // Parsing errors
    // -------------------------
    /// TOML parsing error.
    #[error("TOML parsing error: {message}")]
    TomlParse {
        /// Description of the parse error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<toml::de::Error>,
    },

    /// JSON parsing error.
    #[error("JSON parsing error: {message}")]
    JsonParse {
        /// Description of the parse error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<serde_json::Error>,
    },

    // -------------------------
    // Document store errors
    // -------------------------
    /// The document store is temporarily unreachable (transient, retryable).
    #[error("document store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The document store permanently rejected a write (invalid document, etc.).
    #[error("document store rejected write: {message}")]
    StoreRejected {
        /// Description of the rejection.
        message: String,
    },

    /// The document store detected an idempotency conflict; the caller
    /// should treat this as a successful write.
    #[error("document store reported a write conflict: {message}")]
    StoreConflict {
        /// Description of the conflict.
        message: String,
    },

    // -------------------------
    // LLM / agent errors
    // -------------------------
    /// LLM request transport error (connection refused, DNS failure, ...).
    #[error("LLM request failed: {message}")]
    LlmRequest {
        /// Description of the request error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// LLM returned a non-success response. Retryable only when
    /// `status_code` is in the 5xx range; 4xx (other than auth/rate-limit,
    /// which have their own variants) is permanent.
    #[error("LLM response error: {message}")]
    LlmResponse {
        /// Description of the response error.
        message: String,
        /// HTTP status code if available.
        status_code: Option<u16>,
    },

    /// LLM authentication failed.
    #[error("LLM authentication failed: {message}")]
    LlmAuth {
        /// Description of the authentication error.
        message: String,
    },

    /// LLM rate limit exceeded (transient, retryable).
    #[error("LLM rate limit exceeded: {message}")]
    LlmRateLimit {
        /// Description of the rate limit error.
        message: String,
        /// Time to wait before retry (in seconds), if advertised.
        retry_after: Option<u64>,
    },

    /// LLM request timed out (transient, retryable).
    #[error("LLM request timed out: {message}")]
    LlmTimeout {
        /// Description of the timeout.
        message: String,
    },

    // -------------------------
    // Validation errors
    // -------------------------
    /// The validator could not parse or validate the LLM's response against
    /// the expected shortlist schema.
    #[error("validator response invalid: {message}")]
    ValidatorSchema {
        /// Description of the validation error.
        message: String,
        /// The raw text that failed to validate, preserved for diagnosis.
        raw_response: String,
    },

    // -------------------------
    // Recall errors
    // -------------------------
    /// The vector index rejected a query (e.g. dimension mismatch).
    #[error("vector search failed: {message}")]
    VectorSearch {
        /// Description of the failure.
        message: String,
    },

    // -------------------------
    // Generic errors
    // -------------------------
    /// Generic internal error; used for invariant violations that should
    /// not be reachable given upstream validation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// Cooperative cancellation was observed.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Create a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error into the propagation taxonomy the workflow
    /// engine acts on.
    pub fn category(&self) -> Category {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigValidation { .. }
            | Self::ConfigInvalidValue { .. } => Category::Fatal,

            Self::StoreUnavailable { .. }
            | Self::LlmRateLimit { .. }
            | Self::LlmTimeout { .. } => Category::TransientExternal,

            Self::LlmRequest { source, .. } => match source {
                Some(e) if e.is_timeout() || e.is_connect() => Category::TransientExternal,
                _ => Category::PermanentExternal,
            },

            Self::LlmResponse { status_code, .. } => match status_code {
                Some(code) if (500..=599).contains(code) => Category::TransientExternal,
                _ => Category::PermanentExternal,
            },

            Self::StoreRejected { .. }
            | Self::LlmAuth { .. }
            | Self::ValidatorSchema { .. }
            | Self::VectorSearch { .. }
            | Self::Io { .. }
            | Self::TomlParse { .. }
            | Self::JsonParse { .. }
            | Self::Internal { .. } => Category::PermanentExternal,

            Self::StoreConflict { .. } => Category::PermanentExternal,

            Self::Cancelled => Category::Cancellation,
        }
    }

    /// Check if this is a retryable (transient) error.
    pub fn is_retryable(&self) -> bool {
        self.category() == Category::TransientExternal
    }

    /// Get the HTTP status code if this is an LLM response error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::LlmResponse { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

// Implement From for common error types

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParse {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::LlmTimeout {
                message: err.to_string(),
            }
        } else {
            Self::LlmRequest {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}
