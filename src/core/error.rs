//! Error types for the mawaqit client
//!
//! Every fallible operation returns [`Result`]. Failures are reported at the
//! boundary that produced them and never abort a session.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, MawaqitError>;

/// Errors that can occur while fetching, resolving or saving
#[derive(Error, Debug)]
pub enum MawaqitError {
    /// Transport failure or non-success status on a fetch
    #[error("Network error: {message}")]
    Network { message: String },

    /// Response body did not have the expected shape
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Schedule query returned no rows
    #[error("No schedule for {region} on {date}")]
    EmptyResult { region: String, date: String },

    /// Reverse geocoding failed or the region field was missing
    #[error("Geocode error: {message}")]
    Geocode { message: String },

    /// Device position denied, unsupported or timed out
    #[error("Location not available: {reason}")]
    NotAvailable { reason: String },

    /// Save request rejected or unreachable
    #[error("Failed to save region {region}: {message}")]
    Persistence { region: String, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Date not in YYYY-MM-DD form
    #[error("Invalid date: {value} (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    /// IO error on config or state files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error on config or state files
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file given explicitly but missing
    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MawaqitError>,
    },
}

impl MawaqitError {
    /// Wrap an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MawaqitError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        MawaqitError::Network {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        MawaqitError::Decode {
            message: message.into(),
        }
    }

    /// Create a geocode error
    pub fn geocode(message: impl Into<String>) -> Self {
        MawaqitError::Geocode {
            message: message.into(),
        }
    }

    /// Create a location-unavailable error
    pub fn not_available(reason: impl Into<String>) -> Self {
        MawaqitError::NotAvailable {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        MawaqitError::InvalidConfig {
            message: message.into(),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &MawaqitError {
        match self {
            MawaqitError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(ctx))
    }
}
