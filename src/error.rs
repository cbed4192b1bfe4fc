//! Error types for the Leadgate service.

use thiserror::Error;

/// Main error type for Leadgate operations.
#[derive(Error, Debug)]
pub enum LeadgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A notification sink rejected or failed to deliver a lead
    #[error("Notifier '{notifier}' failed: {reason}")]
    Notify {
        notifier: &'static str,
        reason: String,
    },

    /// Spreadsheet authentication or write failures
    #[error("Sheets error: {0}")]
    Sheets(String),

    /// Email could not be built
    #[error("Mail error: {0}")]
    Mail(#[from] lettre::error::Error),

    /// SMTP relay errors
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Outbound HTTP errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for LeadgateError {
    fn from(err: config::ConfigError) -> Self {
        LeadgateError::Config(err.to_string())
    }
}

/// Result type alias for Leadgate operations.
pub type Result<T> = std::result::Result<T, LeadgateError>;
