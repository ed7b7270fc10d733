//! Error types and handling
//!
//! This module provides the error types used throughout Gavel.
//! All errors implement the `GavelErrorExt` trait which provides client-safe
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints never include raw database messages or file paths, so they are
//! safe to forward to judge and director clients.

use thiserror::Error;

use crate::types::RatingField;

/// Trait for Gavel error extensions
///
/// Provides additional context for errors: a hint that can be shown to the
/// client that caused the error, and whether the operation may be retried.
pub trait GavelErrorExt {
    /// Returns a client-safe hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are caused by the caller's input or by a transient
    /// state and can be corrected by resubmitting. Non-recoverable errors
    /// indicate a broken process (configuration, storage) that needs an operator.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite operation failures
/// - **Validation**: Missing identity fields or out-of-range ratings
/// - **State**: Scheduler transitions that cannot be performed
/// - **Network**: Listener and WebSocket failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, GavelErrorExt};
/// use sdk::types::RatingField;
///
/// let error = EngineError::RatingOutOfRange { field: RatingField::Creativity, value: 11 };
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Database("disk I/O error".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Rating {field} out of range: {value} (expected 1..=10)")]
    RatingOutOfRange { field: RatingField, value: i64 },

    // Scheduler state errors
    #[error("A presentation requires a participant id")]
    MissingParticipant,

    #[error("Presentation duration must be positive, got {0}ms")]
    InvalidDuration(i64),

    // Score store errors
    #[error("Score already recorded for judge {judge_id}, participant {participant_id}, round {round_index}")]
    DuplicateScore {
        judge_id: String,
        participant_id: String,
        round_index: i64,
    },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GavelErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Score storage failed. Contact the event director",
            Self::Validation(_) => "The request was malformed",
            Self::MissingField(_) => "A required field is missing from the request",
            Self::RatingOutOfRange { .. } => "Ratings must be whole numbers from 1 to 10",
            Self::MissingParticipant => "Choose a participant before starting a presentation",
            Self::InvalidDuration(_) => "Presentation duration must be greater than zero",
            Self::DuplicateScore { .. } => "A score for this presentation was already recorded",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Database(_) | Self::Io(_))
    }
}
