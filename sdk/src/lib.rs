//! Gavel SDK
//!
//! Shared library providing the judging domain types, the realtime wire
//! protocol and error types. Used by the engine and by client tooling.

/// Error types and handling
pub mod errors;

/// Judging domain types
pub mod types;

/// Realtime wire protocol
pub mod protocol;

// Re-export commonly used types
pub use errors::{EngineError, GavelErrorExt};
pub use protocol::{ClientEvent, ServerEvent};
pub use types::{DraftKey, Ratings, RawRatings, Role, Round, RoundId, Score};
