//! Error types for the custos ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`. Error variants
//! carry enough context to produce actionable log entries; none of them wrap
//! source errors directly so the contracts crate stays dependency-light.

use thiserror::Error;

/// The unified error type for the custos ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A record could not be canonicalized for hashing.
    ///
    /// Raised before any write occurs — a record is never stored with an
    /// unset or partial `record_hash`.
    #[error("canonicalization failed: {reason}")]
    Canonicalize { reason: String },

    /// The backing store rejected or failed an operation.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// The caller supplied a decision that fails input validation
    /// (e.g. a confidence outside [0, 1]).
    #[error("invalid decision input: {reason}")]
    InvalidInput { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The export signer could not produce or check a signature.
    #[error("signing error: {reason}")]
    Signing { reason: String },
}

/// Convenience alias used throughout the custos crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
