//! # custos-retention
//!
//! Legally mandated data retention for the custos audit ledger: per-organization
//! policy configuration (TOML), destructive purge past the retention window,
//! and non-destructive redaction of free-text reasoning.
//!
//! Retention is the one collaborator allowed to mutate hashed records; see
//! the module docs in [`manager`] for how that is reconciled with the
//! tamper-evidence guarantee.

pub mod manager;
pub mod policy;

pub use manager::{PurgeOutcome, RedactionOutcome, RetentionManager, RETENTION_CHUNK};
pub use policy::{RetentionConfig, TomlRetentionPolicy, DEFAULT_REDACTION_TOKEN, DEFAULT_RETENTION_DAYS};

// ── Tests ─────────────────────────────────────────────────────────────────────
