//! # custos-core
//!
//! Trait seams between the custos ledger engines and their collaborators:
//! storage, retention policy, and export-key management.

pub mod traits;

pub use traits::{LedgerStore, RetentionPolicySource, SigningKeyProvider};
