//! Core trait definitions for the custos ledger.
//!
//! These three traits define the ledger's collaborator boundary:
//!
//! - `LedgerStore`           — the ordered, queryable append log
//! - `RetentionPolicySource` — per-organization retention configuration
//! - `SigningKeyProvider`    — the shared export-signing secret
//!
//! The engines (recorder, verifier, retention manager, export signer) are
//! written against these seams only; the in-memory store in custos-ledger
//! is the reference implementation, and a relational store slots in behind
//! the same contract.

use chrono::{DateTime, Utc};

use custos_contracts::{
    error::LedgerResult,
    query::RecordFilter,
    record::{DecisionRecord, RecordId},
    scope::ScopeKey,
};

/// The storage seam: an ordered, queryable append log of decision records.
///
/// # Ordering contract
///
/// The chain's total order within a scope is `(created_at, seq)` ascending,
/// where `seq` is the insertion ordinal the store assigns. `scan` must
/// return records in that order; `tip` and `tip_before` must use it to pick
/// "most recent".
///
/// # Mutation contract
///
/// Records are append-only. `set_metadata` exists solely for the retention
/// manager's redaction path and must touch nothing but `metadata`;
/// `delete` exists solely for its purge path. No other caller mutates.
pub trait LedgerStore: Send + Sync {
    /// Append one record. The store assigns and returns the insertion
    /// ordinal, overwriting whatever `seq` the caller passed.
    fn insert(&self, record: DecisionRecord) -> LedgerResult<u64>;

    /// The `record_hash` of the most recent record in `scope`, or `None`
    /// when the scope has no records yet.
    fn tip(&self, scope: &ScopeKey) -> LedgerResult<Option<String>>;

    /// The `record_hash` of the most recent record in `scope` strictly
    /// before `(before, before_seq)` in chain order, or `None` when no such
    /// record exists. Used by the verifier to bridge a windowed scan back
    /// to full history.
    fn tip_before(
        &self,
        scope: &ScopeKey,
        before: DateTime<Utc>,
        before_seq: u64,
    ) -> LedgerResult<Option<String>>;

    /// All records matching `filter` in ascending `(created_at, seq)`
    /// order, truncated to `limit` when given.
    fn scan(&self, filter: &RecordFilter, limit: Option<usize>)
        -> LedgerResult<Vec<DecisionRecord>>;

    /// One page of matching records in descending `(created_at, seq)`
    /// order. `page` is zero-based.
    fn list(
        &self,
        filter: &RecordFilter,
        page: usize,
        limit: usize,
    ) -> LedgerResult<Vec<DecisionRecord>>;

    /// Delete the given records outright. Returns how many existed and
    /// were removed. Retention purge only.
    fn delete(&self, ids: &[RecordId]) -> LedgerResult<u64>;

    /// Replace one record's `metadata` map. Retention redaction only; every
    /// other field is untouched. Unknown ids are a storage error.
    fn set_metadata(
        &self,
        id: &RecordId,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> LedgerResult<()>;
}

/// Per-organization retention configuration, read-only to the ledger.
///
/// Backed by a configuration collaborator (the TOML implementation lives in
/// custos-retention). The retention manager never mutates policy.
pub trait RetentionPolicySource: Send + Sync {
    /// Retention window in days for `org_id`, falling back to the global
    /// default when the organization has no override (or none is given).
    fn window_days(&self, org_id: Option<&str>) -> u32;

    /// Whether scheduled purge runs may delete this organization's records
    /// without an explicit operator request.
    fn auto_purge(&self, org_id: Option<&str>) -> bool;

    /// The token written over scrubbed `reasoning` text.
    fn redaction_token(&self) -> &str;
}

/// Supplies the symmetric key the export signer HMACs lines with.
///
/// An offline party holding the same key can verify exported lines without
/// database access.
pub trait SigningKeyProvider: Send + Sync {
    /// The raw key bytes. Fails when no key is configured — export must
    /// never fall back to an empty or hardcoded key.
    fn signing_key(&self) -> LedgerResult<Vec<u8>>;
}
