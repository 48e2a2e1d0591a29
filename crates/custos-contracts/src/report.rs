//! Verification report types.
//!
//! The verifier never raises on a bad chain — it always returns a
//! structured `VerificationReport` and leaves remediation (alerting,
//! incident response) to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RecordId;
use crate::scope::ScopeKind;

/// The class of a verification finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    /// The stored `record_hash` does not match a fresh recomputation over
    /// the record's canonical form.
    RecordHashMismatch,
    /// The stored `prev_hash` does not match the hash of the previous
    /// record observed earlier in the same scan.
    PrevLinkMismatch,
    /// The stored `prev_hash` does not match the tip the store reports for
    /// this scope just before the scan window — the boundary case of a
    /// windowed scan.
    PrevLinkMismatchDb,
}

/// One verification finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainBreak {
    /// What kind of inconsistency was found.
    pub kind: BreakKind,
    /// The record the finding is attached to.
    pub record_id: RecordId,
    /// The chain key of the record's scope, e.g. `"org_id:acme"`.
    pub scope: String,
    /// The value the verifier expected (recomputed hash or expected
    /// previous hash). `None` means "no previous record".
    pub expected: Option<String>,
    /// The value actually stored on the record.
    pub actual: Option<String>,
    /// The record's `created_at`, for locating the damage in time.
    pub created_at: DateTime<Utc>,
}

/// Per-scope roll-up of a verification scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    /// Which field keys this chain.
    pub scope: ScopeKind,
    /// The field's value, absent for the unscoped chain.
    pub key: Option<String>,
    /// Records of this scope seen in the scan.
    pub count: u64,
    /// Breaks attributed to this scope.
    pub breaks: u64,
}

/// The result of one verification scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True when no breaks were found.
    pub valid: bool,
    /// Total records scanned.
    pub scanned: u64,
    /// Records exempted from the self-consistency check because they carry
    /// `metadata.redacted == true`. Expected divergence, never a break.
    pub redacted: u64,
    /// Every finding, in scan order.
    pub breaks: Vec<ChainBreak>,
    /// Per-scope summaries, sorted by chain key.
    pub chains: Vec<ChainSummary>,
}
