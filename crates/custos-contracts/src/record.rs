//! Decision record types.
//!
//! `DecisionInput` is what the upstream moderation component hands to the
//! recorder. `DecisionRecord` is the stored row — the input plus the
//! identity, chain, and timestamp fields the ledger assigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scope::{ScopeFields, ScopeKey};

/// Globally unique identifier of a ledger record.
///
/// Assigned at append time, immutable thereafter. Appears in verification
/// breaks and export lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub uuid::Uuid);

impl RecordId {
    /// Create a new, unique record ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The automated safety decision taken on a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// The content was passed through unchanged.
    Allow,
    /// The content was rejected.
    Block,
    /// The content was altered (e.g. redacted or rewritten) before delivery.
    Modify,
    /// The content was routed to human review.
    Escalate,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Allow => "allow",
            Decision::Block => "block",
            Decision::Modify => "modify",
            Decision::Escalate => "escalate",
        };
        f.write_str(s)
    }
}

impl Default for Decision {
    fn default() -> Self {
        Decision::Allow
    }
}

/// Everything the upstream decision producer supplies for one append.
///
/// The ledger validates `confidence` and resolves the scope; it never
/// inspects `metadata` beyond serializing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Identity fields; the highest-priority populated one keys the chain.
    #[serde(flatten)]
    pub scope: ScopeFields,

    /// Category of the moderated content. Free-form contract, not a closed
    /// enum — producers introduce new categories without a ledger change.
    pub content_type: String,

    /// The decision taken.
    pub decision: Decision,

    /// Producer confidence in [0, 1], when the producer reports one.
    pub confidence: Option<f64>,

    /// Ordered list of filter identifiers that contributed to the decision.
    pub applied_filters: Vec<String>,

    /// Caller-computed hash over the evaluated content. Distinct from the
    /// ledger's own integrity hash; see `request_fingerprint` in
    /// custos-ledger for the reference construction.
    pub request_hash: Option<String>,

    /// Free-form key/value map; may carry a free-text `reasoning` field,
    /// which the retention manager's redaction path scrubs.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// One stored row of the ledger — the only entity the ledger persists.
///
/// Append-only: every field except `metadata` is immutable once written.
/// `metadata` is rewritten only by the retention manager's redaction path,
/// which intentionally diverges the stored `record_hash` from a fresh
/// recomputation (the verifier exempts records flagged `redacted`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Ledger-assigned unique identifier.
    pub id: RecordId,

    /// Identity fields, retained verbatim for filtering.
    #[serde(flatten)]
    pub scope: ScopeFields,

    /// Category of the moderated content.
    pub content_type: String,

    /// The decision taken.
    pub decision: Decision,

    /// Producer confidence in [0, 1].
    pub confidence: Option<f64>,

    /// Ordered filter identifiers. Order is significant and hashed.
    pub applied_filters: Vec<String>,

    /// Caller-computed content fingerprint.
    pub request_hash: Option<String>,

    /// `record_hash` of the chain tip this record extended, or `None` for
    /// the first record in its scope.
    pub prev_hash: Option<String>,

    /// Lowercase hex SHA-256 over the canonical form of every field above
    /// plus `created_at` and `metadata`. Never includes itself or `seq`.
    pub record_hash: String,

    /// Insertion timestamp; the chain's total order within a scope.
    pub created_at: DateTime<Utc>,

    /// Store-assigned insertion ordinal. Used only to break ties between
    /// identical `created_at` values; excluded from the hash because the
    /// store assigns it after the hash is computed.
    pub seq: u64,

    /// Free-form metadata. After redaction carries `redacted: true`,
    /// `redacted_at`, and a scrubbed `reasoning`.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DecisionRecord {
    /// Resolve this record's chain key.
    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey::resolve(&self.scope)
    }

    /// True if the retention manager has redacted this record.
    ///
    /// Redacted records are exempt from the verifier's self-consistency
    /// check; their stored `record_hash` still anchors their successors.
    pub fn is_redacted(&self) -> bool {
        self.metadata
            .get("redacted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
