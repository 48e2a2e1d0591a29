//! Purge and redaction over aged ledger records.
//!
//! Retention legitimately mutates an append-only, hashed ledger, so every
//! effect here is deliberate and narrow:
//!
//! - **purge** deletes whole rows past the retention window, no tombstones.
//!   The surviving successor of a purged record keeps a `prev_hash` that no
//!   longer resolves — the verifier reports it as a boundary mismatch. That
//!   is accepted collateral of hard deletion, documented here rather than
//!   hidden.
//! - **redact** scrubs only the free-text `reasoning` metadata and flags
//!   the record, which the verifier treats as expected divergence.
//!
//! Both run in chunks committed one at a time, so a mid-batch failure stops
//! further damage without corrupting chunks already committed. Both honor
//! `dry_run`. Policy (window lengths, auto-purge) is read-only input.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use custos_contracts::{
    error::LedgerResult,
    query::RecordFilter,
    record::{DecisionRecord, RecordId},
};
use custos_core::traits::{LedgerStore, RetentionPolicySource};

/// Records mutated or deleted per committed chunk.
pub const RETENTION_CHUNK: usize = 500;

/// Result of one purge pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    /// Rows actually deleted (0 on dry runs).
    pub purged: u64,
    /// Rows that matched the cutoff.
    pub candidates: u64,
}

/// Result of one redaction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionOutcome {
    /// Rows actually rewritten (0 on dry runs).
    pub redacted: u64,
    /// Rows that still needed redaction.
    pub candidates: u64,
}

/// Applies an organization's retention policy to the ledger.
pub struct RetentionManager {
    store: Arc<dyn LedgerStore>,
    policy: Arc<dyn RetentionPolicySource>,
}

impl RetentionManager {
    pub fn new(store: Arc<dyn LedgerStore>, policy: Arc<dyn RetentionPolicySource>) -> Self {
        Self { store, policy }
    }

    /// Count purge candidates without touching anything.
    ///
    /// `days` overrides the organization's policy window when given.
    pub fn preview(&self, org_id: Option<&str>, days: Option<u32>) -> LedgerResult<u64> {
        let cutoff = self.cutoff(org_id, days);
        Ok(self.candidates(org_id, cutoff)?.len() as u64)
    }

    /// Delete records older than the retention window.
    ///
    /// Hard delete: purged rows leave no tombstone, and a surviving
    /// successor that pointed at a purged tip will verify with a boundary
    /// mismatch from then on.
    pub fn purge(
        &self,
        org_id: Option<&str>,
        days: Option<u32>,
        dry_run: bool,
    ) -> LedgerResult<PurgeOutcome> {
        let cutoff = self.cutoff(org_id, days);
        let candidates = self.candidates(org_id, cutoff)?;
        let total = candidates.len() as u64;

        if dry_run {
            debug!(org_id, candidates = total, %cutoff, "purge dry run");
            return Ok(PurgeOutcome {
                purged: 0,
                candidates: total,
            });
        }

        let ids: Vec<RecordId> = candidates.into_iter().map(|r| r.id).collect();
        let mut purged: u64 = 0;
        for chunk in ids.chunks(RETENTION_CHUNK) {
            purged += self.store.delete(chunk)?;
            info!(org_id, purged, candidates = total, "purge chunk committed");
        }

        Ok(PurgeOutcome {
            purged,
            candidates: total,
        })
    }

    /// Scrub the free-text `reasoning` metadata of records older than
    /// `redact_days`, flagging each with `redacted` / `redacted_at`.
    ///
    /// Idempotent: a record already flagged and carrying no residual
    /// reasoning text is not a candidate on re-runs.
    pub fn redact(
        &self,
        org_id: Option<&str>,
        redact_days: u32,
        dry_run: bool,
    ) -> LedgerResult<RedactionOutcome> {
        let cutoff = Utc::now() - Duration::days(i64::from(redact_days));
        let token = self.policy.redaction_token().to_string();

        let candidates: Vec<DecisionRecord> = self
            .candidates(org_id, cutoff)?
            .into_iter()
            .filter(|r| needs_redaction(r, &token))
            .collect();
        let total = candidates.len() as u64;

        if dry_run {
            debug!(org_id, candidates = total, %cutoff, "redaction dry run");
            return Ok(RedactionOutcome {
                redacted: 0,
                candidates: total,
            });
        }

        let mut redacted: u64 = 0;
        for chunk in candidates.chunks(RETENTION_CHUNK) {
            for record in chunk {
                let mut metadata = record.metadata.clone();
                if metadata.contains_key("reasoning") {
                    metadata.insert("reasoning".to_string(), json!(token));
                }
                metadata.insert("redacted".to_string(), json!(true));
                metadata.insert(
                    "redacted_at".to_string(),
                    json!(Utc::now().to_rfc3339()),
                );
                self.store.set_metadata(&record.id, metadata)?;
                redacted += 1;
            }
            info!(org_id, redacted, candidates = total, "redaction chunk committed");
        }

        Ok(RedactionOutcome {
            redacted,
            candidates: total,
        })
    }

    /// Whether policy allows scheduled purge for this organization.
    pub fn auto_purge_enabled(&self, org_id: Option<&str>) -> bool {
        self.policy.auto_purge(org_id)
    }

    /// The policy retention window for this organization, in days.
    pub fn window_days(&self, org_id: Option<&str>) -> u32 {
        self.policy.window_days(org_id)
    }

    fn cutoff(&self, org_id: Option<&str>, days: Option<u32>) -> DateTime<Utc> {
        let days = days.unwrap_or_else(|| self.policy.window_days(org_id));
        Utc::now() - Duration::days(i64::from(days))
    }

    fn candidates(
        &self,
        org_id: Option<&str>,
        cutoff: DateTime<Utc>,
    ) -> LedgerResult<Vec<DecisionRecord>> {
        let filter = RecordFilter {
            org_id: org_id.map(str::to_string),
            to: Some(cutoff),
            ..RecordFilter::default()
        };
        self.store.scan(&filter, None)
    }
}

/// A record needs redaction unless it is already flagged *and* carries no
/// residual free-text reasoning.
fn needs_redaction(record: &DecisionRecord, token: &str) -> bool {
    let reasoning_pending = record
        .metadata
        .get("reasoning")
        .and_then(|v| v.as_str())
        .map(|s| s != token)
        .unwrap_or(false);
    !record.is_redacted() || reasoning_pending
}
