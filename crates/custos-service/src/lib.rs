//! # custos-service
//!
//! The wiring layer: one `LedgerService` owning the recorder, verifier,
//! retention manager, and export signer over a shared store. This is the
//! surface the routing/API layer consumes; transport and authorization
//! live above it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use custos_contracts::{
    error::LedgerResult,
    query::RecordFilter,
    record::{DecisionInput, DecisionRecord},
    report::VerificationReport,
};
use custos_core::traits::{LedgerStore, RetentionPolicySource, SigningKeyProvider};
use custos_export::{ExportFormat, ExportSigner};
use custos_ledger::HashChainRecorder;
use custos_retention::{PurgeOutcome, RedactionOutcome, RetentionManager};
use custos_verify::ChainVerifier;

/// Parameters of a combined retention run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionRun {
    /// Restrict the run to one organization; `None` runs tenant-wide.
    pub org_id: Option<String>,
    /// Purge window override; `None` uses the organization's policy.
    pub days: Option<u32>,
    /// Count candidates without deleting or rewriting anything.
    pub dry_run: bool,
    /// Also redact free-text reasoning on aged records.
    pub redact: bool,
    /// Redaction window override; `None` uses the purge window.
    pub redact_days: Option<u32>,
}

/// Result of a combined retention run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionRunOutcome {
    pub purge: PurgeOutcome,
    pub redaction: Option<RedactionOutcome>,
}

/// The custos ledger, assembled.
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    recorder: HashChainRecorder,
    verifier: ChainVerifier,
    retention: RetentionManager,
    signer: ExportSigner,
}

impl LedgerService {
    /// Wire the engines over one store, policy source, and signing key.
    ///
    /// Fails only when the signing key is unavailable — the ledger should
    /// refuse to start half-configured rather than fail on first export.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        policy: Arc<dyn RetentionPolicySource>,
        keys: &dyn SigningKeyProvider,
    ) -> LedgerResult<Self> {
        Ok(Self {
            recorder: HashChainRecorder::new(store.clone()),
            verifier: ChainVerifier::new(store.clone()),
            retention: RetentionManager::new(store.clone(), policy),
            signer: ExportSigner::new(store.clone(), keys)?,
            store,
        })
    }

    /// Durably record one decision; returns the scope's new chain tip.
    pub fn record(&self, input: DecisionInput) -> LedgerResult<String> {
        self.recorder.append(input)
    }

    /// Best-effort variant for the decision-issuing hot path: failures are
    /// logged, never raised.
    pub fn record_best_effort(&self, input: DecisionInput) -> Option<String> {
        self.recorder.append_best_effort(input)
    }

    /// One page of matching records, newest first.
    pub fn list(
        &self,
        filter: &RecordFilter,
        page: usize,
        limit: usize,
    ) -> LedgerResult<Vec<DecisionRecord>> {
        self.store.list(filter, page, limit)
    }

    /// Stream matching records as signed export lines.
    pub fn export(
        &self,
        filter: &RecordFilter,
        format: ExportFormat,
        offset: usize,
        limit: Option<usize>,
    ) -> LedgerResult<impl Iterator<Item = LedgerResult<String>> + '_> {
        self.signer.stream(filter, format, offset, limit)
    }

    /// Verify the chains covering the matching records.
    pub fn verify(
        &self,
        filter: &RecordFilter,
        limit: Option<usize>,
    ) -> LedgerResult<VerificationReport> {
        self.verifier.verify(filter, limit)
    }

    /// Count purge candidates without touching anything.
    pub fn retention_preview(
        &self,
        org_id: Option<&str>,
        days: Option<u32>,
    ) -> LedgerResult<u64> {
        self.retention.preview(org_id, days)
    }

    /// Run purge and, optionally, redaction in one pass.
    ///
    /// Redaction runs after purge so records that were just deleted are
    /// not pointlessly rewritten first.
    pub fn retention_run(&self, run: &RetentionRun) -> LedgerResult<RetentionRunOutcome> {
        let org_id = run.org_id.as_deref();
        let purge = self.retention.purge(org_id, run.days, run.dry_run)?;

        let redaction = if run.redact {
            let redact_days = run
                .redact_days
                .or(run.days)
                .unwrap_or_else(|| self.retention.window_days(org_id));
            Some(self.retention.redact(org_id, redact_days, run.dry_run)?)
        } else {
            None
        };

        Ok(RetentionRunOutcome { purge, redaction })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use custos_contracts::{
        query::RecordFilter,
        record::{Decision, DecisionInput, DecisionRecord, RecordId},
        scope::ScopeFields,
    };
    use custos_core::traits::LedgerStore;
    use custos_export::{verify_line, ExportFormat, StaticKeyProvider};
    use custos_ledger::{hash_record, InMemoryLedgerStore};
    use custos_retention::TomlRetentionPolicy;

    use super::{LedgerService, RetentionRun};

    const KEY: &[u8] = b"service-test-key";

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn service() -> (Arc<InMemoryLedgerStore>, LedgerService) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let policy = Arc::new(
            TomlRetentionPolicy::from_toml_str(
                "[defaults]\nretention_days = 30\n",
            )
            .unwrap(),
        );
        let svc = LedgerService::new(store.clone(), policy, &StaticKeyProvider::new(KEY)).unwrap();
        (store, svc)
    }

    fn make_input(org: &str) -> DecisionInput {
        let mut metadata = serde_json::Map::new();
        metadata.insert("reasoning".to_string(), json!("matched policy rule"));
        DecisionInput {
            scope: ScopeFields {
                org_id: Some(org.to_string()),
                ..ScopeFields::default()
            },
            content_type: "chat_message".to_string(),
            decision: Decision::Escalate,
            confidence: Some(0.6),
            applied_filters: vec!["self_harm".to_string()],
            request_hash: None,
            metadata,
        }
    }

    /// Insert a backdated record directly, for retention paths.
    fn seed_aged(store: &InMemoryLedgerStore, org: &str, age_days: i64) {
        let mut metadata = serde_json::Map::new();
        metadata.insert("reasoning".to_string(), json!("aged"));
        let mut record = DecisionRecord {
            id: RecordId::new(),
            scope: ScopeFields {
                org_id: Some(org.to_string()),
                ..ScopeFields::default()
            },
            content_type: "chat_message".to_string(),
            decision: Decision::Block,
            confidence: None,
            applied_filters: vec![],
            request_hash: None,
            prev_hash: None,
            record_hash: String::new(),
            created_at: Utc::now() - Duration::days(age_days),
            seq: 0,
            metadata,
        };
        record.record_hash = hash_record(&record).unwrap();
        store.insert(record).unwrap();
    }

    // ── End to end ───────────────────────────────────────────────────────────

    /// Record, list, verify, and export work through one assembled service.
    #[test]
    fn record_verify_export_round_trip() {
        let (_, svc) = service();
        for _ in 0..3 {
            svc.record(make_input("acme")).unwrap();
        }

        let page = svc.list(&RecordFilter::for_org("acme"), 0, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at >= page[1].created_at, "newest first");

        let report = svc.verify(&RecordFilter::for_org("acme"), None).unwrap();
        assert!(report.valid);
        assert_eq!(report.scanned, 3);

        let lines: Vec<String> = svc
            .export(&RecordFilter::for_org("acme"), ExportFormat::Ndjson, 0, None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert!(verify_line(KEY, line).unwrap());
        }
    }

    /// A combined dry run reports candidates for both passes and changes
    /// nothing.
    #[test]
    fn retention_run_dry_run_is_side_effect_free() {
        let (store, svc) = service();
        seed_aged(&store, "acme", 60);
        seed_aged(&store, "acme", 45);
        svc.record(make_input("acme")).unwrap();

        let outcome = svc
            .retention_run(&RetentionRun {
                org_id: Some("acme".to_string()),
                dry_run: true,
                redact: true,
                ..RetentionRun::default()
            })
            .unwrap();

        assert_eq!(outcome.purge.candidates, 2);
        assert_eq!(outcome.purge.purged, 0);
        let redaction = outcome.redaction.unwrap();
        assert_eq!(redaction.candidates, 2);
        assert_eq!(redaction.redacted, 0);
        assert_eq!(store.len(), 3);
    }

    /// Purge with a longer redaction window: old rows go, middle-aged rows
    /// get scrubbed, fresh rows stay intact and the chain still verifies.
    #[test]
    fn retention_run_purges_then_redacts() {
        let (store, svc) = service();
        seed_aged(&store, "acme", 60); // purged (past 30-day window)
        seed_aged(&store, "acme", 10); // redacted (past 7-day redaction window)
        svc.record(make_input("acme")).unwrap(); // untouched

        let outcome = svc
            .retention_run(&RetentionRun {
                org_id: Some("acme".to_string()),
                redact: true,
                redact_days: Some(7),
                ..RetentionRun::default()
            })
            .unwrap();

        assert_eq!(outcome.purge.purged, 1);
        assert_eq!(outcome.redaction.unwrap().redacted, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(svc.retention_preview(Some("acme"), None).unwrap(), 0);

        // Redacted records read as expected divergence, not tampering.
        let report = svc.verify(&RecordFilter::for_org("acme"), None).unwrap();
        assert!(report.valid);
        assert_eq!(report.redacted, 1);
    }
}
