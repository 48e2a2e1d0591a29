//! Chain verification engine.
//!
//! `ChainVerifier` replays matching records in chain order and checks the
//! two chain rules for every record:
//!
//! 1. **Self-consistency** — the stored `record_hash` matches a fresh
//!    recomputation over the record's canonical form.
//! 2. **Linkage** — the stored `prev_hash` matches the hash of the record's
//!    actual predecessor in the same scope.
//!
//! The scan may be windowed (a time-range or attribute filter); the first
//! time a scope appears in the scan, the expected predecessor is fetched
//! from the store's full history (`tip_before`), so verifying "the last 30
//! days" still detects a broken link back to day 31.
//!
//! Findings accumulate — the caller receives the full damage picture in one
//! structured report, never an error. Records flagged
//! `metadata.redacted == true` are expected to fail rule 1 (redaction
//! rewrites hashed metadata) and are counted separately instead of
//! reported as breaks; their stored hash still anchors their successors.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use custos_contracts::{
    error::LedgerResult,
    query::RecordFilter,
    report::{BreakKind, ChainBreak, ChainSummary, VerificationReport},
};
use custos_core::traits::LedgerStore;
use custos_ledger::hash_record;

/// The custos chain verifier.
///
/// Read-only: safe to run concurrently with writers. A run observes the
/// store's point-in-time snapshot and reports on fully-committed records.
pub struct ChainVerifier {
    store: Arc<dyn LedgerStore>,
}

impl ChainVerifier {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Verify every record matching `filter`, up to `limit` records.
    ///
    /// Scans in ascending `(created_at, seq)` order — the same total order
    /// the recorder appends in — and checks both chain rules per record.
    pub fn verify(
        &self,
        filter: &RecordFilter,
        limit: Option<usize>,
    ) -> LedgerResult<VerificationReport> {
        let records = self.store.scan(filter, limit)?;
        debug!(scanned = records.len(), "chain verification started");

        // Last stored hash seen per chain key during this scan.
        let mut last_hash: HashMap<String, String> = HashMap::new();
        // BTreeMap so the report's chain summaries come out key-sorted.
        let mut chains: BTreeMap<String, ChainSummary> = BTreeMap::new();
        let mut breaks: Vec<ChainBreak> = Vec::new();
        let mut redacted: u64 = 0;

        for record in &records {
            let scope = record.scope_key();
            let chain_key = scope.chain_key();
            let first_seen = !last_hash.contains_key(&chain_key);

            let summary = chains.entry(chain_key.clone()).or_insert(ChainSummary {
                scope: scope.kind,
                key: scope.value.clone(),
                count: 0,
                breaks: 0,
            });
            summary.count += 1;

            // Rule 1: self-consistency. Redacted records diverge by design;
            // count them, do not report them.
            if record.is_redacted() {
                redacted += 1;
            } else {
                let finding = match hash_record(record) {
                    Ok(expected) if expected == record.record_hash => None,
                    Ok(expected) => Some(Some(expected)),
                    // A stored record that no longer canonicalizes is damage,
                    // not an operational error — report it as a break.
                    Err(e) => {
                        warn!(record_id = %record.id, error = %e, "stored record failed to canonicalize");
                        Some(None)
                    }
                };
                if let Some(expected) = finding {
                    warn!(
                        record_id = %record.id,
                        chain_key = %chain_key,
                        "record hash mismatch"
                    );
                    breaks.push(ChainBreak {
                        kind: BreakKind::RecordHashMismatch,
                        record_id: record.id.clone(),
                        scope: chain_key.clone(),
                        expected,
                        actual: Some(record.record_hash.clone()),
                        created_at: record.created_at,
                    });
                    summary.breaks += 1;
                }
            }

            // Rule 2: linkage. On the scope's first appearance in this scan,
            // bridge back to full history through the store.
            let expected_prev = if first_seen {
                self.store
                    .tip_before(&scope, record.created_at, record.seq)?
            } else {
                last_hash.get(&chain_key).cloned()
            };

            if record.prev_hash != expected_prev {
                let kind = if first_seen {
                    BreakKind::PrevLinkMismatchDb
                } else {
                    BreakKind::PrevLinkMismatch
                };
                warn!(
                    record_id = %record.id,
                    chain_key = %chain_key,
                    ?kind,
                    "previous-link mismatch"
                );
                breaks.push(ChainBreak {
                    kind,
                    record_id: record.id.clone(),
                    scope: chain_key.clone(),
                    expected: expected_prev,
                    actual: record.prev_hash.clone(),
                    created_at: record.created_at,
                });
                if let Some(summary) = chains.get_mut(&chain_key) {
                    summary.breaks += 1;
                }
            }

            // Linkage expectations always advance on the *stored* hash, so
            // one corrupt record does not cascade spurious breaks onto every
            // successor.
            last_hash.insert(chain_key, record.record_hash.clone());
        }

        let report = VerificationReport {
            valid: breaks.is_empty(),
            scanned: records.len() as u64,
            redacted,
            breaks,
            chains: chains.into_values().collect(),
        };

        debug!(
            valid = report.valid,
            scanned = report.scanned,
            breaks = report.breaks.len(),
            chains = report.chains.len(),
            "chain verification complete"
        );

        Ok(report)
    }
}
