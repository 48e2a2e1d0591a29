//! The hash-chain recorder: the ledger's single write path.
//!
//! `append` is a read-modify-write on the chain tip of one scope: look up
//! the tip, hash the new record against it, insert. The lookup and the
//! insert must execute as one serialized unit per scope — two unsynchronized
//! appends to the same scope would both observe the same tip and fork the
//! chain. A per-scope lock table provides that serialization inside one
//! process; deployments running multiple writer processes against one store
//! need the equivalent at the storage layer (e.g. a serializable
//! transaction keyed on the scope value).
//!
//! Different scopes never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use custos_contracts::{
    error::{LedgerError, LedgerResult},
    record::{DecisionInput, DecisionRecord, RecordId},
    scope::ScopeKey,
};
use custos_core::traits::LedgerStore;

use crate::chain::hash_record;

/// Appends decision records to the ledger, one hash chain per scope.
pub struct HashChainRecorder {
    store: Arc<dyn LedgerStore>,
    /// One lock per chain key, created on first use and kept for the
    /// recorder's lifetime. Scope cardinality is bounded by tenancy, not by
    /// record volume, so the table is not evicted.
    scope_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl HashChainRecorder {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            scope_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Durably append one decision, extending its scope's chain.
    ///
    /// Resolves the scope, reads the current tip under the scope's lock,
    /// computes the record hash over the canonical field set including that
    /// tip, and inserts. Returns the new `record_hash` — the scope's new
    /// tip.
    ///
    /// Fails without writing when the input is invalid (confidence outside
    /// [0, 1], non-canonicalizable content) or when storage is unavailable.
    /// Callers on a latency-sensitive decision path that must not block on
    /// audit durability use `append_best_effort` instead.
    pub fn append(&self, input: DecisionInput) -> LedgerResult<String> {
        if let Some(confidence) = input.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(LedgerError::InvalidInput {
                    reason: format!("confidence {confidence} is outside [0, 1]"),
                });
            }
        }

        let scope = ScopeKey::resolve(&input.scope);
        let chain_key = scope.chain_key();

        // Tip lookup and insert are one critical section per scope.
        let lock = self.scope_lock(&chain_key)?;
        let _guard = lock.lock().map_err(|e| LedgerError::Storage {
            reason: format!("scope lock poisoned for '{chain_key}': {e}"),
        })?;

        let prev_hash = self.store.tip(&scope)?;

        let mut record = DecisionRecord {
            id: RecordId::new(),
            scope: input.scope,
            content_type: input.content_type,
            decision: input.decision,
            confidence: input.confidence,
            applied_filters: input.applied_filters,
            request_hash: input.request_hash,
            prev_hash,
            record_hash: String::new(),
            created_at: chrono::Utc::now(),
            seq: 0,
            metadata: input.metadata,
        };
        // Reject before any write — a row is never stored with an unset
        // or partial record_hash.
        record.record_hash = hash_record(&record)?;

        let record_hash = record.record_hash.clone();
        let record_id = record.id.clone();
        let seq = self.store.insert(record)?;

        debug!(
            record_id = %record_id,
            chain_key = %chain_key,
            seq,
            record_hash = %record_hash,
            "decision appended"
        );

        Ok(record_hash)
    }

    /// Best-effort variant of `append` for the decision-issuing hot path.
    ///
    /// Failures are logged and swallowed — audit-log unavailability must
    /// not block content classification. Not read-your-write consistent:
    /// a caller that immediately queries the ledger after a `None` return
    /// will not find the record, and even after `Some` a replica store may
    /// lag. Callers needing the stronger guarantee use `append` and handle
    /// its error explicitly.
    pub fn append_best_effort(&self, input: DecisionInput) -> Option<String> {
        let chain_key = ScopeKey::resolve(&input.scope).chain_key();
        match self.append(input) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(
                    chain_key = %chain_key,
                    error = %e,
                    "best-effort audit append failed; decision proceeds unrecorded"
                );
                None
            }
        }
    }

    fn scope_lock(&self, chain_key: &str) -> LedgerResult<Arc<Mutex<()>>> {
        let mut locks = self.scope_locks.lock().map_err(|e| LedgerError::Storage {
            reason: format!("scope lock table poisoned: {e}"),
        })?;
        Ok(locks.entry(chain_key.to_string()).or_default().clone())
    }
}
