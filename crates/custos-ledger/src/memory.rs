//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` is the reference implementation of the storage
//! seam: a `Vec` of records behind a `Mutex`, with a monotonically
//! assigned insertion ordinal. It exists for tests, demos, and as the
//! executable specification of the ordering contract a real store must
//! honor. All trait methods take the one lock, so the whole store is a
//! single consistency domain — reads observe a point-in-time snapshot.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use custos_contracts::{
    error::{LedgerError, LedgerResult},
    query::RecordFilter,
    record::{DecisionRecord, RecordId},
    scope::ScopeKey,
};
use custos_core::traits::LedgerStore;

struct MemoryState {
    /// All records in insertion order.
    records: Vec<DecisionRecord>,
    /// The next insertion ordinal to assign.
    next_seq: u64,
}

/// A `Mutex<Vec<_>>`-backed ledger store.
pub struct InMemoryLedgerStore {
    state: Mutex<MemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                records: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|e| LedgerError::Storage {
            reason: format!("ledger state lock poisoned: {e}"),
        })
    }

    /// Total records currently stored.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate one stored record in place.
    ///
    /// Tamper-drill and test support only: a conforming store has no such
    /// operation. The demo uses this to corrupt a chain and show the
    /// verifier catching it.
    pub fn mutate_record(
        &self,
        id: &RecordId,
        f: impl FnOnce(&mut DecisionRecord),
    ) -> LedgerResult<()> {
        let mut state = self.lock()?;
        match state.records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                f(record);
                Ok(())
            }
            None => Err(LedgerError::Storage {
                reason: format!("no record with id {id}"),
            }),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain order within a scope: `(created_at, seq)` ascending.
fn chain_order(record: &DecisionRecord) -> (DateTime<Utc>, u64) {
    (record.created_at, record.seq)
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert(&self, mut record: DecisionRecord) -> LedgerResult<u64> {
        let mut state = self.lock()?;
        let seq = state.next_seq;
        record.seq = seq;
        state.records.push(record);
        state.next_seq += 1;
        Ok(seq)
    }

    fn tip(&self, scope: &ScopeKey) -> LedgerResult<Option<String>> {
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .filter(|r| &r.scope_key() == scope)
            .max_by_key(|r| chain_order(r))
            .map(|r| r.record_hash.clone()))
    }

    fn tip_before(
        &self,
        scope: &ScopeKey,
        before: DateTime<Utc>,
        before_seq: u64,
    ) -> LedgerResult<Option<String>> {
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .filter(|r| &r.scope_key() == scope && chain_order(r) < (before, before_seq))
            .max_by_key(|r| chain_order(r))
            .map(|r| r.record_hash.clone()))
    }

    fn scan(
        &self,
        filter: &RecordFilter,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<DecisionRecord>> {
        let state = self.lock()?;
        let mut matched: Vec<DecisionRecord> = state
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by_key(chain_order);
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn list(
        &self,
        filter: &RecordFilter,
        page: usize,
        limit: usize,
    ) -> LedgerResult<Vec<DecisionRecord>> {
        let mut matched = self.scan(filter, None)?;
        matched.reverse();
        Ok(matched
            .into_iter()
            .skip(page.saturating_mul(limit))
            .take(limit)
            .collect())
    }

    fn delete(&self, ids: &[RecordId]) -> LedgerResult<u64> {
        let doomed: HashSet<&RecordId> = ids.iter().collect();
        let mut state = self.lock()?;
        let before = state.records.len();
        state.records.retain(|r| !doomed.contains(&r.id));
        Ok((before - state.records.len()) as u64)
    }

    fn set_metadata(
        &self,
        id: &RecordId,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> LedgerResult<()> {
        let mut state = self.lock()?;
        match state.records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.metadata = metadata;
                Ok(())
            }
            None => Err(LedgerError::Storage {
                reason: format!("no record with id {id}"),
            }),
        }
    }
}
