//! # custos-ledger
//!
//! Canonical hashing and the per-scope hash-chain write path of the custos
//! audit ledger.
//!
//! ## Overview
//!
//! Every automated safety decision the upstream moderation component makes
//! is appended here as a `DecisionRecord` whose `record_hash` commits to
//! the record's full canonical content plus the previous tip of its scope's
//! chain. Tampering with any stored field changes the recomputed hash and
//! is detected by the verifier in custos-verify.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use custos_ledger::{HashChainRecorder, InMemoryLedgerStore};
//!
//! let store = Arc::new(InMemoryLedgerStore::new());
//! let recorder = HashChainRecorder::new(store.clone());
//! let tip = recorder.append(input)?;
//! ```

pub mod canonical;
pub mod chain;
pub mod memory;
pub mod recorder;

pub use canonical::{canonical_json, hash_input};
pub use chain::{hash_record, request_fingerprint, MAX_FINGERPRINT_TEXT};
pub use memory::InMemoryLedgerStore;
pub use recorder::HashChainRecorder;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use custos_contracts::{
        error::{LedgerError, LedgerResult},
        query::RecordFilter,
        record::{Decision, DecisionInput, DecisionRecord, RecordId},
        scope::{ScopeFields, ScopeKey, ScopeKind},
    };
    use custos_core::traits::LedgerStore;

    use super::{
        canonical_json, hash_record, request_fingerprint, HashChainRecorder,
        InMemoryLedgerStore, MAX_FINGERPRINT_TEXT,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a minimal input scoped to `org`.
    fn make_input(org: Option<&str>, reasoning: &str) -> DecisionInput {
        let mut metadata = serde_json::Map::new();
        metadata.insert("reasoning".to_string(), json!(reasoning));
        DecisionInput {
            scope: ScopeFields {
                org_id: org.map(str::to_string),
                ..ScopeFields::default()
            },
            content_type: "chat_message".to_string(),
            decision: Decision::Block,
            confidence: Some(0.97),
            applied_filters: vec!["toxicity".to_string(), "pii".to_string()],
            request_hash: None,
            metadata,
        }
    }

    /// Build a full record directly, bypassing the recorder.
    fn make_record(org: &str, age_minutes: i64) -> DecisionRecord {
        let mut record = DecisionRecord {
            id: RecordId::new(),
            scope: ScopeFields {
                org_id: Some(org.to_string()),
                ..ScopeFields::default()
            },
            content_type: "chat_message".to_string(),
            decision: Decision::Allow,
            confidence: None,
            applied_filters: vec![],
            request_hash: None,
            prev_hash: None,
            record_hash: String::new(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
            seq: 0,
            metadata: serde_json::Map::new(),
        };
        record.record_hash = hash_record(&record).unwrap();
        record
    }

    /// A store whose every operation fails, for best-effort path tests.
    struct FailingStore;

    impl LedgerStore for FailingStore {
        fn insert(&self, _record: DecisionRecord) -> LedgerResult<u64> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
        fn tip(&self, _scope: &ScopeKey) -> LedgerResult<Option<String>> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
        fn tip_before(
            &self,
            _scope: &ScopeKey,
            _before: chrono::DateTime<Utc>,
            _before_seq: u64,
        ) -> LedgerResult<Option<String>> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
        fn scan(
            &self,
            _filter: &RecordFilter,
            _limit: Option<usize>,
        ) -> LedgerResult<Vec<DecisionRecord>> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
        fn list(
            &self,
            _filter: &RecordFilter,
            _page: usize,
            _limit: usize,
        ) -> LedgerResult<Vec<DecisionRecord>> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
        fn delete(&self, _ids: &[RecordId]) -> LedgerResult<u64> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
        fn set_metadata(
            &self,
            _id: &RecordId,
            _metadata: serde_json::Map<String, serde_json::Value>,
        ) -> LedgerResult<()> {
            Err(LedgerError::Storage {
                reason: "store offline".to_string(),
            })
        }
    }

    // ── Canonicalization ─────────────────────────────────────────────────────

    /// Object keys come out sorted at every nesting level, compact form.
    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let value = json!({
            "zebra": 1,
            "alpha": { "delta": [1, 2], "beta": null },
            "mid": "text"
        });
        assert_eq!(
            canonical_json(&value),
            r#"{"alpha":{"beta":null,"delta":[1,2]},"mid":"text","zebra":1}"#
        );
    }

    /// Hashing is independent of metadata insertion order.
    #[test]
    fn hash_ignores_metadata_insertion_order() {
        let mut a = make_record("acme", 0);
        a.metadata.insert("x".to_string(), json!(1));
        a.metadata.insert("y".to_string(), json!(2));

        let mut b = a.clone();
        b.metadata = serde_json::Map::new();
        b.metadata.insert("y".to_string(), json!(2));
        b.metadata.insert("x".to_string(), json!(1));

        assert_eq!(hash_record(&a).unwrap(), hash_record(&b).unwrap());
    }

    /// Hashing the same record twice yields the same hash.
    #[test]
    fn hash_is_deterministic() {
        let record = make_record("acme", 0);
        assert_eq!(hash_record(&record).unwrap(), hash_record(&record).unwrap());
        assert_eq!(record.record_hash.len(), 64);
    }

    /// The stored hash ignores `record_hash` and `seq`.
    #[test]
    fn hash_excludes_self_and_seq() {
        let record = make_record("acme", 0);
        let mut relabeled = record.clone();
        relabeled.record_hash = "f".repeat(64);
        relabeled.seq = 42;
        assert_eq!(
            hash_record(&record).unwrap(),
            hash_record(&relabeled).unwrap()
        );
    }

    // ── Recorder ─────────────────────────────────────────────────────────────

    /// Three appends to one org produce a null → H1 → H2 prev_hash chain.
    #[test]
    fn append_extends_chain() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let recorder = HashChainRecorder::new(store.clone());

        let h1 = recorder.append(make_input(Some("acme"), "first")).unwrap();
        let h2 = recorder.append(make_input(Some("acme"), "second")).unwrap();
        let h3 = recorder.append(make_input(Some("acme"), "third")).unwrap();

        let records = store.scan(&RecordFilter::for_org("acme"), None).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].prev_hash, None);
        assert_eq!(records[0].record_hash, h1);
        assert_eq!(records[1].prev_hash.as_deref(), Some(h1.as_str()));
        assert_eq!(records[1].record_hash, h2);
        assert_eq!(records[2].prev_hash.as_deref(), Some(h2.as_str()));
        assert_eq!(records[2].record_hash, h3);

        // The stored hash matches a fresh recomputation.
        for record in &records {
            assert_eq!(hash_record(record).unwrap(), record.record_hash);
        }
    }

    /// Interleaved appends to two orgs form two independent chains.
    #[test]
    fn scopes_chain_independently() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let recorder = HashChainRecorder::new(store.clone());

        let a1 = recorder.append(make_input(Some("acme"), "a1")).unwrap();
        let b1 = recorder.append(make_input(Some("globex"), "b1")).unwrap();
        recorder.append(make_input(Some("acme"), "a2")).unwrap();
        recorder.append(make_input(Some("globex"), "b2")).unwrap();

        let acme = store.scan(&RecordFilter::for_org("acme"), None).unwrap();
        let globex = store.scan(&RecordFilter::for_org("globex"), None).unwrap();

        assert_eq!(acme.len(), 2);
        assert_eq!(globex.len(), 2);
        assert_eq!(acme[1].prev_hash.as_deref(), Some(a1.as_str()));
        assert_eq!(globex[1].prev_hash.as_deref(), Some(b1.as_str()));
        // A record in one scope never links into the other.
        assert_ne!(acme[1].prev_hash, globex[1].prev_hash);
    }

    /// Records with no scope fields share the explicit unscoped chain.
    #[test]
    fn unscoped_records_share_fallback_chain() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let recorder = HashChainRecorder::new(store.clone());

        let h1 = recorder.append(make_input(None, "one")).unwrap();
        recorder.append(make_input(None, "two")).unwrap();

        let records = store.scan(&RecordFilter::default(), None).unwrap();
        assert_eq!(records[0].scope_key().kind, ScopeKind::None);
        assert_eq!(records[1].prev_hash.as_deref(), Some(h1.as_str()));
    }

    /// Out-of-range confidence is rejected before any write.
    #[test]
    fn append_rejects_invalid_confidence() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let recorder = HashChainRecorder::new(store.clone());

        for bad in [1.5, -0.1, f64::NAN] {
            let mut input = make_input(Some("acme"), "bad");
            input.confidence = Some(bad);
            let err = recorder.append(input).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidInput { .. }));
        }
        assert!(store.is_empty(), "rejected appends must not write");
    }

    /// Concurrent appends to one scope serialize instead of forking: every
    /// append observes a distinct tip, so no two records share a prev_hash.
    #[test]
    fn concurrent_appends_do_not_fork_the_chain() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let recorder = Arc::new(HashChainRecorder::new(store.clone()));

        let mut handles = Vec::new();
        for t in 0..8 {
            let recorder = recorder.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    recorder
                        .append(make_input(Some("acme"), &format!("writer {t} record {i}")))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let records = store.scan(&RecordFilter::for_org("acme"), None).unwrap();
        assert_eq!(records.len(), 200);

        let tips: std::collections::HashSet<Option<String>> =
            records.iter().map(|r| r.prev_hash.clone()).collect();
        assert_eq!(
            tips.len(),
            records.len(),
            "two appends observed the same tip: the chain forked"
        );
    }

    /// Best-effort append swallows storage failures instead of raising.
    #[test]
    fn best_effort_append_swallows_storage_failure() {
        let recorder = HashChainRecorder::new(Arc::new(FailingStore));
        assert_eq!(
            recorder.append_best_effort(make_input(Some("acme"), "x")),
            None
        );

        let healthy = HashChainRecorder::new(Arc::new(InMemoryLedgerStore::new()));
        assert!(healthy
            .append_best_effort(make_input(Some("acme"), "x"))
            .is_some());
    }

    // ── Fingerprinting ───────────────────────────────────────────────────────

    /// Text beyond the truncation bound does not change the fingerprint.
    #[test]
    fn fingerprint_truncates_long_text() {
        let base = "x".repeat(MAX_FINGERPRINT_TEXT);
        let longer = format!("{base}and more that gets cut");

        let a = request_fingerprint(&base, None, "chat_message", Some("s-1"), &[]);
        let b = request_fingerprint(&longer, None, "chat_message", Some("s-1"), &[]);
        assert_eq!(a, b);

        // Differences inside the bound do change it.
        let c = request_fingerprint("different", None, "chat_message", Some("s-1"), &[]);
        assert_ne!(a, c);
    }

    /// Adjacent segments cannot be confused for one another.
    #[test]
    fn fingerprint_separates_segments() {
        let a = request_fingerprint("ab", Some("c"), "t", None, &[]);
        let b = request_fingerprint("a", Some("bc"), "t", None, &[]);
        assert_ne!(a, b);
    }

    // ── Store ordering ───────────────────────────────────────────────────────

    /// tip_before picks the latest record strictly before the given point.
    #[test]
    fn tip_before_bridges_history() {
        let store = InMemoryLedgerStore::new();
        let old = make_record("acme", 60);
        let mid = make_record("acme", 30);
        let new = make_record("acme", 0);
        let old_hash = old.record_hash.clone();
        let mid_hash = mid.record_hash.clone();

        store.insert(old).unwrap();
        store.insert(mid).unwrap();
        let new_at = new.created_at;
        let new_seq = store.insert(new).unwrap();

        let scope = ScopeKey {
            kind: ScopeKind::Org,
            value: Some("acme".to_string()),
        };
        assert_eq!(
            store.tip_before(&scope, new_at, new_seq).unwrap().as_deref(),
            Some(mid_hash.as_str())
        );
        // Before the middle record, the oldest is the tip.
        let records = store.scan(&RecordFilter::default(), None).unwrap();
        assert_eq!(
            store
                .tip_before(&scope, records[1].created_at, records[1].seq)
                .unwrap()
                .as_deref(),
            Some(old_hash.as_str())
        );
        // Nothing precedes the first record.
        assert_eq!(
            store
                .tip_before(&scope, records[0].created_at, records[0].seq)
                .unwrap(),
            None
        );
    }

    /// list pages newest-first; scan streams oldest-first.
    #[test]
    fn list_pages_descending() {
        let store = InMemoryLedgerStore::new();
        for age in [50, 40, 30, 20, 10] {
            store.insert(make_record("acme", age)).unwrap();
        }

        let page0 = store.list(&RecordFilter::default(), 0, 2).unwrap();
        let page1 = store.list(&RecordFilter::default(), 1, 2).unwrap();
        assert_eq!(page0.len(), 2);
        assert!(page0[0].created_at > page0[1].created_at);
        assert!(page0[1].created_at > page1[0].created_at);

        let all = store.scan(&RecordFilter::default(), None).unwrap();
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
