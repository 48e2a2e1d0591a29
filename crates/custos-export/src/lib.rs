//! # custos-export
//!
//! Signed audit export for the custos ledger: each matching record is
//! serialized to one NDJSON or CSV line carrying an HMAC-SHA256 signature
//! an offline party can check with nothing but the shared secret.

pub mod keys;
pub mod signer;

pub use keys::{EnvKeyProvider, StaticKeyProvider, EXPORT_KEY_ENV};
pub use signer::{verify_line, ExportFormat, ExportSigner, SignedLine, SIGNATURE_ALGORITHM};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use custos_contracts::{
        query::RecordFilter,
        record::{Decision, DecisionInput},
        scope::ScopeFields,
    };
    use custos_ledger::{HashChainRecorder, InMemoryLedgerStore};

    use super::{
        verify_line, ExportFormat, ExportSigner, SignedLine, StaticKeyProvider,
        SIGNATURE_ALGORITHM,
    };

    const KEY: &[u8] = b"test-export-secret";

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn seeded_signer(n: usize) -> (Arc<InMemoryLedgerStore>, ExportSigner) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let recorder = HashChainRecorder::new(store.clone());
        for i in 0..n {
            let mut metadata = serde_json::Map::new();
            metadata.insert("reasoning".to_string(), json!(format!("hit rule {i}")));
            recorder
                .append(DecisionInput {
                    scope: ScopeFields {
                        org_id: Some("acme".to_string()),
                        ..ScopeFields::default()
                    },
                    content_type: "chat_message".to_string(),
                    decision: Decision::Modify,
                    confidence: Some(0.75),
                    applied_filters: vec!["pii".to_string()],
                    request_hash: None,
                    metadata,
                })
                .unwrap();
        }
        let signer = ExportSigner::new(store.clone(), &StaticKeyProvider::new(KEY)).unwrap();
        (store, signer)
    }

    // ── Signing ──────────────────────────────────────────────────────────────

    /// A streamed NDJSON line verifies offline with the shared key alone.
    #[test]
    fn exported_line_verifies_offline() {
        let (_, signer) = seeded_signer(1);
        let lines: Vec<String> = signer
            .stream(&RecordFilter::default(), ExportFormat::Ndjson, 0, None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines.len(), 1);

        assert!(verify_line(KEY, &lines[0]).unwrap());
        assert!(
            !verify_line(b"wrong-key", &lines[0]).unwrap(),
            "a different key must not verify"
        );
    }

    /// Altering the embedded record invalidates the signature.
    #[test]
    fn altered_line_fails_verification() {
        let (_, signer) = seeded_signer(1);
        let line = signer
            .stream(&RecordFilter::default(), ExportFormat::Ndjson, 0, None)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();

        let mut parsed: SignedLine = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.algorithm, SIGNATURE_ALGORITHM);
        parsed.record.decision = Decision::Allow;
        let altered = serde_json::to_string(&parsed).unwrap();

        assert!(!verify_line(KEY, &altered).unwrap());
    }

    /// Garbage input is an error, not a quiet false.
    #[test]
    fn malformed_line_is_an_error() {
        assert!(verify_line(KEY, "not json").is_err());
    }

    // ── Streaming ────────────────────────────────────────────────────────────

    /// Restarting from an offset resumes exactly where the previous run
    /// stopped.
    #[test]
    fn stream_restarts_from_offset() {
        let (_, signer) = seeded_signer(5);
        let filter = RecordFilter::default();

        let all: Vec<String> = signer
            .stream(&filter, ExportFormat::Ndjson, 0, None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let resumed: Vec<String> = signer
            .stream(&filter, ExportFormat::Ndjson, 3, None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(all.len(), 5);
        assert_eq!(resumed, all[3..]);

        let limited: Vec<String> = signer
            .stream(&filter, ExportFormat::Ndjson, 0, Some(2))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(limited, all[..2]);
    }

    /// CSV rows carry the documented columns, with the signature second
    /// to last.
    #[test]
    fn csv_rows_match_declared_columns() {
        let (_, signer) = seeded_signer(2);
        let lines: Vec<String> = signer
            .stream(&RecordFilter::default(), ExportFormat::Csv, 0, None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for line in &lines {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_reader(line.as_bytes());
            let row = reader.records().next().unwrap().unwrap();
            assert_eq!(row.len(), ExportSigner::CSV_COLUMNS.len());
            assert_eq!(&row[row.len() - 1], SIGNATURE_ALGORITHM);
            assert_eq!(&row[5], "chat_message");
        }
    }

    // ── Keys ─────────────────────────────────────────────────────────────────

    /// Construction fails up front when no key is available.
    #[test]
    fn empty_key_is_rejected_at_construction() {
        let store = Arc::new(InMemoryLedgerStore::new());
        match ExportSigner::new(store, &StaticKeyProvider::new(Vec::new())) {
            Ok(_) => panic!("an empty signing key must be rejected"),
            Err(err) => assert!(err.to_string().contains("signing key")),
        }
    }
}
