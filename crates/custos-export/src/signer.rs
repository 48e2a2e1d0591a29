//! Signed export streams.
//!
//! `ExportSigner` serializes matching records one per line and attaches an
//! HMAC-SHA256 signature computed over each record's canonical JSON form.
//! The signature is independent of the hash chain: an offline party holding
//! the shared secret can check that a specific exported line was not
//! altered in transit without any database access.
//!
//! The stream is forward-only and restartable — `offset` skips already
//! delivered lines, and no server-side cursor state exists beyond the
//! query itself.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use custos_contracts::{
    error::{LedgerError, LedgerResult},
    query::RecordFilter,
    record::DecisionRecord,
};
use custos_core::traits::{LedgerStore, SigningKeyProvider};
use custos_ledger::canonical_json;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm tag carried on every signed line.
pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";

/// Export serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One JSON object per line: `{record, signature, algorithm}`.
    Ndjson,
    /// One headerless CSV row per line; see [`ExportSigner::CSV_COLUMNS`].
    Csv,
}

/// One NDJSON export line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedLine {
    pub record: DecisionRecord,
    /// Lowercase hex HMAC-SHA256 over the record's canonical JSON.
    pub signature: String,
    pub algorithm: String,
}

/// Streams ledger records as independently verifiable signed lines.
pub struct ExportSigner {
    store: Arc<dyn LedgerStore>,
    key: Vec<u8>,
}

impl ExportSigner {
    /// CSV column order. Headerless so any offset restarts cleanly;
    /// `applied_filters` is `;`-joined, `metadata` is compact JSON.
    pub const CSV_COLUMNS: [&'static str; 17] = [
        "id",
        "org_id",
        "business_profile_id",
        "user_id",
        "conversation_id",
        "content_type",
        "decision",
        "confidence",
        "applied_filters",
        "request_hash",
        "prev_hash",
        "record_hash",
        "created_at",
        "seq",
        "metadata",
        "signature",
        "algorithm",
    ];

    /// Build a signer, resolving the key up front so a missing secret
    /// fails at construction rather than mid-stream.
    pub fn new(store: Arc<dyn LedgerStore>, keys: &dyn SigningKeyProvider) -> LedgerResult<Self> {
        Ok(Self {
            store,
            key: keys.signing_key()?,
        })
    }

    /// Stream matching records as signed lines, oldest first.
    ///
    /// Lazy per line: serialization and signing happen as the iterator is
    /// driven. `offset` skips records already delivered by a previous run
    /// over the same filter.
    pub fn stream(
        &self,
        filter: &RecordFilter,
        format: ExportFormat,
        offset: usize,
        limit: Option<usize>,
    ) -> LedgerResult<impl Iterator<Item = LedgerResult<String>> + '_> {
        let records = self.store.scan(filter, None)?;
        debug!(
            matched = records.len(),
            offset,
            ?format,
            "export stream opened"
        );

        Ok(records
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(move |record| self.render_line(&record, format)))
    }

    /// Sign one record: lowercase hex HMAC-SHA256 over its canonical JSON.
    pub fn sign_record(&self, record: &DecisionRecord) -> LedgerResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| LedgerError::Signing {
            reason: format!("invalid signing key: {e}"),
        })?;
        mac.update(canonical_record_json(record)?.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn render_line(&self, record: &DecisionRecord, format: ExportFormat) -> LedgerResult<String> {
        let signature = self.sign_record(record)?;
        match format {
            ExportFormat::Ndjson => {
                let line = SignedLine {
                    record: record.clone(),
                    signature,
                    algorithm: SIGNATURE_ALGORITHM.to_string(),
                };
                serde_json::to_string(&line).map_err(|e| LedgerError::Signing {
                    reason: format!("failed to serialize export line: {e}"),
                })
            }
            ExportFormat::Csv => render_csv_line(record, &signature),
        }
    }
}

/// Canonical JSON of the full stored row, the byte string signatures
/// commit to. Includes `record_hash` and `seq` — the export protects the
/// row as stored, not just its hashed subset.
fn canonical_record_json(record: &DecisionRecord) -> LedgerResult<String> {
    let value = serde_json::to_value(record).map_err(|e| LedgerError::Canonicalize {
        reason: format!("failed to serialize record {}: {e}", record.id),
    })?;
    Ok(canonical_json(&value))
}

fn render_csv_line(record: &DecisionRecord, signature: &str) -> LedgerResult<String> {
    fn opt(value: &Option<String>) -> String {
        value.clone().unwrap_or_default()
    }

    let metadata =
        serde_json::to_string(&record.metadata).map_err(|e| LedgerError::Canonicalize {
            reason: format!("failed to serialize metadata for {}: {e}", record.id),
        })?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record([
            record.id.to_string(),
            opt(&record.scope.org_id),
            opt(&record.scope.business_profile_id),
            opt(&record.scope.user_id),
            opt(&record.scope.conversation_id),
            record.content_type.clone(),
            record.decision.to_string(),
            record.confidence.map(|c| c.to_string()).unwrap_or_default(),
            record.applied_filters.join(";"),
            opt(&record.request_hash),
            opt(&record.prev_hash),
            record.record_hash.clone(),
            record.created_at.to_rfc3339(),
            record.seq.to_string(),
            metadata,
            signature.to_string(),
            SIGNATURE_ALGORITHM.to_string(),
        ])
        .map_err(|e| LedgerError::Signing {
            reason: format!("failed to write CSV row: {e}"),
        })?;

    let bytes = writer.into_inner().map_err(|e| LedgerError::Signing {
        reason: format!("failed to flush CSV row: {e}"),
    })?;
    let line = String::from_utf8(bytes).map_err(|e| LedgerError::Signing {
        reason: format!("CSV row is not UTF-8: {e}"),
    })?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Verify one NDJSON export line with the shared secret alone.
///
/// Returns `Ok(true)` when the embedded signature matches a fresh HMAC over
/// the embedded record, `Ok(false)` when it does not, and an error only
/// when the line is not a well-formed signed line.
pub fn verify_line(key: &[u8], line: &str) -> LedgerResult<bool> {
    let parsed: SignedLine = serde_json::from_str(line).map_err(|e| LedgerError::Signing {
        reason: format!("malformed export line: {e}"),
    })?;
    let signature = hex::decode(&parsed.signature).map_err(|e| LedgerError::Signing {
        reason: format!("malformed signature hex: {e}"),
    })?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| LedgerError::Signing {
        reason: format!("invalid signing key: {e}"),
    })?;
    mac.update(canonical_record_json(&parsed.record)?.as_bytes());
    Ok(mac.verify_slice(&signature).is_ok())
}
