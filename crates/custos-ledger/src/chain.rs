//! Hash-chain primitives: record hashing and content fingerprinting.
//!
//! `record_hash` input layout: the canonical JSON document built by
//! `canonical::hash_input` — all record fields except `record_hash` and
//! `seq`, with `prev_hash` included — fed through SHA-256 and hex-encoded
//! lowercase. The first record of a scope hashes `prev_hash` as JSON
//! `null`; there is no genesis sentinel string.

use sha2::{Digest, Sha256};

use custos_contracts::{error::LedgerResult, record::DecisionRecord};

use crate::canonical::{canonical_json, hash_input};

/// Per-segment cap on the text fed into `request_fingerprint`, in chars.
/// Bounds the hash input so arbitrarily long content cannot balloon an
/// append.
pub const MAX_FINGERPRINT_TEXT: usize = 2048;

/// Compute the integrity hash for a record.
///
/// Pure function of the record's own content and the chain tip it observed
/// (`prev_hash`). `record.record_hash` and `record.seq` are ignored, so the
/// same function serves the recorder (hash before insert) and the verifier
/// (recompute and compare).
///
/// Returns a lowercase 64-character hex string.
pub fn hash_record(record: &DecisionRecord) -> LedgerResult<String> {
    let doc = hash_input(record)?;
    let canonical = canonical_json(&doc);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint the content a decision was made about.
///
/// This is the reference construction for `DecisionInput::request_hash`:
/// a hash over (input text, response text, content type, session id,
/// filter list) that lets the audit log correlate decisions about the same
/// content without ever storing the content itself. Each text segment is
/// truncated to `MAX_FINGERPRINT_TEXT` chars before hashing; segments are
/// length-prefixed so adjacent fields cannot collide.
///
/// Distinct from `hash_record`, which protects the ledger row.
pub fn request_fingerprint(
    input_text: &str,
    response_text: Option<&str>,
    content_type: &str,
    session_id: Option<&str>,
    applied_filters: &[String],
) -> String {
    let mut hasher = Sha256::new();
    update_segment(&mut hasher, truncate_chars(input_text, MAX_FINGERPRINT_TEXT));
    update_segment(
        &mut hasher,
        truncate_chars(response_text.unwrap_or(""), MAX_FINGERPRINT_TEXT),
    );
    update_segment(&mut hasher, content_type);
    update_segment(&mut hasher, session_id.unwrap_or(""));
    for filter in applied_filters {
        update_segment(&mut hasher, filter);
    }
    hex::encode(hasher.finalize())
}

fn update_segment(hasher: &mut Sha256, segment: &str) {
    hasher.update((segment.len() as u64).to_le_bytes());
    hasher.update(segment.as_bytes());
}

/// Truncate to at most `max` chars on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
