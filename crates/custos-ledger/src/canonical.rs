//! Deterministic canonical serialization used as hashing input.
//!
//! Two records with byte-identical logical content must canonicalize to
//! byte-identical output regardless of how their structs were built or in
//! what order metadata keys were inserted. Rules:
//!
//!   - object keys in ascending byte order, at every nesting level
//!   - arrays in given order (filter order is significant)
//!   - compact separators, no whitespace
//!   - UTF-8, serde_json string escaping
//!   - absent optional fields serialized as explicit `null`
//!   - timestamps as RFC 3339 UTC with fixed microsecond precision
//!
//! The plain `serde_json::to_vec` path is not used for hashing because it
//! preserves map insertion order.

use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use custos_contracts::{
    error::{LedgerError, LedgerResult},
    record::DecisionRecord,
};

/// Serialize `value` to its canonical string form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                // Key came from the map, so the value must exist.
                write_value(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

/// Write a JSON string literal with serde_json's escaping rules.
fn write_string(s: &str, out: &mut String) {
    // serde_json string serialization is deterministic and infallible;
    // reuse it rather than maintaining a second escaper.
    let escaped =
        serde_json::to_string(s).expect("JSON string serialization is infallible");
    out.push_str(&escaped);
}

/// Build the hashing document for a record: every field except
/// `record_hash` itself and the store-assigned `seq` ordinal, with the
/// resolved `prev_hash` included.
///
/// Fails when `confidence` has no JSON representation (NaN or infinite) —
/// the recorder rejects such input before any write occurs.
pub fn hash_input(record: &DecisionRecord) -> LedgerResult<Value> {
    let confidence = match record.confidence {
        Some(c) => Number::from_f64(c)
            .map(Value::Number)
            .ok_or_else(|| LedgerError::Canonicalize {
                reason: format!("confidence {c} has no JSON representation"),
            })?,
        None => Value::Null,
    };

    fn opt(value: &Option<String>) -> Value {
        match value {
            Some(s) => Value::String(s.clone()),
            None => Value::Null,
        }
    }

    let mut doc = Map::new();
    doc.insert("id".to_string(), Value::String(record.id.to_string()));
    doc.insert("org_id".to_string(), opt(&record.scope.org_id));
    doc.insert(
        "business_profile_id".to_string(),
        opt(&record.scope.business_profile_id),
    );
    doc.insert("user_id".to_string(), opt(&record.scope.user_id));
    doc.insert(
        "conversation_id".to_string(),
        opt(&record.scope.conversation_id),
    );
    doc.insert(
        "content_type".to_string(),
        Value::String(record.content_type.clone()),
    );
    doc.insert(
        "decision".to_string(),
        Value::String(record.decision.to_string()),
    );
    doc.insert("confidence".to_string(), confidence);
    doc.insert(
        "applied_filters".to_string(),
        Value::Array(
            record
                .applied_filters
                .iter()
                .map(|f| Value::String(f.clone()))
                .collect(),
        ),
    );
    doc.insert("request_hash".to_string(), opt(&record.request_hash));
    doc.insert("prev_hash".to_string(), opt(&record.prev_hash));
    doc.insert(
        "created_at".to_string(),
        Value::String(
            record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        ),
    );
    doc.insert(
        "metadata".to_string(),
        Value::Object(record.metadata.clone()),
    );

    Ok(Value::Object(doc))
}
