//! Export signing key providers.
//!
//! The export signer never falls back to an empty or hardcoded key — a
//! missing key is a configuration error surfaced before any line is
//! emitted. In production the key should be a strong random value shared
//! out-of-band with the auditing party.

use custos_contracts::error::{LedgerError, LedgerResult};
use custos_core::traits::SigningKeyProvider;

/// Environment variable the default key provider reads.
pub const EXPORT_KEY_ENV: &str = "CUSTOS_EXPORT_SIGNING_KEY";

/// Reads the signing key from `CUSTOS_EXPORT_SIGNING_KEY`.
#[derive(Debug, Default)]
pub struct EnvKeyProvider;

impl SigningKeyProvider for EnvKeyProvider {
    fn signing_key(&self) -> LedgerResult<Vec<u8>> {
        match std::env::var(EXPORT_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(key.into_bytes()),
            _ => Err(LedgerError::Config {
                reason: format!("export signing key not set ({EXPORT_KEY_ENV})"),
            }),
        }
    }
}

/// Holds a key directly. For tests and embedding callers that manage their
/// own secrets.
pub struct StaticKeyProvider {
    key: Vec<u8>,
}

impl StaticKeyProvider {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl SigningKeyProvider for StaticKeyProvider {
    fn signing_key(&self) -> LedgerResult<Vec<u8>> {
        if self.key.is_empty() {
            return Err(LedgerError::Config {
                reason: "export signing key is empty".to_string(),
            });
        }
        Ok(self.key.clone())
    }
}
