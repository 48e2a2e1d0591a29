//! Retention policy configuration schema.
//!
//! A `RetentionConfig` is deserialized from TOML: a `[defaults]` table plus
//! zero or more `[[org]]` overrides. The retention manager treats the
//! loaded policy as read-only input.
//!
//! Example:
//! ```toml
//! [defaults]
//! retention_days = 365
//! auto_purge = false
//! redaction_token = "[REDACTED]"
//!
//! [[org]]
//! id = "acme"
//! retention_days = 90
//! auto_purge = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use custos_contracts::error::{LedgerError, LedgerResult};
use custos_core::traits::RetentionPolicySource;

/// Retention window applied when an organization has no override and the
/// policy document sets no default.
pub const DEFAULT_RETENTION_DAYS: u32 = 365;

/// The token written over scrubbed `reasoning` text.
pub const DEFAULT_REDACTION_TOKEN: &str = "[REDACTED]";

/// Workspace-wide retention defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionDefaults {
    /// Records older than this many days are purge candidates.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Whether scheduled runs may purge without an explicit operator request.
    #[serde(default)]
    pub auto_purge: bool,

    /// The token written over scrubbed `reasoning` text.
    #[serde(default = "default_redaction_token")]
    pub redaction_token: String,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_redaction_token() -> String {
    DEFAULT_REDACTION_TOKEN.to_string()
}

impl Default for RetentionDefaults {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            auto_purge: false,
            redaction_token: DEFAULT_REDACTION_TOKEN.to_string(),
        }
    }
}

/// Per-organization override of the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgOverride {
    /// The organization this override applies to.
    pub id: String,
    /// Override of `retention_days`; absent means "use the default".
    pub retention_days: Option<u32>,
    /// Override of `auto_purge`; absent means "use the default".
    pub auto_purge: Option<bool>,
}

/// The full retention policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub defaults: RetentionDefaults,
    #[serde(default)]
    pub org: Vec<OrgOverride>,
}

/// A `RetentionPolicySource` implementation that reads a TOML document.
///
/// Construct via `from_toml_str` or `from_file`, then hand to
/// `RetentionManager`.
#[derive(Debug)]
pub struct TomlRetentionPolicy {
    config: RetentionConfig,
}

impl TomlRetentionPolicy {
    /// Parse `s` as TOML and build a `TomlRetentionPolicy`.
    ///
    /// Returns `LedgerError::Config` if the TOML is malformed or does not
    /// match the `RetentionConfig` schema.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: RetentionConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse retention policy TOML: {e}"),
        })?;
        Ok(Self { config })
    }

    /// Read the file at `path` and parse it as a retention policy.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read retention policy '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The built-in defaults with no per-organization overrides.
    pub fn defaults() -> Self {
        Self {
            config: RetentionConfig::default(),
        }
    }

    fn override_for(&self, org_id: Option<&str>) -> Option<&OrgOverride> {
        let org_id = org_id?;
        self.config.org.iter().find(|o| o.id == org_id)
    }
}

impl RetentionPolicySource for TomlRetentionPolicy {
    fn window_days(&self, org_id: Option<&str>) -> u32 {
        self.override_for(org_id)
            .and_then(|o| o.retention_days)
            .unwrap_or(self.config.defaults.retention_days)
    }

    fn auto_purge(&self, org_id: Option<&str>) -> bool {
        self.override_for(org_id)
            .and_then(|o| o.auto_purge)
            .unwrap_or(self.config.defaults.auto_purge)
    }

    fn redaction_token(&self) -> &str {
        &self.config.defaults.redaction_token
    }
}
