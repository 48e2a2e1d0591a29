//! Scope resolution: mapping a record's identifying fields to its chain key.
//!
//! Every hash chain is partitioned by scope. The resolution rule is a fixed
//! priority table — `org_id` wins over `business_profile_id`, which wins over
//! `user_id`, which wins over `conversation_id`; a record carrying none of
//! them falls back to the shared unscoped chain. The recorder and the
//! verifier both resolve scopes through this one function; a divergence
//! between them would surface as false linkage breaks, so the rule lives
//! here as data, not as conditionals scattered across crates.

use serde::{Deserialize, Serialize};

/// The four optional identity fields a decision record may carry.
///
/// At most the highest-priority populated field is authoritative for chain
/// membership; the others are retained on the record for filtering only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFields {
    /// Organization the decision was made for.
    pub org_id: Option<String>,
    /// Business profile within the organization.
    pub business_profile_id: Option<String>,
    /// End user the moderated content belongs to.
    pub user_id: Option<String>,
    /// Conversation or session the content appeared in.
    pub conversation_id: Option<String>,
}

impl ScopeFields {
    /// Return the value of the given scope field, if populated.
    pub fn get(&self, kind: ScopeKind) -> Option<&str> {
        match kind {
            ScopeKind::Org => self.org_id.as_deref(),
            ScopeKind::BusinessProfile => self.business_profile_id.as_deref(),
            ScopeKind::User => self.user_id.as_deref(),
            ScopeKind::Conversation => self.conversation_id.as_deref(),
            ScopeKind::None => None,
        }
    }
}

/// Which identity field a chain is keyed on.
///
/// Serialized with the field names callers filter by, so verification
/// reports read `{"scope": "org_id", "key": "acme"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    #[serde(rename = "org_id")]
    Org,
    #[serde(rename = "business_profile_id")]
    BusinessProfile,
    #[serde(rename = "user_id")]
    User,
    #[serde(rename = "conversation_id")]
    Conversation,
    /// The shared fallback chain for records with no scope fields at all.
    /// An explicit, documented destination — not an error.
    #[serde(rename = "none")]
    None,
}

impl ScopeKind {
    /// Resolution priority, highest first. `None` is the implicit fallback
    /// and deliberately absent from the table.
    pub const PRIORITY: [ScopeKind; 4] = [
        ScopeKind::Org,
        ScopeKind::BusinessProfile,
        ScopeKind::User,
        ScopeKind::Conversation,
    ];

    /// The stable string form used in chain keys and reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Org => "org_id",
            ScopeKind::BusinessProfile => "business_profile_id",
            ScopeKind::User => "user_id",
            ScopeKind::Conversation => "conversation_id",
            ScopeKind::None => "none",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved chain key of a record: which field partitions the chain and
/// the value it held.
///
/// `value` is `None` only for `ScopeKind::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub kind: ScopeKind,
    pub value: Option<String>,
}

impl ScopeKey {
    /// Resolve the chain key for a set of scope fields.
    ///
    /// Walks `ScopeKind::PRIORITY` in order and takes the first populated
    /// field. Records with no scope fields resolve to the unscoped chain.
    pub fn resolve(fields: &ScopeFields) -> ScopeKey {
        for kind in ScopeKind::PRIORITY {
            if let Some(value) = fields.get(kind) {
                return ScopeKey {
                    kind,
                    value: Some(value.to_string()),
                };
            }
        }
        ScopeKey {
            kind: ScopeKind::None,
            value: None,
        }
    }

    /// The flat string form used for lock keying and report grouping,
    /// e.g. `"org_id:acme"` or `"none"`.
    pub fn chain_key(&self) -> String {
        match &self.value {
            Some(value) => format!("{}:{}", self.kind, value),
            None => self.kind.to_string(),
        }
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.chain_key())
    }
}
