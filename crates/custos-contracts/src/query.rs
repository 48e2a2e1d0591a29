//! Record filtering.
//!
//! `RecordFilter` is the one query shape shared by listing, export,
//! verification, and retention. All fields are conjunctive; an empty filter
//! matches everything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Decision, DecisionRecord};

/// A conjunctive filter over ledger records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Match records carrying this `org_id`.
    pub org_id: Option<String>,
    /// Match records carrying this `business_profile_id`.
    pub business_profile_id: Option<String>,
    /// Match records carrying this `user_id`.
    pub user_id: Option<String>,
    /// Match records carrying this `conversation_id`.
    pub conversation_id: Option<String>,
    /// Match records of this content category.
    pub content_type: Option<String>,
    /// Match records with this decision.
    pub decision: Option<Decision>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// A filter matching one organization's records.
    pub fn for_org(org_id: impl Into<String>) -> Self {
        Self {
            org_id: Some(org_id.into()),
            ..Self::default()
        }
    }

    /// True when `record` satisfies every populated field.
    pub fn matches(&self, record: &DecisionRecord) -> bool {
        fn field_matches(want: &Option<String>, have: &Option<String>) -> bool {
            match want {
                Some(want) => have.as_deref() == Some(want.as_str()),
                None => true,
            }
        }

        field_matches(&self.org_id, &record.scope.org_id)
            && field_matches(&self.business_profile_id, &record.scope.business_profile_id)
            && field_matches(&self.user_id, &record.scope.user_id)
            && field_matches(&self.conversation_id, &record.scope.conversation_id)
            && self
                .content_type
                .as_deref()
                .map_or(true, |ct| record.content_type == ct)
            && self.decision.map_or(true, |d| record.decision == d)
            && self.from.map_or(true, |from| record.created_at >= from)
            && self.to.map_or(true, |to| record.created_at < to)
    }
}
