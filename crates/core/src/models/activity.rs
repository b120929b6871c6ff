//! Admin activity log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityId, ActivityKind};

/// A row of the `activity_log` table. Written by the data service only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(alias = "message")]
    pub description: String,
    pub action_type: ActivityKind,
    pub created_at: DateTime<Utc>,
}
