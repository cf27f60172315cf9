use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed model call.
///
/// Created without a validation id; the id is back-filled once the owning
/// report has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub project_id: String,
    #[serde(default)]
    pub validation_id: Option<String>,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub estimated_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        project_id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        tokens_used: u64,
        estimated_cost: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            validation_id: None,
            provider: provider.into(),
            model: model.into(),
            tokens_used,
            estimated_cost,
            created_at,
        }
    }
}
