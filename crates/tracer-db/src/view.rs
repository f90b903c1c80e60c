use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracer_core::Action;
use uuid::Uuid;

/// A stored trace with its payload decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceView<T> {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub entity_data: T,
    pub action: Action,
    pub action_at: DateTime<Utc>,
    pub action_by: Option<String>,
}

/// The `{old, new}` pair recorded for a modified scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}
