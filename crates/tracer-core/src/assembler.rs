use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::action::Action;
use crate::builder::TraceDraft;
use crate::error::TracerError;

/// Persistable audit record. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub entity_data: String,
    pub action: Action,
    pub action_at: DateTime<Utc>,
    pub action_by: Option<String>,
}

impl TraceDraft {
    pub fn into_record(self) -> Result<TraceRecord, TracerError> {
        Ok(TraceRecord {
            id: Uuid::new_v4(),
            entity_id: self.entity_id,
            entity_name: self.entity_name,
            entity_data: self.payload.to_json()?,
            action: self.action,
            action_at: self.action_at,
            action_by: self.action_by,
        })
    }
}

/// Drafts with nothing observable to record are dropped here.
pub fn assemble(drafts: Vec<TraceDraft>) -> Result<Vec<TraceRecord>, TracerError> {
    let mut records = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if draft.payload.is_empty() {
            tracing::debug!(
                entity = %draft.entity_name,
                entity_id = %draft.entity_id,
                "skipping trace with empty payload"
            );
            continue;
        }
        records.push(draft.into_record()?);
    }
    Ok(records)
}
