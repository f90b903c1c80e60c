use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::action::Action;
use crate::classifier::{action_for, classify_root, entity_id};
use crate::error::TracerError;
use crate::payload::Payload;
use crate::relation::resolve;
use crate::snapshot::{ChangeSnapshot, EntrySnapshot};

/// Audit entry for one root entity, before empty payloads are filtered out.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceDraft {
    pub entity_id: Uuid,
    pub entity_name: String,
    pub action: Action,
    pub action_by: Option<String>,
    pub action_at: DateTime<Utc>,
    pub payload: Payload,
}

pub fn build_draft(
    entry: &EntrySnapshot,
    action_by: Option<&str>,
    action_at: DateTime<Utc>,
) -> Result<TraceDraft, TracerError> {
    let action = action_for(entry.state);
    let entity_id = entity_id(entry)?;

    let mut payload = Payload::new();
    classify_root(entry, &mut payload);

    for relation in &entry.relations {
        if let Some(value) = resolve(entry, action, relation) {
            payload.insert(relation.descriptor.name, value);
        }
    }

    Ok(TraceDraft {
        entity_id,
        entity_name: entry.entity_name().to_string(),
        action,
        action_by: action_by.map(str::to_string),
        action_at,
        payload,
    })
}

/// One draft per trace-source entry, in snapshot order.
pub fn build_drafts(
    snapshot: &ChangeSnapshot,
    action_by: Option<&str>,
    action_at: DateTime<Utc>,
) -> Result<Vec<TraceDraft>, TracerError> {
    let drafts = snapshot
        .trace_sources()
        .map(|entry| build_draft(entry, action_by, action_at))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        entries = snapshot.entries.len(),
        drafts = drafts.len(),
        "built trace drafts"
    );
    Ok(drafts)
}
