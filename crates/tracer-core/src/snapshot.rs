//! The change-tracking snapshot handed over by the persistence layer.

use std::sync::Arc;

use crate::schema::{EntitySchema, RelationDescriptor};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySnapshot {
    pub name: &'static str,
    pub current: Value,
    pub original: Value,
    pub primary_key: bool,
    pub modified: bool,
}

impl PropertySnapshot {
    /// The value changed and the tracker flagged it. Both must hold.
    pub fn is_changed(&self) -> bool {
        self.modified && self.current.render() != self.original.render()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    Absent,
    One(Box<EntrySnapshot>),
    Many(Vec<EntrySnapshot>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationSnapshot {
    pub descriptor: RelationDescriptor,
    pub related: Related,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub schema: Arc<EntitySchema>,
    pub state: EntityState,
    pub properties: Vec<PropertySnapshot>,
    pub relations: Vec<RelationSnapshot>,
}

impl EntrySnapshot {
    pub fn entity_name(&self) -> &'static str {
        self.schema.name
    }

    pub fn is_trace_source(&self) -> bool {
        self.schema.trace_source
    }

    pub fn primary_key(&self) -> Option<&PropertySnapshot> {
        self.properties.iter().find(|p| p.primary_key)
    }

    pub fn property(&self, name: &str) -> Option<&PropertySnapshot> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// All tracked entries in tracking order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSnapshot {
    pub entries: Vec<EntrySnapshot>,
}

impl ChangeSnapshot {
    pub fn new(entries: Vec<EntrySnapshot>) -> Self {
        Self { entries }
    }

    pub fn trace_sources(&self) -> impl Iterator<Item = &EntrySnapshot> {
        self.entries.iter().filter(|e| e.is_trace_source())
    }

    pub fn has_changes(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.state != EntityState::Unchanged)
    }
}
