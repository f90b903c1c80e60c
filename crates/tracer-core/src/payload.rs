use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

/// One observed field or relation change.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Scalar(String),
    /// Array-typed property, passed through unchanged.
    List(Vec<Value>),
    Change { old: String, new: String },
    Nested(Payload),
    NestedList(Vec<Payload>),
    ListChange {
        old: Vec<Payload>,
        new: Vec<Payload>,
    },
}

/// Field/relation name to change, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: Vec<(String, PayloadValue)>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing entry in place, otherwise appends.
    pub fn insert(&mut self, name: impl Into<String>, value: PayloadValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PayloadValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for PayloadValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Change { old, new } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("old", old)?;
                map.serialize_entry("new", new)?;
                map.end()
            }
            Self::Nested(p) => p.serialize(serializer),
            Self::NestedList(items) => items.serialize(serializer),
            Self::ListChange { old, new } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("old", old)?;
                map.serialize_entry("new", new)?;
                map.end()
            }
        }
    }
}
