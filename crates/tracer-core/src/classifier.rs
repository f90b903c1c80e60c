//! Field-level decisions: which scalar properties of a tracked entity land in
//! the payload, and in what shape.

use uuid::Uuid;

use crate::action::Action;
use crate::error::TracerError;
use crate::payload::{Payload, PayloadValue};
use crate::snapshot::{EntityState, EntrySnapshot, PropertySnapshot};
use crate::value::Value;

/// Unchanged roots are audited only through their relations, which makes
/// whatever they end up recording a modification.
pub fn action_for(state: EntityState) -> Action {
    match state {
        EntityState::Added => Action::Added,
        EntityState::Deleted => Action::Deleted,
        EntityState::Modified | EntityState::Unchanged => Action::Modified,
    }
}

/// Where a related entity sits inside the root payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedScope {
    pub root_action: Action,
    pub collection: bool,
    pub modified_collection: bool,
}

/// Resolves the entity id from the primary-key property.
pub fn entity_id(entry: &EntrySnapshot) -> Result<Uuid, TracerError> {
    let key = entry
        .primary_key()
        .filter(|p| !p.current.is_null())
        .ok_or_else(|| TracerError::MissingPrimaryKey {
            entity: entry.entity_name().to_string(),
        })?;
    key.current
        .as_uuid()
        .ok_or_else(|| TracerError::InvalidPrimaryKey {
            entity: entry.entity_name().to_string(),
            value: key.current.to_string(),
        })
}

/// Scalar contributions of a root entity.
pub fn classify_root(entry: &EntrySnapshot, payload: &mut Payload) {
    for property in &entry.properties {
        if property.primary_key {
            if matches!(entry.state, EntityState::Added | EntityState::Deleted)
                && let Some(key) = property.current.render()
            {
                payload.insert(property.name, PayloadValue::Scalar(key));
            }
            continue;
        }

        match entry.state {
            EntityState::Added | EntityState::Deleted => {
                if let Some(value) = verbatim(&property.current) {
                    payload.insert(property.name, value);
                }
            }
            EntityState::Modified => {
                if property.is_changed() {
                    payload.insert(property.name, change(property));
                }
            }
            EntityState::Unchanged => {}
        }
    }
}

/// Scalar contributions of an entity reached through a relation.
pub fn classify_nested(member: &EntrySnapshot, scope: NestedScope) -> Payload {
    let mut payload = Payload::new();

    for property in &member.properties {
        if property.primary_key {
            if scope.collection
                && let Some(key) = property.current.render()
            {
                payload.insert(property.name, PayloadValue::Scalar(key));
            }
            continue;
        }

        let value = match scope.root_action {
            Action::Added | Action::Deleted => nested_verbatim(&property.current),
            Action::Modified => {
                if property.is_changed() {
                    Some(change(property))
                } else if scope.modified_collection
                    || matches!(member.state, EntityState::Added | EntityState::Deleted)
                {
                    nested_current(&property.current)
                } else {
                    None
                }
            }
        };

        if let Some(value) = value {
            payload.insert(property.name, value);
        }
    }

    payload
}

fn change(property: &PropertySnapshot) -> PayloadValue {
    PayloadValue::Change {
        old: property.original.render().unwrap_or_default(),
        new: property.current.render().unwrap_or_default(),
    }
}

fn verbatim(value: &Value) -> Option<PayloadValue> {
    match value {
        Value::Null => None,
        Value::List(items) => Some(PayloadValue::List(items.clone())),
        other => other.render().map(PayloadValue::Scalar),
    }
}

fn nested_verbatim(value: &Value) -> Option<PayloadValue> {
    match value {
        Value::List(items) if items.is_empty() => None,
        other => verbatim(other),
    }
}

fn nested_current(value: &Value) -> Option<PayloadValue> {
    match value {
        Value::Null => Some(PayloadValue::Scalar(String::new())),
        other => nested_verbatim(other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::EntitySchema;

    fn entry(state: EntityState, properties: Vec<PropertySnapshot>) -> EntrySnapshot {
        EntrySnapshot {
            schema: Arc::new(EntitySchema::new("User").key("id")),
            state,
            properties,
            relations: Vec::new(),
        }
    }

    fn key(id: Uuid) -> PropertySnapshot {
        PropertySnapshot {
            name: "id",
            current: id.into(),
            original: id.into(),
            primary_key: true,
            modified: false,
        }
    }

    fn prop(
        name: &'static str,
        original: Value,
        current: Value,
        modified: bool,
    ) -> PropertySnapshot {
        PropertySnapshot {
            name,
            current,
            original,
            primary_key: false,
            modified,
        }
    }

    fn scalar(s: &str) -> PayloadValue {
        PayloadValue::Scalar(s.to_string())
    }

    #[test]
    fn maps_states_to_actions() {
        assert_eq!(action_for(EntityState::Added), Action::Added);
        assert_eq!(action_for(EntityState::Modified), Action::Modified);
        assert_eq!(action_for(EntityState::Deleted), Action::Deleted);
        assert_eq!(action_for(EntityState::Unchanged), Action::Modified);
    }

    #[test]
    fn resolves_uuid_and_text_keys() {
        let id = Uuid::new_v4();
        let keyed = entry(EntityState::Added, vec![key(id)]);
        assert_eq!(entity_id(&keyed).unwrap(), id);

        let mut text = key(id);
        text.current = id.to_string().into();
        let keyed = entry(EntityState::Added, vec![text]);
        assert_eq!(entity_id(&keyed).unwrap(), id);
    }

    #[test]
    fn rejects_null_and_foreign_keys() {
        let mut null = key(Uuid::new_v4());
        null.current = Value::Null;
        let err = entity_id(&entry(EntityState::Added, vec![null])).unwrap_err();
        assert!(matches!(err, TracerError::MissingPrimaryKey { .. }));

        let mut int = key(Uuid::new_v4());
        int.current = Value::Int(42);
        let err = entity_id(&entry(EntityState::Added, vec![int])).unwrap_err();
        assert!(matches!(
            err,
            TracerError::InvalidPrimaryKey { value, .. } if value == "42"
        ));

        let err = entity_id(&entry(EntityState::Added, Vec::new())).unwrap_err();
        assert!(matches!(err, TracerError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn added_root_captures_every_non_null_field() {
        let id = Uuid::new_v4();
        let e = entry(
            EntityState::Added,
            vec![
                key(id),
                prop("name", Value::Null, "Alice".into(), false),
                prop("nickname", Value::Null, Value::Null, false),
                prop("tags", Value::Null, Value::List(Vec::new()), false),
            ],
        );
        let mut payload = Payload::new();
        classify_root(&e, &mut payload);

        let keys: Vec<_> = payload.keys().collect();
        assert_eq!(keys, vec!["id", "name", "tags"]);
        assert_eq!(payload.get("id"), Some(&scalar(&id.to_string())));
        assert_eq!(payload.get("name"), Some(&scalar("Alice")));
        assert_eq!(payload.get("tags"), Some(&PayloadValue::List(Vec::new())));
    }

    #[test]
    fn deleted_root_captures_last_known_values() {
        let e = entry(
            EntityState::Deleted,
            vec![
                key(Uuid::new_v4()),
                prop("name", "Alicia".into(), "Alicia".into(), false),
            ],
        );
        let mut payload = Payload::new();
        classify_root(&e, &mut payload);
        assert_eq!(payload.get("name"), Some(&scalar("Alicia")));
        assert!(payload.get("id").is_some());
    }

    #[test]
    fn modified_root_records_only_changed_pairs() {
        let e = entry(
            EntityState::Modified,
            vec![
                key(Uuid::new_v4()),
                prop("name", "Alice".into(), "Alicia".into(), true),
                prop("user_name", "alice".into(), "alice".into(), false),
                prop("nickname", Value::Null, "Al".into(), true),
            ],
        );
        let mut payload = Payload::new();
        classify_root(&e, &mut payload);

        let keys: Vec<_> = payload.keys().collect();
        assert_eq!(keys, vec!["name", "nickname"]);
        assert_eq!(
            payload.get("name"),
            Some(&PayloadValue::Change {
                old: "Alice".into(),
                new: "Alicia".into(),
            })
        );
        assert_eq!(
            payload.get("nickname"),
            Some(&PayloadValue::Change {
                old: String::new(),
                new: "Al".into(),
            })
        );
    }

    #[test]
    fn flagged_but_equal_property_is_suppressed() {
        let e = entry(
            EntityState::Modified,
            vec![
                key(Uuid::new_v4()),
                prop("name", "Alice".into(), "Alice".into(), true),
            ],
        );
        let mut payload = Payload::new();
        classify_root(&e, &mut payload);
        assert!(payload.is_empty());
    }

    #[test]
    fn changed_but_unflagged_property_is_suppressed() {
        let e = entry(
            EntityState::Modified,
            vec![
                key(Uuid::new_v4()),
                prop("name", "Alice".into(), "Alicia".into(), false),
            ],
        );
        let mut payload = Payload::new();
        classify_root(&e, &mut payload);
        assert!(payload.is_empty());
    }

    #[test]
    fn unchanged_root_has_no_scalars() {
        let e = entry(
            EntityState::Unchanged,
            vec![
                key(Uuid::new_v4()),
                prop("name", "A".into(), "A".into(), false),
            ],
        );
        let mut payload = Payload::new();
        classify_root(&e, &mut payload);
        assert!(payload.is_empty());
    }

    #[test]
    fn nested_key_only_inside_collections() {
        let id = Uuid::new_v4();
        let member = entry(EntityState::Added, vec![key(id)]);
        let single = classify_nested(
            &member,
            NestedScope {
                root_action: Action::Added,
                collection: false,
                modified_collection: false,
            },
        );
        assert!(single.is_empty());

        let listed = classify_nested(
            &member,
            NestedScope {
                root_action: Action::Added,
                collection: true,
                modified_collection: false,
            },
        );
        assert_eq!(listed.get("id"), Some(&scalar(&id.to_string())));
    }

    #[test]
    fn nested_lists_pass_through_only_when_non_empty() {
        let member = entry(
            EntityState::Added,
            vec![
                key(Uuid::new_v4()),
                prop("tags", Value::Null, Value::from(vec!["a", "b"]), false),
                prop("aliases", Value::Null, Value::List(Vec::new()), false),
                prop("age", Value::Null, Value::Int(30), false),
            ],
        );
        let p = classify_nested(
            &member,
            NestedScope {
                root_action: Action::Added,
                collection: false,
                modified_collection: false,
            },
        );
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["tags", "age"]);
        assert_eq!(
            p.get("tags"),
            Some(&PayloadValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(p.get("age"), Some(&scalar("30")));
    }

    #[test]
    fn nested_under_modified_root_keeps_context_for_new_members() {
        let member = entry(
            EntityState::Added,
            vec![
                key(Uuid::new_v4()),
                prop("nickname", Value::Null, Value::Null, false),
            ],
        );
        let p = classify_nested(
            &member,
            NestedScope {
                root_action: Action::Modified,
                collection: false,
                modified_collection: false,
            },
        );
        assert_eq!(p.get("nickname"), Some(&scalar("")));
    }

    #[test]
    fn nested_unchanged_member_outside_modified_collection_records_only_changes() {
        let member = entry(
            EntityState::Modified,
            vec![
                key(Uuid::new_v4()),
                prop("name", "old".into(), "new".into(), true),
                prop("city", "Oslo".into(), "Oslo".into(), false),
            ],
        );
        let p = classify_nested(
            &member,
            NestedScope {
                root_action: Action::Modified,
                collection: false,
                modified_collection: false,
            },
        );
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["name"]);
    }
}
