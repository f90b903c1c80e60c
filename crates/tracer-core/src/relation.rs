//! Relation-level decisions: how a related entity or collection shows up in
//! the root payload.

use crate::action::Action;
use crate::classifier::{NestedScope, classify_nested};
use crate::payload::{Payload, PayloadValue};
use crate::snapshot::{EntityState, EntrySnapshot, Related, RelationSnapshot};

/// Joint state of a related collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Added,
    Modified,
    Deleted,
    None,
}

/// Order matters: an empty or uniformly added set is `Added` before any
/// other rule is considered.
pub fn classify_collection(members: &[EntrySnapshot]) -> CollectionChange {
    let has = |state: EntityState| members.iter().any(|m| m.state == state);
    let all = |state: EntityState| members.iter().all(|m| m.state == state);

    if all(EntityState::Added) {
        CollectionChange::Added
    } else if (has(EntityState::Added) || has(EntityState::Deleted))
        && has(EntityState::Unchanged)
    {
        CollectionChange::Modified
    } else if all(EntityState::Deleted) {
        CollectionChange::Deleted
    } else {
        CollectionChange::None
    }
}

/// Payload contribution of one relation of `root`, if any.
pub fn resolve(
    root: &EntrySnapshot,
    root_action: Action,
    relation: &RelationSnapshot,
) -> Option<PayloadValue> {
    match &relation.related {
        Related::Absent => None,
        Related::One(member) => {
            let nested = classify_nested(
                member,
                NestedScope {
                    root_action,
                    collection: false,
                    modified_collection: false,
                },
            );
            (!nested.is_empty()).then_some(PayloadValue::Nested(nested))
        }
        Related::Many(members) => resolve_collection(root, root_action, members),
    }
}

fn resolve_collection(
    root: &EntrySnapshot,
    root_action: Action,
    members: &[EntrySnapshot],
) -> Option<PayloadValue> {
    let change = classify_collection(members);
    match change {
        CollectionChange::Added => whole(root_action, members),
        CollectionChange::Deleted if root.state == EntityState::Deleted => {
            whole(root_action, members)
        }
        CollectionChange::Modified | CollectionChange::Deleted => {
            let scope = NestedScope {
                root_action,
                collection: true,
                modified_collection: change == CollectionChange::Modified,
            };
            let new = render(
                members
                    .iter()
                    .filter(|m| matches!(m.state, EntityState::Added | EntityState::Unchanged)),
                scope,
            );
            let old = render(
                members
                    .iter()
                    .filter(|m| matches!(m.state, EntityState::Deleted | EntityState::Unchanged)),
                scope,
            );
            Some(PayloadValue::ListChange { old, new })
        }
        CollectionChange::None => None,
    }
}

fn whole(root_action: Action, members: &[EntrySnapshot]) -> Option<PayloadValue> {
    let scope = NestedScope {
        root_action,
        collection: true,
        modified_collection: false,
    };
    let items = render(members.iter(), scope);
    (!items.is_empty()).then_some(PayloadValue::NestedList(items))
}

fn render<'a>(
    members: impl Iterator<Item = &'a EntrySnapshot>,
    scope: NestedScope,
) -> Vec<Payload> {
    members
        .map(|m| classify_nested(m, scope))
        .filter(|p| !p.is_empty())
        .collect()
}
