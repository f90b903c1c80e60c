//! Static entity descriptors.
//!
//! Every audited type declares its scalar fields and relations once, and the
//! registry checks the whole set at startup so snapshot building never has
//! to discover metadata per commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TracerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// How the two ends of a relation are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// `target.<field> == self.<primary key>`
    Inverse(&'static str),
    /// `self.<field> == target.<primary key>`
    Forward(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: &'static str,
    pub target: &'static str,
    pub cardinality: Cardinality,
    pub join: Join,
}

impl RelationDescriptor {
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: &'static str,
    pub trace_source: bool,
    pub fields: Vec<FieldDescriptor>,
    pub relations: Vec<RelationDescriptor>,
}

impl EntitySchema {
    /// A trace-source entity type with no fields yet.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            trace_source: true,
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Tracked and persisted, but never audited on its own.
    pub fn untraced(mut self) -> Self {
        self.trace_source = false;
        self
    }

    pub fn key(mut self, name: &'static str) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            primary_key: true,
        });
        self
    }

    pub fn field(mut self, name: &'static str) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            primary_key: false,
        });
        self
    }

    /// Collection whose members point back through `foreign_key`.
    pub fn has_many(
        self,
        name: &'static str,
        target: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relation(name, target, Cardinality::Many, Join::Inverse(foreign_key))
    }

    /// Single related entity pointing back through `foreign_key`.
    pub fn has_one(
        self,
        name: &'static str,
        target: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relation(name, target, Cardinality::One, Join::Inverse(foreign_key))
    }

    /// Single related entity referenced by this type's `foreign_key`.
    pub fn belongs_to(
        self,
        name: &'static str,
        target: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relation(name, target, Cardinality::One, Join::Forward(foreign_key))
    }

    fn relation(
        mut self,
        name: &'static str,
        target: &'static str,
        cardinality: Cardinality,
        join: Join,
    ) -> Self {
        self.relations.push(RelationDescriptor {
            name,
            target,
            cardinality,
            join,
        });
        self
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.primary_key)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<&'static str, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: EntitySchema) -> Result<&mut Self, TracerError> {
        let keys = schema.fields.iter().filter(|f| f.primary_key).count();
        if keys != 1 {
            return Err(TracerError::PrimaryKeyCount {
                entity: schema.name.to_string(),
                count: keys,
            });
        }
        if self.schemas.contains_key(schema.name) {
            return Err(TracerError::DuplicateEntity(schema.name.to_string()));
        }
        self.schemas.insert(schema.name, Arc::new(schema));
        Ok(self)
    }

    /// Checks that every relation points at a registered type and joins on
    /// declared fields. Call once after all types are registered.
    pub fn validate(&self) -> Result<(), TracerError> {
        for schema in self.schemas.values() {
            for relation in &schema.relations {
                let Some(target) = self.schemas.get(relation.target) else {
                    return Err(TracerError::UnknownRelationTarget {
                        entity: schema.name.to_string(),
                        relation: relation.name.to_string(),
                        target: relation.target.to_string(),
                    });
                };
                let (side, field) = match relation.join {
                    Join::Inverse(field) => (target, field),
                    Join::Forward(field) => (schema, field),
                };
                if side.field_index(field).is_none() {
                    return Err(TracerError::UnknownJoinField {
                        entity: schema.name.to_string(),
                        relation: relation.name.to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<EntitySchema>> {
        self.schemas.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
