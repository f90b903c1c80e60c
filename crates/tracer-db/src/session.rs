//! Change-tracking unit of work over a sea-orm connection.
//!
//! Rows are tracked by entity type and rendered primary key. Relations are
//! resolved against the other tracked rows whenever a snapshot is taken, so
//! only what the session has seen can show up in a collection.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, TransactionTrait};
use tokio_util::sync::CancellationToken;
use tracer_core::{
    AsyncUnitOfWork, ChangeSnapshot, CurrentActor, EntitySchema, EntityState, EntrySnapshot, Join,
    PropertySnapshot, Related, RelationDescriptor, RelationSnapshot, SaveCoordinator,
    SchemaRegistry, TraceRecord, TracerError, Value,
};

use crate::entities::trace;
use crate::error::SessionError;
use crate::traceable::{RowWriter, Traceable, writer};

struct Tracked {
    schema: Arc<EntitySchema>,
    key: String,
    state: EntityState,
    original: Vec<Value>,
    current: Vec<Value>,
    modified: Vec<bool>,
    writer: Box<dyn RowWriter>,
}

impl Tracked {
    fn new<T: Traceable>(
        schema: Arc<EntitySchema>,
        key: String,
        values: Vec<Value>,
        row: T,
    ) -> Self {
        let modified = vec![false; values.len()];
        Self {
            schema,
            key,
            state: EntityState::Unchanged,
            original: values.clone(),
            current: values,
            modified,
            writer: writer(row),
        }
    }

    /// Nothing was loaded, so every original value is null.
    fn added(mut self) -> Self {
        self.state = EntityState::Added;
        self.original.fill(Value::Null);
        self
    }

    /// Never loaded by this session; every field counts as modified.
    fn assumed_modified(mut self) -> Self {
        self.state = EntityState::Modified;
        self.modified.fill(true);
        self
    }

    fn deleted(mut self) -> Self {
        self.state = EntityState::Deleted;
        self
    }

    fn value(&self, field: &str) -> Option<&Value> {
        self.schema.field_index(field).map(|i| &self.current[i])
    }

    fn snapshot(&self, relations: Vec<RelationSnapshot>) -> EntrySnapshot {
        let properties = self
            .schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| PropertySnapshot {
                name: field.name,
                current: self.current[i].clone(),
                original: self.original[i].clone(),
                primary_key: field.primary_key,
                modified: self.modified[i],
            })
            .collect();

        EntrySnapshot {
            schema: self.schema.clone(),
            state: self.state,
            properties,
            relations,
        }
    }

    fn joins(&self, other: &Tracked, relation: &RelationDescriptor) -> bool {
        match relation.join {
            Join::Inverse(field) => renders_as(other.value(field), &self.key),
            Join::Forward(field) => renders_as(self.value(field), &other.key),
        }
    }
}

fn renders_as(value: Option<&Value>, key: &str) -> bool {
    value.and_then(Value::render).as_deref() == Some(key)
}

pub struct Session {
    db: DatabaseConnection,
    registry: Arc<SchemaRegistry>,
    actor: Arc<dyn CurrentActor>,
    tracked: Vec<Tracked>,
    txn: Option<DatabaseTransaction>,
    staged: Vec<TraceRecord>,
}

impl Session {
    pub fn new(
        db: DatabaseConnection,
        registry: Arc<SchemaRegistry>,
        actor: Arc<dyn CurrentActor>,
    ) -> Self {
        Self {
            db,
            registry,
            actor,
            tracked: Vec::new(),
            txn: None,
            staged: Vec::new(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The caller-managed or in-flight transaction, if any.
    pub fn transaction(&self) -> Option<&DatabaseTransaction> {
        self.txn.as_ref()
    }

    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    pub fn actor(&self) -> Arc<dyn CurrentActor> {
        self.actor.clone()
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn has_changes(&self) -> bool {
        self.tracked
            .iter()
            .any(|e| e.state != EntityState::Unchanged)
    }

    /// Tracks a row already present in the database.
    pub fn attach<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        let (schema, key, values) = self.describe(&row)?;
        self.ensure_untracked(&schema, &key)?;
        self.tracked.push(Tracked::new(schema, key, values, row));
        Ok(())
    }

    /// Tracks a new row to be inserted.
    pub fn add<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        let (schema, key, values) = self.describe(&row)?;
        self.ensure_untracked(&schema, &key)?;
        let entry = Tracked::new(schema, key, values, row).added();
        self.tracked.push(entry);
        Ok(())
    }

    /// Records new values for a row, flagging the fields that differ from
    /// what was loaded. An untracked row is assumed fully modified.
    pub fn update<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        let (schema, key, values) = self.describe(&row)?;
        let Some(i) = self.position(schema.name, &key) else {
            let entry = Tracked::new(schema, key, values, row).assumed_modified();
            self.tracked.push(entry);
            return Ok(());
        };

        let entry = &mut self.tracked[i];
        if matches!(entry.state, EntityState::Unchanged | EntityState::Modified) {
            for (flag, (original, current)) in entry
                .modified
                .iter_mut()
                .zip(entry.original.iter().zip(&values))
            {
                *flag |= original != current;
            }
            if entry.modified.iter().any(|f| *f) {
                entry.state = EntityState::Modified;
            }
        }
        entry.current = values;
        entry.writer = writer(row);
        Ok(())
    }

    /// Marks every field modified whether or not its value changed.
    pub fn force_update<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        let (schema, key, values) = self.describe(&row)?;
        let Some(i) = self.position(schema.name, &key) else {
            let entry = Tracked::new(schema, key, values, row).assumed_modified();
            self.tracked.push(entry);
            return Ok(());
        };

        let entry = &mut self.tracked[i];
        if entry.state != EntityState::Added {
            entry.state = EntityState::Modified;
            entry.modified.fill(true);
        }
        entry.current = values;
        entry.writer = writer(row);
        Ok(())
    }

    /// Schedules a row for deletion. A row added in this session is simply
    /// forgotten.
    pub fn remove<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        let (schema, key, values) = self.describe(&row)?;
        match self.position(schema.name, &key) {
            Some(i) if self.tracked[i].state == EntityState::Added => {
                self.tracked.remove(i);
            }
            Some(i) => self.tracked[i].state = EntityState::Deleted,
            None => {
                let entry = Tracked::new(schema, key, values, row).deleted();
                self.tracked.push(entry);
            }
        }
        Ok(())
    }

    /// Stops tracking a row without writing anything.
    pub fn detach<T: Traceable>(&mut self, row: &T) -> Result<(), SessionError> {
        let (schema, key, _) = self.describe(row)?;
        let i = self
            .position(schema.name, &key)
            .ok_or_else(|| SessionError::NotTracked {
                entity: schema.name.to_string(),
                key,
            })?;
        self.tracked.remove(i);
        Ok(())
    }

    pub fn state_of<T: Traceable>(&self, row: &T) -> Option<EntityState> {
        let (schema, key, _) = self.describe(row).ok()?;
        self.position(schema.name, &key)
            .map(|i| self.tracked[i].state)
    }

    pub async fn begin_transaction(&mut self) -> Result<(), SessionError> {
        if self.txn.is_some() {
            return Err(DbErr::Custom("a transaction is already open".into()).into());
        }
        self.txn = Some(self.db.begin().await?);
        tracing::debug!("transaction opened");
        Ok(())
    }

    pub async fn commit_transaction(&mut self) -> Result<(), SessionError> {
        let txn = self.txn.take().ok_or(SessionError::NoTransaction)?;
        txn.commit().await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback_transaction(&mut self) -> Result<(), SessionError> {
        self.staged.clear();
        let txn = self.txn.take().ok_or(SessionError::NoTransaction)?;
        txn.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Writes every tracked change together with its audit trail. Returns the
    /// number of rows written, traces included.
    pub async fn save_changes(&mut self) -> Result<usize, SessionError> {
        let cancel = CancellationToken::new();
        self.save_changes_with_cancel(&cancel).await
    }

    pub async fn save_changes_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<usize, SessionError> {
        SaveCoordinator::new(self.actor.clone())
            .save_async(self, cancel)
            .await
    }

    /// Current state of every tracked row, with relations resolved against
    /// the other tracked rows.
    pub fn change_snapshot(&self) -> ChangeSnapshot {
        let entries = self
            .tracked
            .iter()
            .map(|entry| entry.snapshot(self.relations_of(entry)))
            .collect();
        ChangeSnapshot::new(entries)
    }

    fn relations_of(&self, owner: &Tracked) -> Vec<RelationSnapshot> {
        owner
            .schema
            .relations
            .iter()
            .map(|descriptor| {
                let mut members = self
                    .tracked
                    .iter()
                    .filter(|other| other.schema.name == descriptor.target)
                    .filter(|other| owner.joins(other, descriptor));

                let related = if descriptor.is_collection() {
                    Related::Many(members.map(|m| m.snapshot(Vec::new())).collect())
                } else {
                    match members.next() {
                        Some(m) => Related::One(Box::new(m.snapshot(Vec::new()))),
                        None => Related::Absent,
                    }
                };

                RelationSnapshot {
                    descriptor: descriptor.clone(),
                    related,
                }
            })
            .collect()
    }

    pub(crate) fn stage(&mut self, records: Vec<TraceRecord>) {
        self.staged.extend(records);
    }

    pub(crate) fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// Inserts and updates with referenced rows first, deletes with
    /// referencing rows first, then the staged traces. Tracker state is left
    /// alone; the coordinator accepts it once the save is final.
    pub(crate) async fn write_changes(&mut self) -> Result<usize, SessionError> {
        let staged = std::mem::take(&mut self.staged);
        let txn = self.txn.as_ref().ok_or(SessionError::NoTransaction)?;
        let order = self.write_order();

        let mut rows = 0;
        for entry in order.iter().map(|&i| &self.tracked[i]) {
            match entry.state {
                EntityState::Added => entry.writer.insert(txn).await?,
                EntityState::Modified => entry.writer.update(txn).await?,
                EntityState::Deleted | EntityState::Unchanged => continue,
            }
            rows += 1;
        }
        for entry in order
            .iter()
            .rev()
            .map(|&i| &self.tracked[i])
            .filter(|e| e.state == EntityState::Deleted)
        {
            entry.writer.delete(txn).await?;
            rows += 1;
        }

        let traces = staged.len();
        for record in staged {
            trace::Entity::insert(trace::ActiveModel::from(record))
                .exec(txn)
                .await?;
        }
        rows += traces;

        tracing::debug!(rows, traces, "wrote tracked changes");
        Ok(rows)
    }

    /// Tracked rows ordered so that every row comes after the rows it
    /// references. Rows caught in a reference cycle keep tracking order.
    fn write_order(&self) -> Vec<usize> {
        let n = self.tracked.len();
        let mut after: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];

        for (i, owner) in self.tracked.iter().enumerate() {
            for descriptor in &owner.schema.relations {
                for (j, other) in self.tracked.iter().enumerate() {
                    if i == j
                        || other.schema.name != descriptor.target
                        || !owner.joins(other, descriptor)
                    {
                        continue;
                    }
                    let (first, then) = match descriptor.join {
                        Join::Inverse(_) => (i, j),
                        Join::Forward(_) => (j, i),
                    };
                    if !after[first].contains(&then) {
                        after[first].push(then);
                        pending[then] += 1;
                    }
                }
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];
        while order.len() < n {
            let next = (0..n)
                .find(|&i| !placed[i] && pending[i] == 0)
                .or_else(|| (0..n).find(|&i| !placed[i]));
            let Some(i) = next else { break };
            placed[i] = true;
            order.push(i);
            for &then in &after[i] {
                pending[then] = pending[then].saturating_sub(1);
            }
        }
        order
    }

    pub(crate) fn accept_changes(&mut self) {
        self.tracked.retain(|e| e.state != EntityState::Deleted);
        for entry in &mut self.tracked {
            if entry.state != EntityState::Unchanged {
                entry.state = EntityState::Unchanged;
                entry.original = entry.current.clone();
                entry.modified.fill(false);
            }
        }
    }

    fn describe<T: Traceable>(
        &self,
        row: &T,
    ) -> Result<(Arc<EntitySchema>, String, Vec<Value>), SessionError> {
        let schema = self
            .registry
            .get(T::ENTITY)
            .ok_or_else(|| SessionError::UnknownEntity(T::ENTITY.to_string()))?;

        let values = row.values();
        if values.len() != schema.fields.len() {
            return Err(SessionError::FieldCount {
                entity: T::ENTITY.to_string(),
                expected: schema.fields.len(),
                actual: values.len(),
            });
        }

        let key = schema
            .primary_key_index()
            .and_then(|i| values[i].render())
            .ok_or_else(|| TracerError::MissingPrimaryKey {
                entity: T::ENTITY.to_string(),
            })?;

        Ok((schema, key, values))
    }

    fn position(&self, entity: &str, key: &str) -> Option<usize> {
        self.tracked
            .iter()
            .position(|e| e.schema.name == entity && e.key == key)
    }

    fn ensure_untracked(&self, schema: &EntitySchema, key: &str) -> Result<(), SessionError> {
        match self.position(schema.name, key) {
            Some(_) => Err(SessionError::AlreadyTracked {
                entity: schema.name.to_string(),
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AsyncUnitOfWork for Session {
    type Output = usize;
    type Error = SessionError;

    fn snapshot(&self) -> Result<ChangeSnapshot, SessionError> {
        Ok(self.change_snapshot())
    }

    fn in_transaction(&self) -> bool {
        Session::in_transaction(self)
    }

    async fn begin_transaction(&mut self) -> Result<(), SessionError> {
        Session::begin_transaction(self).await
    }

    async fn commit_transaction(&mut self) -> Result<(), SessionError> {
        Session::commit_transaction(self).await
    }

    async fn rollback_transaction(&mut self) -> Result<(), SessionError> {
        Session::rollback_transaction(self).await
    }

    fn stage_traces(&mut self, records: Vec<TraceRecord>) {
        self.stage(records);
    }

    async fn commit_changes(&mut self) -> Result<usize, SessionError> {
        self.write_changes().await
    }

    fn discard_staged(&mut self) {
        Session::discard_staged(self);
    }

    fn accept_changes(&mut self) {
        Session::accept_changes(self);
    }
}
