//! Wraps the persistence layer's commit so that trace records land in the
//! same transaction as the changes they describe.

use std::fmt::Display;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::actor::CurrentActor;
use crate::assembler::{TraceRecord, assemble};
use crate::builder::build_drafts;
use crate::error::TracerError;
use crate::snapshot::ChangeSnapshot;

/// Blocking unit of work exposed by the persistence layer.
pub trait UnitOfWork {
    type Output;
    type Error: From<TracerError> + Display;

    fn snapshot(&self) -> Result<ChangeSnapshot, Self::Error>;
    fn in_transaction(&self) -> bool;
    fn begin_transaction(&mut self) -> Result<(), Self::Error>;
    fn commit_transaction(&mut self) -> Result<(), Self::Error>;
    fn rollback_transaction(&mut self) -> Result<(), Self::Error>;
    /// Queues records to be written by the next `commit_changes`.
    fn stage_traces(&mut self, records: Vec<TraceRecord>);
    fn commit_changes(&mut self) -> Result<Self::Output, Self::Error>;
    /// Drops records staged by a save that did not go through.
    fn discard_staged(&mut self) {}
    /// The save is final: the owned transaction committed, or the caller's
    /// transaction took the writes.
    fn accept_changes(&mut self) {}
}

/// Async counterpart of [`UnitOfWork`].
#[async_trait]
pub trait AsyncUnitOfWork: Send {
    type Output: Send;
    type Error: From<TracerError> + Display + Send;

    fn snapshot(&self) -> Result<ChangeSnapshot, Self::Error>;
    fn in_transaction(&self) -> bool;
    async fn begin_transaction(&mut self) -> Result<(), Self::Error>;
    async fn commit_transaction(&mut self) -> Result<(), Self::Error>;
    async fn rollback_transaction(&mut self) -> Result<(), Self::Error>;
    fn stage_traces(&mut self, records: Vec<TraceRecord>);
    async fn commit_changes(&mut self) -> Result<Self::Output, Self::Error>;
    fn discard_staged(&mut self) {}
    fn accept_changes(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct SaveCoordinator<A> {
    actor: A,
}

impl<A: CurrentActor> SaveCoordinator<A> {
    pub fn new(actor: A) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    /// Runs the audit pipeline over a snapshot. No I/O.
    pub fn trace(&self, snapshot: &ChangeSnapshot) -> Result<Vec<TraceRecord>, TracerError> {
        let actor = self.actor.name();
        let drafts = build_drafts(snapshot, actor.as_deref(), Utc::now())?;
        assemble(drafts)
    }

    fn stage<E: From<TracerError>>(
        &self,
        snapshot: Result<ChangeSnapshot, E>,
    ) -> Result<Vec<TraceRecord>, E> {
        let records = self.trace(&snapshot?)?;
        tracing::debug!(records = records.len(), "staging traces");
        Ok(records)
    }

    pub fn save<U: UnitOfWork>(&self, uow: &mut U) -> Result<U::Output, U::Error> {
        let owned = !uow.in_transaction();
        if owned {
            uow.begin_transaction()?;
        }

        let result = self.stage(uow.snapshot()).and_then(|records| {
            uow.stage_traces(records);
            uow.commit_changes()
        });

        match result {
            Ok(output) => {
                if owned {
                    uow.commit_transaction()?;
                }
                uow.accept_changes();
                Ok(output)
            }
            Err(err) => {
                uow.discard_staged();
                if owned && let Err(rollback) = uow.rollback_transaction() {
                    tracing::warn!(error = %rollback, "rollback after failed save also failed");
                }
                Err(err)
            }
        }
    }

    /// Cancellation is honoured before the transaction opens and while the
    /// transaction is opening or the underlying commit runs. Staged records
    /// are discarded and an owned transaction is rolled back before
    /// `TracerError::Cancelled` is returned.
    pub async fn save_async<U: AsyncUnitOfWork>(
        &self,
        uow: &mut U,
        cancel: &CancellationToken,
    ) -> Result<U::Output, U::Error> {
        if cancel.is_cancelled() {
            return Err(TracerError::Cancelled.into());
        }

        let owned = !uow.in_transaction();
        if owned {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TracerError::Cancelled.into()),
                begun = uow.begin_transaction() => begun?,
            }
        }

        let result = match self.stage(uow.snapshot()) {
            Ok(records) => {
                uow.stage_traces(records);
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(TracerError::Cancelled.into()),
                    committed = uow.commit_changes() => committed,
                }
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(output) => {
                if owned {
                    uow.commit_transaction().await?;
                }
                uow.accept_changes();
                Ok(output)
            }
            Err(err) => {
                uow.discard_staged();
                if owned && let Err(rollback) = uow.rollback_transaction().await {
                    tracing::warn!(error = %rollback, "rollback after failed save also failed");
                }
                Err(err)
            }
        }
    }
}

impl Default for SaveCoordinator<crate::actor::Anonymous> {
    fn default() -> Self {
        Self::new(crate::actor::Anonymous)
    }
}
