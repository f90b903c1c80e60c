use std::future::Future;
use std::sync::Arc;

use sea_orm::{ConnectOptions, DatabaseConnection};
use tokio::runtime::{Builder, Runtime};
use tracer_core::{
    ChangeSnapshot, CurrentActor, EntityState, SaveCoordinator, SchemaRegistry, TraceRecord,
    UnitOfWork,
};

use crate::error::SessionError;
use crate::session::Session;
use crate::traceable::Traceable;

/// [`Session`] driven from synchronous code through an owned
/// current-thread runtime. Must not be used from inside another runtime.
pub struct BlockingSession {
    runtime: Runtime,
    session: Session,
}

impl BlockingSession {
    pub fn connect(
        options: impl Into<ConnectOptions>,
        registry: Arc<SchemaRegistry>,
        actor: Arc<dyn CurrentActor>,
    ) -> Result<Self, SessionError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SessionError::Runtime)?;
        let db = runtime.block_on(crate::connect(options))?;
        Ok(Self {
            runtime,
            session: Session::new(db, registry, actor),
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.session.db()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs a future on the session's runtime, e.g. a query against `db()`.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn attach<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        self.session.attach(row)
    }

    pub fn add<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        self.session.add(row)
    }

    pub fn update<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        self.session.update(row)
    }

    pub fn force_update<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        self.session.force_update(row)
    }

    pub fn remove<T: Traceable>(&mut self, row: T) -> Result<(), SessionError> {
        self.session.remove(row)
    }

    pub fn state_of<T: Traceable>(&self, row: &T) -> Option<EntityState> {
        self.session.state_of(row)
    }

    pub fn begin_transaction(&mut self) -> Result<(), SessionError> {
        self.runtime.block_on(self.session.begin_transaction())
    }

    pub fn commit_transaction(&mut self) -> Result<(), SessionError> {
        self.runtime.block_on(self.session.commit_transaction())
    }

    pub fn rollback_transaction(&mut self) -> Result<(), SessionError> {
        self.runtime.block_on(self.session.rollback_transaction())
    }

    pub fn save_changes(&mut self) -> Result<usize, SessionError> {
        SaveCoordinator::new(self.session.actor()).save(self)
    }
}

impl UnitOfWork for BlockingSession {
    type Output = usize;
    type Error = SessionError;

    fn snapshot(&self) -> Result<ChangeSnapshot, SessionError> {
        Ok(self.session.change_snapshot())
    }

    fn in_transaction(&self) -> bool {
        self.session.in_transaction()
    }

    fn begin_transaction(&mut self) -> Result<(), SessionError> {
        BlockingSession::begin_transaction(self)
    }

    fn commit_transaction(&mut self) -> Result<(), SessionError> {
        BlockingSession::commit_transaction(self)
    }

    fn rollback_transaction(&mut self) -> Result<(), SessionError> {
        BlockingSession::rollback_transaction(self)
    }

    fn stage_traces(&mut self, records: Vec<TraceRecord>) {
        self.session.stage(records);
    }

    fn commit_changes(&mut self) -> Result<usize, SessionError> {
        self.runtime.block_on(self.session.write_changes())
    }

    fn discard_staged(&mut self) {
        self.session.discard_staged();
    }

    fn accept_changes(&mut self) {
        self.session.accept_changes();
    }
}
