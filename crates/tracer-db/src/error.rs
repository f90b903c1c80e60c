use sea_orm::DbErr;
use thiserror::Error;
use tracer_core::{ParseActionError, TracerError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Db(#[from] DbErr),

    #[error(transparent)]
    Tracer(#[from] TracerError),

    #[error("entity type {0} is not registered")]
    UnknownEntity(String),

    #[error("{entity} {key} is already tracked")]
    AlreadyTracked { entity: String, key: String },

    #[error("{entity} {key} is not tracked")]
    NotTracked { entity: String, key: String },

    #[error("{entity} produced {actual} values for {expected} declared fields")]
    FieldCount {
        entity: String,
        expected: usize,
        actual: usize,
    },

    #[error("no transaction is open")]
    NoTransaction,

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Tracer(e) if e.is_cancelled())
    }
}

#[derive(Debug, Error)]
pub enum TraceViewError {
    #[error("stored payload does not match the requested shape: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Action(#[from] ParseActionError),
}
