use thiserror::Error;

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("{entity} has no primary key value")]
    MissingPrimaryKey { entity: String },

    #[error("{entity} primary key `{value}` is not a uuid")]
    InvalidPrimaryKey { entity: String, value: String },

    #[error("entity type {0} is registered twice")]
    DuplicateEntity(String),

    #[error("{entity} declares {count} primary keys, expected exactly one")]
    PrimaryKeyCount { entity: String, count: usize },

    #[error("{entity}.{relation} targets unregistered entity type {target}")]
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("{entity}.{relation} joins on undeclared field {field}")]
    UnknownJoinField {
        entity: String,
        relation: String,
        field: String,
    },

    #[error("failed to serialize trace payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("save was cancelled")]
    Cancelled,
}

impl TracerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
