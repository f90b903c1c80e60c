//! Turns a change-tracking snapshot into audit trace records.
//!
//! The pipeline is pure up to [`SaveCoordinator`], which stages the records
//! into the caller's unit of work so they commit or roll back together with
//! the changes they describe.

pub mod action;
pub mod actor;
pub mod assembler;
pub mod builder;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod payload;
pub mod relation;
pub mod schema;
pub mod snapshot;
pub mod value;

pub use action::{Action, ParseActionError};
pub use actor::{ActorFn, Anonymous, CurrentActor, FixedActor};
pub use assembler::{TraceRecord, assemble};
pub use builder::{TraceDraft, build_draft, build_drafts};
pub use coordinator::{AsyncUnitOfWork, SaveCoordinator, UnitOfWork};
pub use error::TracerError;
pub use payload::{Payload, PayloadValue};
pub use schema::{
    Cardinality, EntitySchema, FieldDescriptor, Join, RelationDescriptor, SchemaRegistry,
};
pub use snapshot::{
    ChangeSnapshot, EntityState, EntrySnapshot, PropertySnapshot, Related, RelationSnapshot,
};
pub use value::Value;

pub use tokio_util::sync::CancellationToken;
