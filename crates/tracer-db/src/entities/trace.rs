use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::de::DeserializeOwned;
use tracer_core::{Action, ParseActionError, TraceRecord};

use crate::error::TraceViewError;
use crate::view::TraceView;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trace")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity_id: Uuid,
    pub entity_name: String,
    #[sea_orm(column_type = "Text")]
    pub entity_data: String,
    pub action: String,
    pub action_at: DateTimeUtc,
    pub action_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<TraceRecord> for ActiveModel {
    fn from(record: TraceRecord) -> Self {
        Self {
            id: Set(record.id),
            entity_id: Set(record.entity_id),
            entity_name: Set(record.entity_name),
            entity_data: Set(record.entity_data),
            action: Set(record.action.as_str().to_string()),
            action_at: Set(record.action_at),
            action_by: Set(record.action_by),
        }
    }
}

impl Model {
    pub fn action(&self) -> Result<Action, ParseActionError> {
        self.action.parse()
    }

    /// Decodes the stored payload into `T`.
    pub fn view<T: DeserializeOwned>(&self) -> Result<TraceView<T>, TraceViewError> {
        Ok(TraceView {
            id: self.id,
            entity_id: self.entity_id,
            entity_name: self.entity_name.clone(),
            entity_data: serde_json::from_str(&self.entity_data)?,
            action: self.action()?,
            action_at: self.action_at,
            action_by: self.action_by.clone(),
        })
    }
}
