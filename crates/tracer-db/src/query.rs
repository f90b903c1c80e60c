use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::trace;

/// Every trace recorded for one entity, oldest first.
pub async fn traces_for_entity<C: ConnectionTrait>(
    db: &C,
    entity_id: Uuid,
) -> Result<Vec<trace::Model>, DbErr> {
    trace::Entity::find()
        .filter(trace::Column::EntityId.eq(entity_id))
        .order_by_asc(trace::Column::ActionAt)
        .all(db)
        .await
}

/// Every trace recorded for one entity type, oldest first.
pub async fn traces_for_entity_name<C: ConnectionTrait>(
    db: &C,
    entity_name: &str,
) -> Result<Vec<trace::Model>, DbErr> {
    trace::Entity::find()
        .filter(trace::Column::EntityName.eq(entity_name))
        .order_by_asc(trace::Column::ActionAt)
        .all(db)
        .await
}
