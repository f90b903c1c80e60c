use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_trace_entity_id")
                    .table(Trace::Table)
                    .col(Trace::EntityId)
                    .col(Trace::ActionAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trace_entity_name")
                    .table(Trace::Table)
                    .col(Trace::EntityName)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_trace_entity_name")
                    .table(Trace::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_trace_entity_id")
                    .table(Trace::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Trace {
    Table,
    EntityId,
    EntityName,
    ActionAt,
}
