use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trace::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trace::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Trace::EntityId).uuid().not_null())
                    .col(ColumnDef::new(Trace::EntityName).string().not_null())
                    .col(ColumnDef::new(Trace::EntityData).text().not_null())
                    .col(ColumnDef::new(Trace::Action).string().not_null())
                    .col(
                        ColumnDef::new(Trace::ActionAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Trace::ActionBy).string().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trace::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Trace {
    Table,
    Id,
    EntityId,
    EntityName,
    EntityData,
    Action,
    ActionAt,
    ActionBy,
}
