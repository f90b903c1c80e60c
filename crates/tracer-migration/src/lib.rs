use sea_orm_migration::prelude::*;

mod m0001_create_trace;
mod m0002_add_trace_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0001_create_trace::Migration),
            Box::new(m0002_add_trace_lookup_indexes::Migration),
        ]
    }
}
