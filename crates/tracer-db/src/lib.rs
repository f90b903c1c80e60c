pub use sea_orm;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub mod blocking;
pub mod config;
pub mod entities;
pub mod error;
pub mod query;
pub mod session;
pub mod traceable;
pub mod view;

pub use blocking::BlockingSession;
pub use config::TracerConfig;
pub use error::{SessionError, TraceViewError};
pub use session::Session;
pub use traceable::Traceable;
pub use view::{FieldChange, TraceView};

pub async fn connect(
    options: impl Into<ConnectOptions>,
) -> Result<DatabaseConnection, sea_orm::DbErr> {
    Database::connect(options).await
}

/// Connects and, when configured, brings the trace table up to date.
pub async fn init(config: &TracerConfig) -> anyhow::Result<DatabaseConnection> {
    let db = connect(config.database_url.as_str()).await?;

    if config.migrate {
        tracer_migration::Migrator::up(&db, None).await?;
        tracing::info!("trace migrations applied");
    }

    Ok(db)
}
