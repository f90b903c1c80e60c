#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{
    ConnectOptions, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Schema,
};
use sea_orm_migration::MigratorTrait;
use tracer_core::{CurrentActor, FixedActor, SchemaRegistry};
use tracer_db::Session;
use tracer_db::entities::trace;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One pooled connection so every query sees the same in-memory database.
pub fn memory_options() -> ConnectOptions {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    options
}

pub async fn create_schema(db: &DatabaseConnection) {
    tracer_migration::Migrator::up(db, None)
        .await
        .expect("trace migrations");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    for stmt in [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(teams::Entity),
        schema.create_table_from_entity(members::Entity),
        schema.create_table_from_entity(clients::Entity),
        schema.create_table_from_entity(projects::Entity),
    ] {
        db.execute(backend.build(&stmt))
            .await
            .expect("fixture table");
    }
}

pub async fn memory_db() -> DatabaseConnection {
    init_tracing();
    let db = tracer_db::connect(memory_options())
        .await
        .expect("sqlite connection");
    create_schema(&db).await;
    db
}

pub fn registry() -> Arc<SchemaRegistry> {
    use tracer_db::Traceable;

    let mut registry = SchemaRegistry::new();
    registry
        .register(users::Model::schema())
        .expect("users")
        .register(teams::Model::schema())
        .expect("teams")
        .register(members::Model::schema())
        .expect("members")
        .register(clients::Model::schema())
        .expect("clients")
        .register(projects::Model::schema())
        .expect("projects");
    registry.validate().expect("valid schema");
    Arc::new(registry)
}

pub fn actor() -> Arc<dyn CurrentActor> {
    Arc::new(FixedActor("test-user".to_string()))
}

pub async fn session() -> Session {
    Session::new(memory_db().await, registry(), actor())
}

pub async fn trace_count(db: &DatabaseConnection) -> u64 {
    row_count::<trace::Entity>(db).await
}

pub async fn row_count<E: EntityTrait>(db: &DatabaseConnection) -> u64
where
    E::Model: Sync,
{
    E::find().count(db).await.expect("count rows")
}

pub mod users {
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use tracer_core::{EntitySchema, Value};
    use tracer_db::Traceable;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
        pub user_name: String,
        pub nickname: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn new(name: &str, user_name: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                name: name.to_string(),
                user_name: user_name.to_string(),
                nickname: None,
            }
        }
    }

    impl Traceable for Model {
        type ActiveModel = ActiveModel;
        const ENTITY: &'static str = "User";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::ENTITY)
                .key("id")
                .field("name")
                .field("user_name")
                .field("nickname")
        }

        fn values(&self) -> Vec<Value> {
            vec![
                self.id.into(),
                self.name.clone().into(),
                self.user_name.clone().into(),
                self.nickname.clone().into(),
            ]
        }

        fn active_model(&self) -> ActiveModel {
            self.clone().into_active_model()
        }
    }
}

pub mod teams {
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use tracer_core::{EntitySchema, Value};
    use tracer_db::Traceable;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "teams")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Traceable for Model {
        type ActiveModel = ActiveModel;
        const ENTITY: &'static str = "Team";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::ENTITY)
                .key("id")
                .field("name")
                .has_many("members", "Member", "team_id")
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.into(), self.name.clone().into()]
        }

        fn active_model(&self) -> ActiveModel {
            self.clone().into_active_model()
        }
    }
}

/// Persisted with its team but only ever audited through it.
pub mod members {
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use tracer_core::{EntitySchema, Value};
    use tracer_db::Traceable;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "members")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub team_id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::teams::Entity",
            from = "Column::TeamId",
            to = "super::teams::Column::Id"
        )]
        Team,
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn new(team_id: Uuid, name: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                team_id,
                name: name.to_string(),
            }
        }
    }

    impl Traceable for Model {
        type ActiveModel = ActiveModel;
        const ENTITY: &'static str = "Member";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::ENTITY)
                .untraced()
                .key("id")
                .field("team_id")
                .field("name")
        }

        fn values(&self) -> Vec<Value> {
            vec![
                self.id.into(),
                self.team_id.into(),
                self.name.clone().into(),
            ]
        }

        fn active_model(&self) -> ActiveModel {
            self.clone().into_active_model()
        }
    }
}

/// Only ever audited through the projects that reference it.
pub mod clients {
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use tracer_core::{EntitySchema, Value};
    use tracer_db::Traceable;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "clients")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn new(name: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                name: name.to_string(),
            }
        }
    }

    impl Traceable for Model {
        type ActiveModel = ActiveModel;
        const ENTITY: &'static str = "Client";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::ENTITY)
                .untraced()
                .key("id")
                .field("name")
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.into(), self.name.clone().into()]
        }

        fn active_model(&self) -> ActiveModel {
            self.clone().into_active_model()
        }
    }
}

pub mod projects {
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use tracer_core::{EntitySchema, Value};
    use tracer_db::Traceable;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "projects")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
        pub client_id: Uuid,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::clients::Entity",
            from = "Column::ClientId",
            to = "super::clients::Column::Id"
        )]
        Client,
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        pub fn new(client_id: Uuid, name: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                name: name.to_string(),
                client_id,
            }
        }
    }

    impl Traceable for Model {
        type ActiveModel = ActiveModel;
        const ENTITY: &'static str = "Project";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::ENTITY)
                .key("id")
                .field("name")
                .field("client_id")
                .belongs_to("client", "Client", "client_id")
        }

        fn values(&self) -> Vec<Value> {
            vec![
                self.id.into(),
                self.name.clone().into(),
                self.client_id.into(),
            ]
        }

        fn active_model(&self) -> ActiveModel {
            self.clone().into_active_model()
        }
    }
}
