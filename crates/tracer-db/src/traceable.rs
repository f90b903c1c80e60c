use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait, Iterable,
    PrimaryKeyToColumn, QueryFilter,
};
use tracer_core::{EntitySchema, Value};

/// A sea-orm model the session can track and audit.
///
/// `values` must line up with the fields declared by `schema`.
pub trait Traceable: Clone + Send + Sync + 'static {
    type ActiveModel: ActiveModelTrait + Send + Sync + 'static;

    /// Type name recorded as `entity_name`.
    const ENTITY: &'static str;

    fn schema() -> EntitySchema;

    fn values(&self) -> Vec<Value>;

    fn active_model(&self) -> Self::ActiveModel;
}

type EntityOf<T> = <<T as Traceable>::ActiveModel as ActiveModelTrait>::Entity;

/// Type-erased writes for one tracked row.
#[async_trait]
pub(crate) trait RowWriter: Send + Sync {
    async fn insert(&self, txn: &DatabaseTransaction) -> Result<(), DbErr>;
    async fn update(&self, txn: &DatabaseTransaction) -> Result<(), DbErr>;
    async fn delete(&self, txn: &DatabaseTransaction) -> Result<(), DbErr>;
}

struct Row<T>(T);

pub(crate) fn writer<T: Traceable>(row: T) -> Box<dyn RowWriter> {
    Box::new(Row(row))
}

#[async_trait]
impl<T: Traceable> RowWriter for Row<T> {
    async fn insert(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let model = self.0.active_model().reset_all();
        <EntityOf<T> as EntityTrait>::insert(model).exec(txn).await?;
        Ok(())
    }

    async fn update(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let model = self.0.active_model().reset_all();
        let filter = key_filter::<T>(&model)?;
        let result = <EntityOf<T> as EntityTrait>::update_many()
            .set(model)
            .filter(filter)
            .exec(txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(DbErr::RecordNotUpdated);
        }
        Ok(())
    }

    async fn delete(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let result = <EntityOf<T> as EntityTrait>::delete(self.0.active_model())
            .exec(txn)
            .await?;
        if result.rows_affected == 0 {
            let missing = format!("{} row to delete", T::ENTITY);
            return Err(DbErr::RecordNotFound(missing));
        }
        Ok(())
    }
}

fn key_filter<T: Traceable>(model: &T::ActiveModel) -> Result<Condition, DbErr> {
    let mut filter = Condition::all();
    for key in <<EntityOf<T> as EntityTrait>::PrimaryKey as Iterable>::iter() {
        let column = key.into_column();
        let Some(value) = model.get(column).into_value() else {
            let missing = format!("{} has no primary key value", T::ENTITY);
            return Err(DbErr::Custom(missing));
        };
        filter = filter.add(column.eq(value));
    }
    Ok(filter)
}
