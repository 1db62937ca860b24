use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Select, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::entities::task;
pub use crate::types::TaskStatus;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    TaskNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub status: TaskStatus,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub name: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            deadline: model.deadline,
            status: model.status,
            created_date: model.created_date,
            updated_date: model.updated_date,
        }
    }
}

impl Task {
    /// Base query for live rows. Soft-deleted tasks are invisible to every
    /// read and mutation except `create`.
    fn find_active() -> Select<task::Entity> {
        task::Entity::find().filter(task::Column::DeletedDate.is_null())
    }

    async fn active_model_by_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<task::Model, TaskError> {
        Self::find_active()
            .filter(task::Column::Id.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        user_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = task::ActiveModel {
            user_id: Set(user_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            deadline: Set(data.deadline),
            status: Set(TaskStatus::New),
            created_date: Set(now),
            updated_date: Set(now),
            deleted_date: Set(None),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(model.into())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = Self::find_active()
            .filter(task::Column::Id.eq(id))
            .one(db)
            .await?;

        Ok(record.map(Self::from))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        name: String,
        description: Option<String>,
        deadline: DateTime<Utc>,
        status: TaskStatus,
    ) -> Result<Self, TaskError> {
        let record = Self::active_model_by_id(db, id).await?;

        let mut active: task::ActiveModel = record.into();
        active.name = Set(name);
        active.description = Set(description);
        active.deadline = Set(deadline);
        active.status = Set(status);
        active.updated_date = Set(Utc::now());

        let updated = active.update(db).await?;
        Ok(updated.into())
    }

    pub async fn mark_completed<C: ConnectionTrait>(db: &C, id: i64) -> Result<Self, TaskError> {
        let record = Self::active_model_by_id(db, id).await?;

        let mut active: task::ActiveModel = record.into();
        active.status = Set(TaskStatus::Done);
        active.updated_date = Set(Utc::now());

        let updated = active.update(db).await?;
        Ok(updated.into())
    }

    /// Soft delete. Returns the number of live rows that matched; callers
    /// decide what zero means.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = task::Entity::update_many()
            .col_expr(task::Column::DeletedDate, Expr::value(Utc::now()))
            .filter(task::Column::Id.eq(id))
            .filter(task::Column::DeletedDate.is_null())
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let models = Self::find_active()
            .filter(task::Column::UserId.eq(user_id))
            .order_by_desc(task::Column::CreatedDate)
            .all(db)
            .await?;

        Ok(models.into_iter().map(Self::from).collect())
    }
}
