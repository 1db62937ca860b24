use chrono::{DateTime, Utc};
use db::{
    DBService, DbErr,
    models::task::{CreateTask, Task, TaskError, TaskStatus},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error("Task not found")]
    TaskNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type Result<T> = std::result::Result<T, TaskServiceError>;

impl From<TaskError> for TaskServiceError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::TaskNotFound => TaskServiceError::TaskNotFound,
            TaskError::Database(db_err) => TaskServiceError::Database(db_err),
        }
    }
}

/// Forwarding layer over the task store. Adds no business rules; its job
/// is logging failures and turning missing rows into typed errors.
#[derive(Clone)]
pub struct TaskService {
    db: DBService,
}

impl TaskService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    fn fail(op: &'static str, err: impl Into<TaskServiceError>) -> TaskServiceError {
        let err = err.into();
        tracing::error!(op, error = %err, "TaskService operation failed");
        err
    }

    pub async fn save(&self, data: &CreateTask, user_id: i64) -> Result<Task> {
        Task::create(&self.db.pool, data, user_id)
            .await
            .map_err(|err| Self::fail("save", err))
    }

    pub async fn find(&self, id: i64) -> Result<Task> {
        Task::find_by_id(&self.db.pool, id)
            .await
            .map_err(|err| Self::fail("find", err))?
            .ok_or(TaskServiceError::TaskNotFound)
    }

    pub async fn update(
        &self,
        id: i64,
        name: String,
        description: Option<String>,
        deadline: DateTime<Utc>,
        status: TaskStatus,
    ) -> Result<Task> {
        Task::update(&self.db.pool, id, name, description, deadline, status)
            .await
            .map_err(|err| Self::fail("update", err))
    }

    pub async fn mark_completed(&self, id: i64) -> Result<Task> {
        Task::mark_completed(&self.db.pool, id)
            .await
            .map_err(|err| Self::fail("mark_completed", err))
    }

    /// Soft-deletes the task. A task that is absent or already deleted
    /// surfaces as `TaskNotFound`, matching the other mutations.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let rows = Task::delete(&self.db.pool, id)
            .await
            .map_err(|err| Self::fail("delete", err))?;
        if rows == 0 {
            return Err(TaskServiceError::TaskNotFound);
        }
        Ok(())
    }

    pub async fn find_for_user(&self, user_id: i64) -> Result<Vec<Task>> {
        Task::find_for_user(&self.db.pool, user_id)
            .await
            .map_err(|err| Self::fail("find_for_user", err))
    }
}
