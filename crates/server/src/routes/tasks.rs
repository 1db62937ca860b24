use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use db::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, http::auth::CurrentUser, middleware::load_task_middleware};

/// Wire shape of a task. Lifecycle timestamps stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub status: TaskStatus,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            name: task.name,
            description: task.description,
            deadline: task.deadline,
            status: task.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    // Accepted for shape compatibility; new tasks always start as `new`.
    pub status: Option<TaskStatus>,
}

fn ensure_owner(task: &Task, user: &CurrentUser) -> Result<(), ApiError> {
    if task.user_id != user.id {
        return Err(ApiError::Forbidden("access denied".to_string()));
    }
    Ok(())
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<TaskResponse>>), ApiError> {
    tracing::debug!(user_id = user.id, "Creating task '{}'", payload.name);

    let data = CreateTask {
        name: payload.name,
        description: payload.description,
        deadline: payload.deadline,
    };
    let task = state.task_service().save(&data, user.id).await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(task.into())),
    ))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
    Extension(user): Extension<CurrentUser>,
) -> Result<ResponseJson<ApiResponse<TaskResponse>>, ApiError> {
    ensure_owner(&task, &user)?;
    Ok(ResponseJson(ApiResponse::success(task.into())))
}

pub async fn update_task(
    Extension(existing_task): Extension<Task>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<TaskResponse>>, ApiError> {
    ensure_owner(&existing_task, &user)?;

    // Use existing values if not provided in update
    let name = payload.name.unwrap_or(existing_task.name);
    let description = match payload.description {
        Some(s) if s.trim().is_empty() => None, // Empty string = clear description
        Some(s) => Some(s),                     // Non-empty string = update description
        None => existing_task.description,      // Field omitted = keep existing
    };
    let deadline = payload.deadline.unwrap_or(existing_task.deadline);
    let status = payload.status.unwrap_or(existing_task.status);

    let task = state
        .task_service()
        .update(existing_task.id, name, description, deadline, status)
        .await?;

    Ok(ResponseJson(ApiResponse::success(task.into())))
}

pub async fn complete_task(
    Extension(task): Extension<Task>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskResponse>>, ApiError> {
    ensure_owner(&task, &user)?;

    let task = state.task_service().mark_completed(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(task.into())))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_owner(&task, &user)?;

    state.task_service().delete(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_tasks(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskListResponse>>, ApiError> {
    let tasks = state.task_service().find_for_user(user.id).await?;

    Ok(ResponseJson(ApiResponse::success(TaskListResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    })))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_actions_router = Router::new()
        .route("/", put(update_task))
        .route("/", delete(delete_task))
        .route("/complete", post(complete_task));

    let task_id_router = Router::new()
        .route("/", get(get_task))
        .merge(task_actions_router)
        .layer(from_fn_with_state(state.clone(), load_task_middleware::<AppState>));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use db::DBService;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::AppState;

    async fn setup_app() -> Router {
        let db = DBService::new("sqlite::memory:").await.unwrap();
        crate::http::router(AppState::new(db))
    }

    fn request(method: &str, uri: &str, user_id: Option<i64>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id.to_string());
        }
        match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_task_for(app: &Router, user_id: i64, name: &str) -> i64 {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/tasks",
                Some(user_id),
                Some(json!({
                    "name": name,
                    "deadline": "2024-01-01T00:00:00Z",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_forces_owner_and_new_status() {
        let app = setup_app().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/tasks",
                Some(7),
                Some(json!({
                    "name": "Write spec",
                    "deadline": "2024-01-01T00:00:00Z",
                    "status": "done",
                    "user_id": 999,
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["user_id"], json!(7));
        assert_eq!(body["data"]["status"], json!("new"));
        assert_ne!(body["data"]["id"], json!(0));
        // lifecycle timestamps never leave the server
        assert!(body["data"].get("created_date").is_none());
        assert!(body["data"].get("updated_date").is_none());
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let app = setup_app().await;

        let response = app
            .clone()
            .oneshot(request("GET", "/api/tasks", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn foreign_caller_cannot_read_task() {
        let app = setup_app().await;
        let task_id = create_task_for(&app, 7, "private").await;

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/tasks/{task_id}"),
                Some(8),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn update_preserves_identity() {
        let app = setup_app().await;
        let task_id = create_task_for(&app, 7, "draft").await;

        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{task_id}"),
                Some(7),
                Some(json!({
                    "name": "final",
                    "status": "inprogress",
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["id"], json!(task_id));
        assert_eq!(body["data"]["user_id"], json!(7));
        assert_eq!(body["data"]["name"], json!("final"));
        assert_eq!(body["data"]["status"], json!("inprogress"));
    }

    #[tokio::test]
    async fn update_keeps_omitted_description_and_clears_blank_one() {
        let app = setup_app().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/tasks",
                Some(7),
                Some(json!({
                    "name": "groceries",
                    "description": "milk, eggs",
                    "deadline": "2024-01-01T00:00:00Z",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let task_id = body_json(response).await["data"]["id"].as_i64().unwrap();

        // Field omitted = keep existing
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{task_id}"),
                Some(7),
                Some(json!({ "name": "weekend groceries" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["description"], json!("milk, eggs"));

        // Blank string = clear description
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{task_id}"),
                Some(7),
                Some(json!({ "description": "  " })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["data"]["description"].is_null());
    }

    #[tokio::test]
    async fn update_by_foreign_caller_is_forbidden() {
        let app = setup_app().await;
        let task_id = create_task_for(&app, 7, "draft").await;

        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{task_id}"),
                Some(8),
                Some(json!({ "name": "hijacked" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn complete_marks_task_done() {
        let app = setup_app().await;
        let task_id = create_task_for(&app, 7, "finish me").await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/tasks/{task_id}/complete"),
                Some(7),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], json!("done"));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let app = setup_app().await;
        let task_id = create_task_for(&app, 7, "short-lived").await;

        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/tasks/{task_id}"),
                Some(7),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/tasks/{task_id}"),
                Some(7),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_by_foreign_caller_is_forbidden() {
        let app = setup_app().await;
        let task_id = create_task_for(&app, 7, "keep out").await;

        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/tasks/{task_id}"),
                Some(8),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn list_returns_only_live_tasks_of_caller() {
        let app = setup_app().await;
        let keep_id = create_task_for(&app, 7, "keep").await;
        let drop_id = create_task_for(&app, 7, "drop").await;
        create_task_for(&app, 8, "other user").await;

        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/tasks/{drop_id}"),
                Some(7),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/tasks", Some(7), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let tasks = body["data"]["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["id"], json!(keep_id));
    }

    #[tokio::test]
    async fn get_missing_task_is_not_found() {
        let app = setup_app().await;

        let response = app
            .clone()
            .oneshot(request("GET", "/api/tasks/4242", Some(7), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
