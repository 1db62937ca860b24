use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

/// Header the upstream identity gateway sets on every authenticated
/// request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, resolved once per request and carried as a typed
/// request extension.
#[derive(Debug, Clone, Copy, Serialize, TS)]
pub struct CurrentUser {
    pub id: i64,
}

fn parse_user_id(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let id = trimmed.parse::<i64>().ok()?;
    if id <= 0 {
        return None;
    }
    Some(id)
}

fn extract_current_user(req: &Request) -> Option<CurrentUser> {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_user_id)
        .map(|id| CurrentUser { id })
}

pub async fn require_user(mut req: Request, next: Next) -> Response {
    match extract_current_user(&req) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            let response = ApiResponse::<()>::error("Missing or invalid caller identity");
            (StatusCode::UNAUTHORIZED, Json(response)).into_response()
        }
    }
}
