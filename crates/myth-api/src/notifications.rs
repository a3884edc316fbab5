use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use myth_db::filter::Page;
use myth_db::models::NotificationFilter;
use myth_types::api::{MarkAllReadResponse, StatusResponse};
use myth_types::models::Notification;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::middleware::AuthUser;
use crate::query::loose_bool;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default, deserialize_with = "loose_bool")]
    pub is_read: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiQuery(q): ApiQuery<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let filter = NotificationFilter {
        is_read: q.is_read,
        page: Page::new(q.limit, q.offset),
    };
    let rows = blocking(&state, move |db| db.list_notifications(user.id, &filter)).await?;
    Ok(Json(rows))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<Notification>> {
    blocking(&state, move |db| db.get_notification(user.id, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Notification", id))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    if !blocking(&state, move |db| db.delete_notification(user.id, id)).await? {
        return Err(ApiError::not_found("Notification", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<StatusResponse>> {
    if !blocking(&state, move |db| db.mark_notification_read(user.id, id)).await? {
        return Err(ApiError::not_found("Notification", id));
    }
    Ok(Json(StatusResponse::new("notification marked as read")))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let count = blocking(&state, move |db| db.mark_all_notifications_read(user.id)).await?;
    Ok(Json(MarkAllReadResponse {
        status: "all notifications marked as read",
        count,
    }))
}
