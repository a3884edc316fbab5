use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use myth_db::filter::Page;
use myth_db::models::CommentFilter;
use myth_types::api::{CreateCommentRequest, UpdateCommentRequest};
use myth_types::models::Comment;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::permissions::{is_owner, is_staff, require};
use crate::query::{blank_as_none, loose_bool};

#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub myth: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user: Option<i64>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub is_approved: Option<bool>,
    pub ordering: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CommentQuery>,
) -> ApiResult<Json<Vec<Comment>>> {
    let filter = CommentFilter {
        myth_id: q.myth,
        user_id: q.user,
        is_approved: q.is_approved,
        ordering: q.ordering,
        page: Page::new(q.limit, q.offset),
    };
    let rows = blocking(&state, move |db| db.list_comments(&filter)).await?;
    Ok(Json(rows))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Comment>> {
    blocking(&state, move |db| db.get_comment(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Comment", id))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors = FieldErrors::default();
    errors.required("content", &req.content, None);
    errors.into_result()?;

    let content = req.content.trim().to_string();
    let comment = blocking(&state, move |db| db.create_comment(req.myth_id, user.id, &content)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let mut errors = FieldErrors::default();
    errors.required_if_set("content", req.content.as_deref(), None);
    let checked = errors.into_result();

    let comment = blocking(&state, move |db| -> ApiResult<_> {
        let current = db.get_comment(id)?.ok_or_else(|| ApiError::not_found("Comment", id))?;
        require(is_owner(&user, Some(&current.user)) || is_staff(&user))?;
        checked?;
        if req.is_approved.is_some() && !is_staff(&user) {
            return Err(ApiError::Forbidden("Only staff can moderate comments.".into()));
        }
        let content = req.content.map(|c| c.trim().to_string());
        Ok(db.update_comment(id, content, req.is_approved)?)
    })
    .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| -> ApiResult<_> {
        let current = db.get_comment(id)?.ok_or_else(|| ApiError::not_found("Comment", id))?;
        require(is_owner(&user, Some(&current.user)) || is_staff(&user))?;
        Ok(db.delete_comment(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
