use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use myth_db::filter::Page;
use myth_db::models::{MythChanges, MythFilter};
use myth_types::api::{CreateMythRequest, MythDetail, UpdateMythRequest, VoteResponse};
use myth_types::models::{Myth, MythStatus, VoteSubject, VoteType};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::permissions::{is_owner, is_staff, require};
use crate::validate::{ORIGIN_MAX, TITLE_MAX};
use crate::query::{blank_as_none, loose_bool};

#[derive(Debug, Deserialize)]
pub struct MythQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<MythStatus>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub is_featured: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<i64>,
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_myths(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<MythQuery>,
) -> ApiResult<Json<Vec<Myth>>> {
    let filter = MythFilter {
        status: q.status,
        is_featured: q.is_featured,
        category_id: q.category,
        category_name: q.category_name,
        submitted_by: q.user,
        search: q.search,
        ordering: q.ordering,
        page: Page::new(q.limit, q.offset),
    };
    let myths = blocking(&state, move |db| db.list_myths(&filter)).await?;
    Ok(Json(myths))
}

pub async fn get_myth(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MythDetail>> {
    blocking(&state, move |db| db.get_myth_detail(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Myth", id))
}

pub async fn create_myth(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateMythRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors = FieldErrors::default();
    errors
        .required("title", &req.title, Some(TITLE_MAX))
        .required("description", &req.description, None)
        .max_len("origin", &req.origin, ORIGIN_MAX);
    errors.into_result()?;

    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();

    let myth = blocking(&state, move |db| {
        db.create_myth(user.id, &title, &description, req.origin.trim(), req.category_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(myth)))
}

pub async fn update_myth(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateMythRequest>,
) -> ApiResult<Json<Myth>> {
    let mut errors = FieldErrors::default();
    errors
        .required_if_set("title", req.title.as_deref(), Some(TITLE_MAX))
        .required_if_set("description", req.description.as_deref(), None)
        .max_len_if_set("origin", req.origin.as_deref(), ORIGIN_MAX);
    let checked = errors.into_result();

    let myth = blocking(&state, move |db| -> ApiResult<_> {
        let current = db.get_myth(id)?.ok_or_else(|| ApiError::not_found("Myth", id))?;
        require(is_owner(&user, current.submitted_by.as_ref()) || is_staff(&user))?;
        checked?;
        if (req.status.is_some() || req.is_featured.is_some()) && !is_staff(&user) {
            return Err(ApiError::Forbidden(
                "Only staff can change a myth's status or featured flag.".into(),
            ));
        }
        let changes = MythChanges {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description.map(|d| d.trim().to_string()),
            origin: req.origin.map(|o| o.trim().to_string()),
            category_id: req.category_id,
            status: req.status,
            is_featured: req.is_featured,
        };
        Ok(db.update_myth(id, changes)?)
    })
    .await?;
    Ok(Json(myth))
}

pub async fn delete_myth(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| -> ApiResult<_> {
        let current = db.get_myth(id)?.ok_or_else(|| ApiError::not_found("Myth", id))?;
        require(is_owner(&user, current.submitted_by.as_ref()) || is_staff(&user))?;
        Ok(db.delete_myth(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upvote(
    state: State<AppState>,
    path: Path<i64>,
    user: Extension<AuthUser>,
) -> ApiResult<Json<VoteResponse>> {
    vote(state, path, user, VoteType::Upvote).await
}

pub async fn downvote(
    state: State<AppState>,
    path: Path<i64>,
    user: Extension<AuthUser>,
) -> ApiResult<Json<VoteResponse>> {
    vote(state, path, user, VoteType::Downvote).await
}

async fn vote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    vote_type: VoteType,
) -> ApiResult<Json<VoteResponse>> {
    let cast = blocking(&state, move |db| db.cast_vote(VoteSubject::Myth(id), user.id, vote_type)).await?;
    Ok(Json(VoteResponse {
        status: cast.outcome.message(),
        outcome: cast.outcome,
        tally: cast.tally,
    }))
}
