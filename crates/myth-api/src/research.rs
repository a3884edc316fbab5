use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use myth_db::filter::Page;
use myth_db::models::ResearchFilter;
use myth_types::api::{
    CompleteResearchRequest, CompleteResearchResponse, CreateResearchRequest, StatusResponse,
    UpdateResearchRequest,
};
use myth_types::models::{ResearchRequest, ResearchStatus, User};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::permissions::{is_owner, is_researcher, is_staff, require, research_scope};
use crate::query::blank_as_none;

#[derive(Debug, Deserialize)]
pub struct ResearchQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<ResearchStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub myth: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub requested_by: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub assigned_to: Option<i64>,
    pub ordering: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_research(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiQuery(q): ApiQuery<ResearchQuery>,
) -> ApiResult<Json<Vec<ResearchRequest>>> {
    let scope = research_scope(&user);
    let filter = ResearchFilter {
        status: q.status,
        myth_id: q.myth,
        requested_by: q.requested_by,
        assigned_to: q.assigned_to,
        ordering: q.ordering,
        page: Page::new(q.limit, q.offset),
    };
    let rows = blocking(&state, move |db| db.list_research(scope, &filter)).await?;
    Ok(Json(rows))
}

pub async fn get_research(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<ResearchRequest>> {
    let request = blocking(&state, move |db| visible(db, &user, id)).await?;
    Ok(Json(request))
}

pub async fn create_research(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateResearchRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = blocking(&state, move |db| {
        db.create_research(req.myth_id, user.id, req.description.trim())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn update_research(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateResearchRequest>,
) -> ApiResult<Json<ResearchRequest>> {
    let request = blocking(&state, move |db| -> ApiResult<_> {
        let current = visible(db, &user, id)?;
        require(is_owner(&user, Some(&current.requested_by)) || is_staff(&user))?;
        if req.status.is_some() && !is_staff(&user) {
            return Err(ApiError::Forbidden(
                "Only staff can change the status of a research request.".into(),
            ));
        }
        Ok(db.update_research(id, req.description, req.status)?)
    })
    .await?;
    Ok(Json(request))
}

pub async fn delete_research(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| -> ApiResult<_> {
        let current = visible(db, &user, id)?;
        require(is_owner(&user, Some(&current.requested_by)) || is_staff(&user))?;
        Ok(db.delete_research(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Researchers and staff pick up any live request, visible or not.
pub async fn assign(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<StatusResponse>> {
    require(is_researcher(&user) || is_staff(&user))?;
    blocking(&state, move |db| db.assign_research(id, user.id)).await?;
    Ok(Json(StatusResponse::new("research request assigned")))
}

pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    body: Option<ApiJson<CompleteResearchRequest>>,
) -> ApiResult<Json<CompleteResearchResponse>> {
    // No body at all is the same as empty findings.
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    let done = blocking(&state, move |db| {
        db.complete_research(id, user.id, is_staff(&user), req.findings.trim())
    })
    .await?;
    Ok(Json(CompleteResearchResponse {
        status: "research completed",
        myth_status: done.myth_status,
    }))
}

/// Hidden requests read as missing.
fn visible(db: &myth_db::Database, user: &User, id: i64) -> ApiResult<ResearchRequest> {
    db.get_research(id)?
        .filter(|r| research_scope(user).can_see(r))
        .ok_or_else(|| ApiError::not_found("ResearchRequest", id))
}
