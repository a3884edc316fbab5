use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use myth_db::filter::Page;
use myth_db::models::{EvidenceChanges, EvidenceFilter, NewEvidence};
use myth_types::api::{CreateEvidenceRequest, UpdateEvidenceRequest};
use myth_types::models::{Evidence, EvidenceType};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::permissions::{is_owner, is_staff, require};
use crate::validate::{CITATION_MAX, TITLE_MAX};
use crate::query::{blank_as_none, loose_bool};

#[derive(Debug, Deserialize)]
pub struct EvidenceQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub myth: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub evidence_type: Option<EvidenceType>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub is_approved: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_evidence(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<EvidenceQuery>,
) -> ApiResult<Json<Vec<Evidence>>> {
    let filter = EvidenceFilter {
        myth_id: q.myth,
        evidence_type: q.evidence_type,
        is_approved: q.is_approved,
        search: q.search,
        ordering: q.ordering,
        page: Page::new(q.limit, q.offset),
    };
    let rows = blocking(&state, move |db| db.list_evidence(&filter)).await?;
    Ok(Json(rows))
}

pub async fn get_evidence(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Evidence>> {
    blocking(&state, move |db| db.get_evidence(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Evidence", id))
}

pub async fn create_evidence(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateEvidenceRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors = FieldErrors::default();
    errors
        .required("title", &req.title, Some(TITLE_MAX))
        .required("description", &req.description, None)
        .url("source_url", &req.source_url)
        .max_len("source_citation", &req.source_citation, CITATION_MAX);
    errors.into_result()?;

    let evidence = blocking(&state, move |db| {
        db.create_evidence(
            user.id,
            &NewEvidence {
                myth_id: req.myth_id,
                title: req.title.trim(),
                description: req.description.trim(),
                evidence_type: req.evidence_type,
                source_url: req.source_url.trim(),
                source_citation: req.source_citation.trim(),
            },
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

pub async fn update_evidence(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateEvidenceRequest>,
) -> ApiResult<Json<Evidence>> {
    let mut errors = FieldErrors::default();
    errors
        .required_if_set("title", req.title.as_deref(), Some(TITLE_MAX))
        .required_if_set("description", req.description.as_deref(), None)
        .url_if_set("source_url", req.source_url.as_deref())
        .max_len_if_set("source_citation", req.source_citation.as_deref(), CITATION_MAX);
    let checked = errors.into_result();

    let evidence = blocking(&state, move |db| -> ApiResult<_> {
        let current = db.get_evidence(id)?.ok_or_else(|| ApiError::not_found("Evidence", id))?;
        require(is_owner(&user, current.submitted_by.as_ref()) || is_staff(&user))?;
        checked?;
        if req.is_approved.is_some() && !is_staff(&user) {
            return Err(ApiError::Forbidden("Only staff can approve evidence.".into()));
        }
        let trimmed = |v: Option<String>| v.map(|v| v.trim().to_string());
        let changes = EvidenceChanges {
            title: trimmed(req.title),
            description: trimmed(req.description),
            evidence_type: req.evidence_type,
            source_url: trimmed(req.source_url),
            source_citation: trimmed(req.source_citation),
            is_approved: req.is_approved,
        };
        Ok(db.update_evidence(id, changes)?)
    })
    .await?;
    Ok(Json(evidence))
}

pub async fn delete_evidence(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| -> ApiResult<_> {
        let current = db.get_evidence(id)?.ok_or_else(|| ApiError::not_found("Evidence", id))?;
        require(is_owner(&user, current.submitted_by.as_ref()) || is_staff(&user))?;
        Ok(db.delete_evidence(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
