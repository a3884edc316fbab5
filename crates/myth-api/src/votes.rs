//! Polymorphic vote entry points. All of them go through the same ledger as
//! the myth upvote/downvote actions.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;

use myth_db::filter::Page;
use myth_db::models::VoteFilter;
use myth_types::api::{VoteRequest, VoteResponse};
use myth_types::models::{SubjectKind, Vote, VoteSubject, VoteType};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::query::blank_as_none;

#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub vote_type: Option<VoteType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub content_type: Option<SubjectKind>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub object_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// The caller's own votes.
pub async fn list_votes(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiQuery(q): ApiQuery<VoteQuery>,
) -> ApiResult<Json<Vec<Vote>>> {
    let filter = VoteFilter {
        vote_type: q.vote_type,
        content_type: q.content_type,
        object_id: q.object_id,
        page: Page::new(q.limit, q.offset),
    };
    let rows = blocking(&state, move |db| db.list_votes(user.id, &filter)).await?;
    Ok(Json(rows))
}

/// `POST /votes/` with an explicit `vote_type`.
pub async fn cast(
    state: State<AppState>,
    user: Extension<AuthUser>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let vote_type = match req.vote_type.as_deref() {
        Some(raw) => raw.parse::<VoteType>().map_err(|e| ApiError::InvalidArgument(e.to_string()))?,
        None => return Err(ApiError::InvalidArgument("vote_type is required".into())),
    };
    ledger(state, user, req, vote_type).await
}

pub async fn upvote(
    state: State<AppState>,
    user: Extension<AuthUser>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    ledger(state, user, req, VoteType::Upvote).await
}

pub async fn downvote(
    state: State<AppState>,
    user: Extension<AuthUser>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    ledger(state, user, req, VoteType::Downvote).await
}

/// `/votes/{id}/upvote/`. The path id is ignored; the body names the subject.
pub async fn upvote_at(
    state: State<AppState>,
    Path(_id): Path<i64>,
    user: Extension<AuthUser>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    ledger(state, user, req, VoteType::Upvote).await
}

pub async fn downvote_at(
    state: State<AppState>,
    Path(_id): Path<i64>,
    user: Extension<AuthUser>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    ledger(state, user, req, VoteType::Downvote).await
}

async fn ledger(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    req: VoteRequest,
    vote_type: VoteType,
) -> ApiResult<Json<VoteResponse>> {
    let subject = subject_of(&req)?;
    let cast = blocking(&state, move |db| db.cast_vote(subject, user.id, vote_type)).await?;
    Ok(Json(VoteResponse {
        status: cast.outcome.message(),
        outcome: cast.outcome,
        tally: cast.tally,
    }))
}

fn subject_of(req: &VoteRequest) -> ApiResult<VoteSubject> {
    let (Some(kind), Some(id)) = (req.content_type.as_deref(), req.object_id) else {
        return Err(ApiError::InvalidArgument(
            "content_type and object_id are required".into(),
        ));
    };
    let kind: SubjectKind = kind
        .parse()
        .map_err(|e: myth_types::models::UnknownVariant| ApiError::InvalidArgument(e.to_string()))?;
    Ok(VoteSubject::new(kind, id))
}
