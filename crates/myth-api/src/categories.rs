use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use myth_db::models::{CategoryChanges, CategoryFilter};
use myth_types::api::{CreateCategoryRequest, UpdateCategoryRequest};
use myth_types::models::Category;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::permissions::{is_staff, require};
use crate::validate::{CATEGORY_NAME_MAX, ICON_MAX};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CategoryQuery>,
) -> ApiResult<Json<Vec<Category>>> {
    let filter = CategoryFilter { search: q.search, ordering: q.ordering };
    let rows = blocking(&state, move |db| db.list_categories(&filter)).await?;
    Ok(Json(rows))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    blocking(&state, move |db| db.get_category(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", id))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    require(is_staff(&user))?;
    let mut errors = FieldErrors::default();
    errors
        .required("name", &req.name, Some(CATEGORY_NAME_MAX))
        .max_len("icon", &req.icon, ICON_MAX);
    errors.into_result()?;

    let name = req.name.trim().to_string();
    let category = blocking(&state, move |db| {
        db.create_category(&name, req.description.trim(), req.icon.trim())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    require(is_staff(&user))?;
    let mut errors = FieldErrors::default();
    errors
        .required_if_set("name", req.name.as_deref(), Some(CATEGORY_NAME_MAX))
        .max_len_if_set("icon", req.icon.as_deref(), ICON_MAX);
    errors.into_result()?;

    let changes = CategoryChanges {
        name: req.name.map(|n| n.trim().to_string()),
        description: req.description.map(|d| d.trim().to_string()),
        icon: req.icon.map(|i| i.trim().to_string()),
    };
    let category = blocking(&state, move |db| db.update_category(id, changes)).await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    require(is_staff(&user))?;
    blocking(&state, move |db| db.delete_category(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
