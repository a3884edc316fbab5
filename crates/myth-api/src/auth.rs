use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use myth_db::Database;
use myth_db::filter::Page;
use myth_db::models::{NewUser, ProfileChanges};
use myth_types::api::{
    AuthResponse, ChangePasswordRequest, Claims, LoginRequest, RegisterRequest, StatusResponse,
    UpdateProfileRequest,
};
use myth_types::models::UserActivity;

use crate::blocking;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::validate::{LANGUAGE_MAX, LOCATION_MAX, NAME_MAX, PHONE_MAX};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();

    let mut errors = FieldErrors::default();
    if !looks_like_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    errors
        .required("first_name", &first_name, Some(NAME_MAX))
        .required("last_name", &last_name, Some(NAME_MAX));
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", format!("Password must be at least {MIN_PASSWORD_LEN} characters."));
    }
    if req.password != req.password2 {
        errors.add("password2", "Password fields didn't match.");
    }
    errors.into_result()?;

    let user = blocking(&state, move |db| -> ApiResult<_> {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("A user with this email already exists.".into()));
        }
        let password_hash = hash_password(&req.password)?;
        let user = db.create_user(&NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: &first_name,
            last_name: &last_name,
            is_farmer: req.is_farmer,
            is_researcher: req.is_researcher,
        })?;
        db.record_activity(user.id, "register", json!({}))?;
        Ok(user)
    })
    .await?;

    let access = create_token(&state.jwt_secret, state.token_ttl_hours, user.id, &user.email)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { access, user })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = req.email.trim().to_lowercase();

    let user = blocking(&state, move |db| -> ApiResult<_> {
        let row = db
            .get_user_by_email(&email)?
            .ok_or_else(bad_credentials)?;

        let parsed_hash = PasswordHash::new(&row.password_hash)
            .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {e}")))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| bad_credentials())?;

        db.record_activity(row.user.id, "login", json!({}))?;
        Ok(row.user)
    })
    .await?;

    let access = create_token(&state.jwt_secret, state.token_ttl_hours, user.id, &user.email)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse { access, user }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldErrors::single(
            "new_password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        ));
    }

    blocking(&state, move |db| -> ApiResult<_> {
        let row = db
            .get_user_row(user.id)?
            .ok_or_else(ApiError::unauthenticated)?;
        let parsed_hash = PasswordHash::new(&row.password_hash)
            .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {e}")))?;
        Argon2::default()
            .verify_password(req.old_password.as_bytes(), &parsed_hash)
            .map_err(|_| FieldErrors::single("old_password", "Old password is not correct."))?;

        let password_hash = hash_password(&req.new_password)?;
        db.update_password(user.id, &password_hash)?;
        Ok(())
    })
    .await?;

    Ok(Json(StatusResponse::new("password updated")))
}

pub async fn get_profile(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<myth_types::models::User> {
    Json(user)
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<myth_types::models::User>> {
    let mut errors = FieldErrors::default();
    errors
        .required_if_set("first_name", req.first_name.as_deref(), Some(NAME_MAX))
        .required_if_set("last_name", req.last_name.as_deref(), Some(NAME_MAX))
        .max_len_if_set("phone_number", req.phone_number.as_deref(), PHONE_MAX)
        .max_len_if_set("location", req.location.as_deref(), LOCATION_MAX)
        .required_if_set("preferred_language", req.preferred_language.as_deref(), Some(LANGUAGE_MAX));
    errors.into_result()?;

    let changes = ProfileChanges {
        first_name: req.first_name.map(|n| n.trim().to_string()),
        last_name: req.last_name.map(|n| n.trim().to_string()),
        is_farmer: req.is_farmer,
        is_researcher: req.is_researcher,
        phone_number: req.phone_number.map(|p| p.trim().to_string()),
        bio: req.bio,
        location: req.location.map(|l| l.trim().to_string()),
        preferred_language: req.preferred_language.map(|l| l.trim().to_string()),
    };
    let updated = blocking(&state, move |db| db.update_profile(user.id, changes)).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn activities(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(q.limit, q.offset);
    let rows = blocking(&state, move |db| db.list_activities(user.id, page)).await?;
    Ok(Json(rows))
}

pub async fn activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<UserActivity>> {
    blocking(&state, move |db| db.get_activity(user.id, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("UserActivity", id))
}

fn bad_credentials() -> ApiError {
    ApiError::Unauthenticated("Invalid email or password.".into())
}

/// Cheap shape check: one `@`, something before it, a dot somewhere after it.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
        && !email.chars().any(char::is_whitespace)
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn create_token(secret: &str, ttl_hours: i64, user_id: i64, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
