use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use myth_types::models::User;

use crate::auth::{AppState, decode_token};
use crate::blocking;
use crate::error::{ApiError, ApiResult};

/// The caller, loaded fresh from the database on every request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Extract and validate the bearer JWT, then attach the user it names.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthenticated)?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        ApiError::unauthenticated()
    })?;

    let user_id = claims.sub;
    let user = blocking(&state, move |db| db.get_user(user_id))
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}
