pub mod auth;
pub mod categories;
pub mod comments;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod middleware;
pub mod myths;
pub mod notifications;
pub mod permissions;
pub mod query;
pub mod research;
pub mod router;
pub mod validate;
pub mod votes;

use std::sync::Arc;

use tracing::error;

use myth_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    ApiError: From<E>,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
