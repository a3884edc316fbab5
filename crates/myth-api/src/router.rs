use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{categories, comments, evidence, myths, notifications, research, votes};

/// All `/api` routes with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register/", post(auth::register))
        .route("/auth/login/", post(auth::login))
        .route("/categories/", get(categories::list_categories))
        .route("/categories/{id}/", get(categories::get_category))
        .route("/myths/", get(myths::list_myths))
        .route("/myths/{id}/", get(myths::get_myth))
        .route("/evidence/", get(evidence::list_evidence))
        .route("/evidence/{id}/", get(evidence::get_evidence))
        .route("/comments/", get(comments::list_comments))
        .route("/comments/{id}/", get(comments::get_comment));

    let protected_routes = Router::new()
        .route("/auth/change-password/", put(auth::change_password))
        .route("/auth/profile/", get(auth::get_profile).patch(auth::update_profile))
        .route("/auth/activities/", get(auth::activities))
        .route("/auth/activities/{id}/", get(auth::activity))
        .route("/categories/", post(categories::create_category))
        .route(
            "/categories/{id}/",
            put(categories::update_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/myths/", post(myths::create_myth))
        .route("/myths/{id}/", put(myths::update_myth).patch(myths::update_myth).delete(myths::delete_myth))
        .route("/myths/{id}/upvote/", post(myths::upvote))
        .route("/myths/{id}/downvote/", post(myths::downvote))
        .route("/evidence/", post(evidence::create_evidence))
        .route(
            "/evidence/{id}/",
            put(evidence::update_evidence)
                .patch(evidence::update_evidence)
                .delete(evidence::delete_evidence),
        )
        .route("/comments/", post(comments::create_comment))
        .route(
            "/comments/{id}/",
            put(comments::update_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/votes/", get(votes::list_votes).post(votes::cast))
        .route("/votes/upvote/", post(votes::upvote))
        .route("/votes/downvote/", post(votes::downvote))
        .route("/votes/{id}/upvote/", post(votes::upvote_at))
        .route("/votes/{id}/downvote/", post(votes::downvote_at))
        .route(
            "/research-requests/",
            get(research::list_research).post(research::create_research),
        )
        .route(
            "/research-requests/{id}/",
            get(research::get_research)
                .patch(research::update_research)
                .delete(research::delete_research),
        )
        .route("/research-requests/{id}/assign/", post(research::assign))
        .route("/research-requests/{id}/complete/", post(research::complete))
        .route("/notifications/", get(notifications::list_notifications))
        .route("/notifications/mark-all-read/", post(notifications::mark_all_read))
        .route(
            "/notifications/{id}/",
            get(notifications::get_notification).delete(notifications::delete_notification),
        )
        .route("/notifications/{id}/mark-read/", post(notifications::mark_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = public_routes.merge(protected_routes);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
