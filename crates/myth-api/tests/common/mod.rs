#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use myth_api::auth::{AppState, AppStateInner};
use myth_api::router::build_router;
use myth_db::Database;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// The real router over a fresh in-memory database.
pub fn app() -> TestApp {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "integration-test-secret".into(),
        token_ttl_hours: 1,
    });
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// Register a user and return `(id, access token)`.
    pub async fn register(&self, email: &str, is_researcher: bool) -> (i64, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register/",
                None,
                Some(json!({
                    "email": email,
                    "first_name": "Test",
                    "last_name": "User",
                    "password": "correct-horse",
                    "password2": "correct-horse",
                    "is_farmer": !is_researcher,
                    "is_researcher": is_researcher,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["user"]["id"].as_i64().unwrap(),
            body["access"].as_str().unwrap().to_string(),
        )
    }

    /// Register a user and promote them to staff.
    pub async fn staff(&self, email: &str) -> (i64, String) {
        let (id, token) = self.register(email, false).await;
        self.state
            .db
            .with_conn(|c| {
                c.execute("UPDATE users SET is_staff = 1 WHERE id = ?1", [id])?;
                Ok(())
            })
            .unwrap();
        (id, token)
    }

    pub async fn myth(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/myths/",
                token,
                json!({ "title": title, "description": "Passed down for generations" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}
