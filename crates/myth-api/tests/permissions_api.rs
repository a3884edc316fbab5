//! Ownership and role checks on the catalogue endpoints, plus notifications.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn only_owner_or_staff_edit_myths() {
    let app = common::app();
    let (_, owner) = app.register("owner@example.com", false).await;
    let (_, other) = app.register("other@example.com", false).await;
    let (_, staff) = app.staff("admin@example.com").await;
    let myth = app.myth(&owner, "Moon planting").await;
    let uri = format!("/api/myths/{myth}/");

    let (status, _) = app.patch(&uri, &other, json!({ "title": "Hijacked" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&uri, &owner, json!({ "origin": "Grandmother" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["origin"], "Grandmother");

    // Status and featuring are staff-only even for the owner.
    let (status, _) = app.patch(&uri, &owner, json!({ "status": "verified" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .patch(&uri, &staff, json!({ "status": "under_review", "is_featured": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "under_review");
    assert_eq!(body["is_featured"], true);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_are_staff_managed_and_public_to_read() {
    let app = common::app();
    let (_, farmer) = app.register("farmer@example.com", false).await;
    let (_, staff) = app.staff("admin@example.com").await;

    let (status, _) = app.post("/api/categories/", &farmer, json!({ "name": "Pests" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cat) = app.post("/api/categories/", &staff, json!({ "name": "Pests" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/api/categories/", &staff, json!({ "name": "Pests" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let cat_id = cat["id"].as_i64().unwrap();
    let (_, myth) = app
        .post(
            "/api/myths/",
            &farmer,
            json!({ "title": "Garlic stops blight", "description": "d", "category_id": cat_id }),
        )
        .await;
    assert_eq!(myth["category"]["name"], "Pests");

    let (status, listed) = app.get("/api/myths/?category_name=pests", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app.post("/api/myths/", &farmer, json!({ "title": "t", "description": "d", "category_id": 999 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/myths/?ordering=title", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn evidence_and_comment_moderation_is_staff_only() {
    let app = common::app();
    let (_, owner) = app.register("owner@example.com", false).await;
    let (_, other) = app.register("other@example.com", false).await;
    let (_, staff) = app.staff("admin@example.com").await;
    let myth = app.myth(&owner, "Moon planting").await;

    let (_, ev) = app
        .post("/api/evidence/", &other, json!({ "myth_id": myth, "title": "Trial", "description": "d" }))
        .await;
    assert_eq!(ev["is_approved"], false);
    assert_eq!(ev["evidence_type"], "other");
    let ev_uri = format!("/api/evidence/{}/", ev["id"]);

    let (status, _) = app.patch(&ev_uri, &other, json!({ "is_approved": true })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.patch(&ev_uri, &staff, json!({ "is_approved": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_approved"], true);

    let (status, comment) = app
        .post("/api/comments/", &other, json!({ "myth_id": myth, "content": "Worked for me" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let c_uri = format!("/api/comments/{}/", comment["id"]);
    let (status, _) = app.patch(&c_uri, &owner, json!({ "content": "edited" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&c_uri, &other, json!({ "is_approved": false })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post("/api/comments/", &other, json!({ "myth_id": myth, "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["content"].is_array());
}

#[tokio::test]
async fn notifications_belong_to_their_owner() {
    let app = common::app();
    let (_, owner) = app.register("owner@example.com", false).await;
    let (_, other) = app.register("other@example.com", false).await;
    let myth = app.myth(&owner, "Moon planting").await;

    app.post("/api/comments/", &other, json!({ "myth_id": myth, "content": "first" })).await;
    app.post("/api/evidence/", &other, json!({ "myth_id": myth, "title": "t", "description": "d" }))
        .await;

    let (_, inbox) = app.get("/api/notifications/?is_read=false", Some(&owner)).await;
    let inbox = inbox.as_array().unwrap().clone();
    assert_eq!(inbox.len(), 2);
    let first = inbox[0]["id"].as_i64().unwrap();

    let (status, _) = app.get(&format!("/api/notifications/{first}/"), Some(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .post(&format!("/api/notifications/{first}/mark-read/"), &other, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(&format!("/api/notifications/{first}/mark-read/"), &owner, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/notifications/mark-all-read/", &owner, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/notifications/{first}/"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, inbox) = app.get("/api/notifications/", Some(&owner)).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}
