//! Field limits on writes and lenient list filters.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

fn field_error(body: &Value, field: &str) -> bool {
    body["code"] == "VALIDATION_ERROR" && body["fields"][field].is_array()
}

#[tokio::test]
async fn myth_lengths_are_enforced() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;

    let (status, body) = app
        .post("/api/myths/", &token, json!({ "title": "x".repeat(400), "description": "d" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "title"), "{body}");

    let (status, body) = app
        .post(
            "/api/myths/",
            &token,
            json!({ "title": "Moon planting", "description": "d", "origin": "o".repeat(256) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "origin"), "{body}");

    let (status, _) = app
        .post("/api/myths/", &token, json!({ "title": "x".repeat(255), "description": "d" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn myth_patch_rejects_blank_and_long_fields() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;
    let uri = format!("/api/myths/{myth}/");

    let (status, body) = app.patch(&uri, &token, json!({ "description": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "description"), "{body}");

    let (status, body) = app.patch(&uri, &token, json!({ "title": "t".repeat(256) })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "title"), "{body}");

    let (_, stored) = app.get(&uri, None).await;
    assert_eq!(stored["title"], "Moon planting");
}

#[tokio::test]
async fn non_owner_gets_forbidden_before_validation() {
    let app = common::app();
    let (_, owner) = app.register("owner@example.com", false).await;
    let (_, other) = app.register("other@example.com", false).await;
    let myth = app.myth(&owner, "Moon planting").await;

    let (status, _) = app.patch(&format!("/api/myths/{myth}/"), &other, json!({ "title": " " })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn evidence_source_fields_are_checked() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;

    let (status, body) = app
        .post(
            "/api/evidence/",
            &token,
            json!({ "myth_id": myth, "title": "Trial", "description": "d", "source_url": "not a url" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "source_url"), "{body}");

    let (status, body) = app
        .post(
            "/api/evidence/",
            &token,
            json!({ "myth_id": myth, "title": "Trial", "description": "d", "source_citation": "c".repeat(501) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "source_citation"), "{body}");

    let (status, ev) = app
        .post(
            "/api/evidence/",
            &token,
            json!({
                "myth_id": myth,
                "title": "Trial",
                "description": "d",
                "source_url": "https://example.org/trial.pdf",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ev["source_url"], "https://example.org/trial.pdf");
}

#[tokio::test]
async fn evidence_patch_rejects_blank_title() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;
    let (_, ev) = app
        .post("/api/evidence/", &token, json!({ "myth_id": myth, "title": "Trial", "description": "d" }))
        .await;
    let uri = format!("/api/evidence/{}/", ev["id"]);

    let (status, body) = app.patch(&uri, &token, json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "title"), "{body}");

    let (status, body) = app.patch(&uri, &token, json!({ "source_url": "ftp//broken" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "source_url"), "{body}");

    let (_, stored) = app.get(&uri, None).await;
    assert_eq!(stored["title"], "Trial");
}

#[tokio::test]
async fn comment_patch_rejects_blank_content() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;
    let (_, comment) = app
        .post("/api/comments/", &token, json!({ "myth_id": myth, "content": "Worked for me" }))
        .await;

    let (status, body) = app
        .patch(&format!("/api/comments/{}/", comment["id"]), &token, json!({ "content": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "content"), "{body}");
}

#[tokio::test]
async fn category_limits_on_create_and_patch() {
    let app = common::app();
    let (_, staff) = app.staff("admin@example.com").await;

    let (status, body) = app
        .post("/api/categories/", &staff, json!({ "name": "n".repeat(101), "icon": "i".repeat(51) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "name"), "{body}");
    assert!(field_error(&body, "icon"), "{body}");

    let (_, cat) = app.post("/api/categories/", &staff, json!({ "name": "Pests", "icon": "bug" })).await;
    let uri = format!("/api/categories/{}/", cat["id"]);
    let (status, body) = app.patch(&uri, &staff, json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "name"), "{body}");
}

#[tokio::test]
async fn profile_lengths_are_enforced() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;

    let (status, body) = app
        .patch(
            "/api/auth/profile/",
            &token,
            json!({ "phone_number": "0".repeat(21), "preferred_language": "english-please" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_error(&body, "phone_number"), "{body}");
    assert!(field_error(&body, "preferred_language"), "{body}");
}

#[tokio::test]
async fn list_filters_are_lenient() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let (_, staff) = app.staff("admin@example.com").await;
    let featured = app.myth(&token, "Moon planting").await;
    app.myth(&token, "Salt kills weeds").await;
    app.patch(&format!("/api/myths/{featured}/"), &staff, json!({ "is_featured": true }))
        .await;

    let (status, body) = app.get("/api/myths/?is_featured=True", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], featured);

    let (status, body) = app.get("/api/myths/?status=&category=", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/api/myths/?is_featured=sometimes", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn null_category_clears_it() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let (_, staff) = app.staff("admin@example.com").await;
    let (_, cat) = app.post("/api/categories/", &staff, json!({ "name": "Pests" })).await;
    let (_, myth) = app
        .post(
            "/api/myths/",
            &token,
            json!({ "title": "Garlic stops blight", "description": "d", "category_id": cat["id"] }),
        )
        .await;
    let uri = format!("/api/myths/{}/", myth["id"]);

    let (_, body) = app.patch(&uri, &token, json!({ "origin": "Neighbour" })).await;
    assert_eq!(body["category"]["name"], "Pests");

    let (status, body) = app.patch(&uri, &token, json!({ "category_id": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["category"].is_null(), "{body}");

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&token), Some(json!({ "category_id": 999 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
