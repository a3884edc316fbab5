//! Vote ledger over HTTP: myth actions and the polymorphic entry points.

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn upvote_toggle_then_downvote() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;
    let uri = format!("/api/myths/{myth}/upvote/");

    let (status, body) = app.post(&uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "vote recorded");
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 0);
    assert_eq!(body["total_votes"], 1);

    let (_, body) = app.post(&uri, &token, json!({})).await;
    assert_eq!(body["status"], "vote removed");
    assert_eq!(body["total_votes"], 0);

    let (_, body) = app.post(&format!("/api/myths/{myth}/downvote/"), &token, json!({})).await;
    assert_eq!(body["status"], "vote recorded");
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["downvotes"], 1);
    assert_eq!(body["total_votes"], 1);

    let (_, detail) = app.get(&format!("/api/myths/{myth}/"), None).await;
    assert_eq!(detail["downvotes"], 1);
    assert_eq!(detail["votes"].as_array().unwrap().len(), 1);
    assert_eq!(detail["votes"][0]["vote_type"], "downvote");
}

#[tokio::test]
async fn voting_needs_a_user() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;

    let (status, body) = app
        .send(
            axum::http::Method::POST,
            &format!("/api/myths/{myth}/upvote/"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = app.post(&format!("/api/myths/{myth}/upvote/"), "not-a-jwt", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_myth_is_not_found() {
    let app = common::app();
    let (_, token) = app.register("grower@example.com", false).await;
    let (status, body) = app.post("/api/myths/999/upvote/", &token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn polymorphic_votes_share_the_ledger() {
    let app = common::app();
    let (_, a) = app.register("a@example.com", false).await;
    let (_, b) = app.register("b@example.com", false).await;
    let myth = app.myth(&a, "Moon planting").await;

    let (status, body) = app
        .post("/api/votes/upvote/", &a, json!({ "content_type": "myth", "object_id": myth }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["upvotes"], 1);

    // The path id is ignored; the body names the subject.
    let (_, body) = app
        .post("/api/votes/12345/downvote/", &b, json!({ "content_type": "myth", "object_id": myth }))
        .await;
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 1);

    // The myth action sees the vote cast through /votes/.
    let (_, body) = app.post(&format!("/api/myths/{myth}/upvote/"), &a, json!({})).await;
    assert_eq!(body["status"], "vote removed");
    assert_eq!(body["total_votes"], 1);

    let (status, body) = app
        .post(
            "/api/votes/",
            &b,
            json!({ "content_type": "myth", "object_id": myth, "vote_type": "upvote" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 0);

    let (_, mine) = app.get("/api/votes/", Some(&b)).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["vote_type"], "upvote");
    assert_eq!(mine[0]["content_type"], "myth");
}

#[tokio::test]
async fn evidence_is_a_vote_subject() {
    let app = common::app();
    let (_, token) = app.register("a@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;
    let (_, ev) = app
        .post(
            "/api/evidence/",
            &token,
            json!({ "myth_id": myth, "title": "Trial", "description": "Split plots", "evidence_type": "field_trial" }),
        )
        .await;
    let ev = ev["id"].as_i64().unwrap();

    let (_, body) = app
        .post("/api/votes/downvote/", &token, json!({ "content_type": "evidence", "object_id": ev }))
        .await;
    assert_eq!(body["downvotes"], 1);

    let (_, stored) = app.get(&format!("/api/evidence/{ev}/"), None).await;
    assert_eq!(stored["downvotes"], 1);
    let (_, myth_row) = app.get(&format!("/api/myths/{myth}/"), None).await;
    assert_eq!(myth_row["total_votes"], 0);
}

#[tokio::test]
async fn bad_vote_bodies_are_invalid_arguments() {
    let app = common::app();
    let (_, token) = app.register("a@example.com", false).await;
    let myth = app.myth(&token, "Moon planting").await;

    for body in [
        json!({ "object_id": myth }),
        json!({ "content_type": "myth" }),
        json!({ "content_type": "comment", "object_id": myth }),
    ] {
        let (status, resp) = app.post("/api/votes/upvote/", &token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["code"], "INVALID_ARGUMENT");
    }

    let (status, _) = app
        .post(
            "/api/votes/",
            &token,
            json!({ "content_type": "myth", "object_id": myth, "vote_type": "sideways" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/votes/upvote/", &token, json!({ "content_type": "evidence", "object_id": 404 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
