//! Custom metadata fields on assets.

mod helpers;

use helpers::{get, register_user, setup_test_app, upload, TestApp, TestUser};
use serde_json::{json, Value};

async fn create_field(
    app: &TestApp,
    user: &TestUser,
    asset: &Value,
    name: &str,
    value: &str,
) -> axum_test::TestResponse {
    app.server
        .post("/api/metadata")
        .add_header("Authorization", user.bearer())
        .json(&json!({ "asset": asset["id"], "field_name": name, "field_value": value }))
        .await
}

#[tokio::test]
async fn viewers_cannot_use_metadata() {
    let app = setup_test_app().await;
    let viewer = register_user(&app, "viewer1", "viewer").await;

    let response = get(&app, &viewer, "/api/metadata").await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn owner_manages_fields_on_own_assets() {
    let app = setup_test_app().await;
    let alice = register_user(&app, "alice", "editor").await;
    let bob = register_user(&app, "bob", "editor").await;
    let asset = upload(&app, &alice, "logo.png", "Logo", &[]).await;

    let response = create_field(&app, &alice, &asset, "photographer", "Ana").await;
    assert_eq!(response.status_code(), 201);
    let field: Value = response.json();
    let id = field["id"].as_str().unwrap();

    let response = create_field(&app, &alice, &asset, "photographer", "Someone else").await;
    assert_eq!(response.status_code(), 400);

    let response = create_field(&app, &bob, &asset, "license", "CC0").await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .server
        .put(&format!("/api/metadata/{}", id))
        .add_header("Authorization", bob.bearer())
        .json(&json!({ "field_value": "Bob" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .server
        .put(&format!("/api/metadata/{}", id))
        .add_header("Authorization", alice.bearer())
        .json(&json!({ "field_value": "Ana Lima" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let detail: Value = get(&app, &alice, &format!("/api/assets/{}", asset["id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(detail["metadata_fields"][0]["field_name"], "photographer");
    assert_eq!(detail["metadata_fields"][0]["field_value"], "Ana Lima");

    let body: Value = get(
        &app,
        &bob,
        &format!("/api/metadata?asset={}", asset["id"].as_str().unwrap()),
    )
    .await
    .json();
    assert_eq!(body["total_items"], 1);

    let response = app
        .server
        .delete(&format!("/api/metadata/{}", id))
        .add_header("Authorization", alice.bearer())
        .await;
    assert_eq!(response.status_code(), 204);
}

#[tokio::test]
async fn missing_fields_are_reported() {
    let app = setup_test_app().await;
    let editor = register_user(&app, "editor1", "editor").await;

    let response = app
        .server
        .post("/api/metadata")
        .add_header("Authorization", editor.bearer())
        .json(&json!({ "field_name": "" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    for field in ["asset", "field_name", "field_value"] {
        assert!(body["errors"][field].is_array(), "missing error for {field}");
    }
}
