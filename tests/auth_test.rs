//! Registration, login, tokens, profile and user administration.

mod helpers;

use helpers::{asset_form, post_asset, register_user, setup_test_app, PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn register_returns_user_and_tokens() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
            "password2": PASSWORD,
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "viewer");
    assert!(body["user"].get("password").is_none());
    assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn register_reports_field_errors() {
    let app = setup_test_app().await;
    register_user(&app, "alice", "viewer").await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "12345678",
            "password2": "87654321",
        }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["errors"]["password2"].is_array());
    assert!(body["errors"]["password"].is_array());

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
            "password2": PASSWORD,
        }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(
        body["errors"]["username"][0],
        "A user with this username already exists."
    );
    assert_eq!(body["errors"]["email"][0], "A user with this email already exists.");
}

#[tokio::test]
async fn login_checks_credentials() {
    let app = setup_test_app().await;
    register_user(&app, "bob", "editor").await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "bob" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "bob", "password": "wrong-password" }))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "bob", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["role"], "editor");
    assert!(body["user"]["last_login"].is_string());
}

#[tokio::test]
async fn refresh_works_until_logout() {
    let app = setup_test_app().await;
    let user = register_user(&app, "carol", "viewer").await;

    let response = app
        .server
        .post("/api/auth/token/refresh")
        .json(&json!({ "refresh": user.refresh }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["access"].is_string());

    let response = app
        .server
        .post("/api/auth/logout")
        .json(&json!({ "refresh": user.refresh }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .server
        .post("/api/auth/token/refresh")
        .json(&json!({ "refresh": user.refresh }))
        .await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["error"], "User logged out. Please re-login.");

    let response = app
        .server
        .post("/api/auth/logout")
        .json(&json!({ "refresh": "not-a-token" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = setup_test_app().await;

    let response = app.server.get("/api/assets").await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .get("/api/assets")
        .add_header("Authorization", "Bearer garbage")
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn profile_update_and_password_change() {
    let app = setup_test_app().await;
    let user = register_user(&app, "dave", "viewer").await;

    let response = app
        .server
        .put("/api/auth/profile")
        .add_header("Authorization", user.bearer())
        .json(&json!({ "first_name": "Dave", "profile_info": "Photographer", "role": "admin" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["first_name"], "Dave");
    assert_eq!(body["profile_info"], "Photographer");
    assert_eq!(body["role"], "viewer");

    let response = app
        .server
        .post("/api/auth/profile/change-password")
        .add_header("Authorization", user.bearer())
        .json(&json!({
            "old_password": "not-my-password",
            "new_password": "marigold-river-7",
            "new_password2": "marigold-river-7",
        }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["errors"]["old_password"][0], "Wrong password.");

    let response = app
        .server
        .post("/api/auth/profile/change-password")
        .add_header("Authorization", user.bearer())
        .json(&json!({
            "old_password": PASSWORD,
            "new_password": "marigold-river-7",
            "new_password2": "marigold-river-7",
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "dave", "password": "marigold-river-7" }))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = setup_test_app().await;
    let admin = register_user(&app, "root", "admin").await;
    let viewer = register_user(&app, "erin", "viewer").await;

    let response = app
        .server
        .get("/api/auth/users")
        .add_header("Authorization", viewer.bearer())
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .server
        .get("/api/auth/users")
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let response = app
        .server
        .put(&format!("/api/auth/users/{}", viewer.id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "role": "editor" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["role"], "editor");

    let response = app
        .server
        .put(&format!("/api/auth/users/{}", viewer.id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "role": "superuser" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .server
        .delete(&format!("/api/auth/users/{}", admin.id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .server
        .delete(&format!("/api/auth/users/{}", viewer.id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .server
        .get(&format!("/api/auth/users/{}", viewer.id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn role_changes_and_deletions_apply_to_issued_tokens() {
    let app = setup_test_app().await;
    let admin = register_user(&app, "admin1", "admin").await;
    let editor = register_user(&app, "editor1", "editor").await;
    let doomed = register_user(&app, "editor2", "editor").await;

    let response = app
        .server
        .put(&format!("/api/auth/users/{}", editor.id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "role": "viewer" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = post_asset(&app, &editor, asset_form("a.png", b"data", "A", &[])).await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .server
        .get("/api/auth/profile")
        .add_header("Authorization", editor.bearer())
        .await;
    let body: Value = response.json();
    assert_eq!(body["role"], "viewer");

    let response = app
        .server
        .delete(&format!("/api/auth/users/{}", doomed.id))
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 204);

    let response = post_asset(&app, &doomed, asset_form("b.png", b"data", "B", &[])).await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .get("/api/assets")
        .add_header("Authorization", doomed.bearer())
        .await;
    assert_eq!(response.status_code(), 401);
}
