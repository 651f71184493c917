//! Test helpers: an app over a throwaway SQLite file and media directory.

#![allow(dead_code)]

pub mod fixtures;

use asset_vault::config::Config;
use asset_vault::routes::create_routes;
use asset_vault::storage::LocalStore;
use asset_vault::AppState;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;

pub const BASE_URL: &str = "http://assets.test/";
pub const PASSWORD: &str = "tangerine-sky-42";

pub struct TestApp {
    pub server: TestServer,
    pub db: DatabaseConnection,
    pub media_root: PathBuf,
    pub _temp_dir: TempDir,
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
    pub refresh: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let database_url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("test.db").display());
    let media_root = temp_dir.path().join("media");

    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let config = Config {
        database_url,
        jwt_secret: "integration-test-secret".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        media_root: media_root.clone(),
        public_base_url: Some(Url::parse(BASE_URL).expect("valid base url")),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 86_400,
        max_upload_bytes: 10 * 1024 * 1024,
    };
    let store = LocalStore::new(&media_root).expect("Failed to create media root");

    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        store: Arc::new(store),
    };
    let server = TestServer::new(create_routes(state)).expect("Failed to create test server");

    TestApp {
        server,
        db,
        media_root,
        _temp_dir: temp_dir,
    }
}

/// Register through the API with the given role.
pub async fn register_user(app: &TestApp, username: &str, role: &str) -> TestUser {
    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": PASSWORD,
            "password2": PASSWORD,
            "role": role,
        }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());

    let body: Value = response.json();
    TestUser {
        id: body["user"]["id"].as_i64().expect("user id"),
        username: username.to_string(),
        token: body["access"].as_str().expect("access token").to_string(),
        refresh: body["refresh"].as_str().expect("refresh token").to_string(),
    }
}

pub fn file_part(filename: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec()).file_name(filename.to_string())
}

/// Form with a file, a title and the given tags.
pub fn asset_form(filename: &str, data: &[u8], title: &str, tags: &[&str]) -> MultipartForm {
    let mut form = MultipartForm::new()
        .add_text("title", title.to_string())
        .add_part("file", file_part(filename, data));
    for tag in tags {
        form = form.add_text("tags", tag.to_string());
    }
    form
}

pub async fn post_asset(app: &TestApp, user: &TestUser, form: MultipartForm) -> TestResponse {
    app.server
        .post("/api/assets")
        .add_header("Authorization", user.bearer())
        .multipart(form)
        .await
}

/// Upload and return the created asset body.
pub async fn upload(
    app: &TestApp,
    user: &TestUser,
    filename: &str,
    title: &str,
    tags: &[&str],
) -> Value {
    let response = post_asset(app, user, asset_form(filename, b"first version", title, tags)).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json()
}

pub async fn get(app: &TestApp, user: &TestUser, path: &str) -> TestResponse {
    app.server
        .get(path)
        .add_header("Authorization", user.bearer())
        .await
}

pub async fn patch_asset(
    app: &TestApp,
    user: &TestUser,
    id: &str,
    form: MultipartForm,
) -> TestResponse {
    app.server
        .patch(&format!("/api/assets/{}", id))
        .add_header("Authorization", user.bearer())
        .multipart(form)
        .await
}

/// Ids from a paginated or plain list body.
pub fn ids(body: &Value) -> Vec<String> {
    let items = body.get("data").unwrap_or(body);
    items
        .as_array()
        .expect("array body")
        .iter()
        .map(|item| item["id"].as_str().expect("id").to_string())
        .collect()
}
