use axum::{extract::State, http::StatusCode, response::Html, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page", content_type = "text/html")
    ),
    tag = "General"
)]
pub async fn root() -> Html<&'static str> {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Asset Vault</title>
    <style>
        body {
            display: flex;
            flex-direction: column;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            font-family: Arial, sans-serif;
            background-color: #f4f4f1;
        }
        h1 { color: #2d2d2d; }
        p { color: #5f5f5f; max-width: 32em; text-align: center; }
        a {
            margin-top: 20px;
            padding: 10px 20px;
            background-color: #2f6f4f;
            color: white;
            text-decoration: none;
            border-radius: 5px;
            font-weight: bold;
        }
        a:hover { background-color: #245a3f; }
    </style>
</head>
<body>
    <h1>Asset Vault</h1>
    <p>Upload, tag, version and search digital assets. Every file keeps its history and every action is logged.</p>
    <a href="/swagger-ui/">Explore API Docs</a>
</body>
</html>
"#)
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "General"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION");
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse { status: "ok", database: "ok", version }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded", database: "unreachable", version }),
            )
        }
    }
}
