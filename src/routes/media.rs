use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/media/{key}",
    params(
        ("key" = String, Path, description = "Object key, e.g. assets/1/<uuid>.png")
    ),
    responses(
        (status = 200, description = "Stored file", content_type = "application/octet-stream"),
        (status = 404, description = "No such file")
    ),
    tag = "Media"
)]
pub async fn serve_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let data = state.store.get(&key).await?;
    let content_type = mime_guess::from_path(&key)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
