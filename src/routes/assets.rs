use axum::{
    extract::{Multipart, Path, Query, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

use crate::entities::{
    activity_log::Action,
    asset::{self, extension_of, FileType},
    asset_version, metadata,
    user::{self, Capability},
};
use crate::error::AppError;
use crate::extract::{media_url, BaseUrl, ClientMeta};
use crate::middleware::auth::AuthUser;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::routes::metadata::MetadataResponse;
use crate::routes::upload::{AssetForm, UploadedFile};
use crate::scope;
use crate::search::SearchParams;
use crate::services::{activity, blobs, versioning};
use crate::storage::asset_key;
use crate::AppState;

pub const POPULAR_TAG_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct OwnerSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct VersionResponse {
    pub id: Uuid,
    pub version_number: i32,
    pub file_url: Option<String>,
    pub file_size: i64,
    pub changes: Option<String>,
    pub created_by: i32,
    pub created_at: chrono::NaiveDateTime,
}

impl VersionResponse {
    pub fn build(version: asset_version::Model, base: Option<&Url>) -> Self {
        VersionResponse {
            id: version.id,
            version_number: version.version_number,
            file_url: media_url(base, &version.file_key),
            file_size: version.file_size,
            changes: version.changes,
            created_by: version.created_by,
            created_at: version.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AssetResponse {
    pub id: Uuid,
    pub owner: Option<OwnerSummary>,
    pub file_url: Option<String>,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_extension: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub version: i32,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    pub metadata_fields: Vec<MetadataResponse>,
    pub versions: Vec<VersionResponse>,
}

/// Build responses for a batch of assets, loading owners, metadata and
/// versions with one query each.
pub async fn build_responses<C: ConnectionTrait>(
    conn: &C,
    assets: Vec<asset::Model>,
    base: Option<&Url>,
) -> Result<Vec<AssetResponse>, DbErr> {
    if assets.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = assets.iter().map(|a| a.id).collect();
    let owner_ids: Vec<i32> = assets.iter().map(|a| a.owner_id).collect();

    let owners: HashMap<i32, OwnerSummary> = user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| {
            (
                u.id,
                OwnerSummary {
                    id: u.id,
                    username: u.username,
                    email: u.email,
                },
            )
        })
        .collect();

    let mut fields: HashMap<Uuid, Vec<MetadataResponse>> = HashMap::new();
    for row in metadata::Entity::find()
        .filter(metadata::Column::AssetId.is_in(ids.clone()))
        .order_by_asc(metadata::Column::FieldName)
        .all(conn)
        .await?
    {
        fields
            .entry(row.asset_id)
            .or_default()
            .push(MetadataResponse::from(row));
    }

    let mut versions: HashMap<Uuid, Vec<VersionResponse>> = HashMap::new();
    for row in asset_version::Entity::find()
        .filter(asset_version::Column::AssetId.is_in(ids))
        .order_by_desc(asset_version::Column::VersionNumber)
        .all(conn)
        .await?
    {
        versions
            .entry(row.asset_id)
            .or_default()
            .push(VersionResponse::build(row, base));
    }

    Ok(assets
        .into_iter()
        .map(|asset| AssetResponse {
            owner: owners.get(&asset.owner_id).cloned(),
            file_url: media_url(base, &asset.file_key),
            file_extension: asset.file_extension(),
            tags: asset.tag_list(),
            metadata_fields: fields.remove(&asset.id).unwrap_or_default(),
            versions: versions.remove(&asset.id).unwrap_or_default(),
            id: asset.id,
            original_filename: asset.original_filename,
            file_type: asset.file_type,
            title: asset.title,
            description: asset.description,
            version: asset.version,
            file_size: asset.file_size,
            mime_type: asset.mime_type,
            is_active: asset.is_active,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        })
        .collect())
}

async fn build_one<C: ConnectionTrait>(
    conn: &C,
    asset: asset::Model,
    base: Option<&Url>,
) -> Result<AssetResponse, AppError> {
    build_responses(conn, vec![asset], base)
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("asset response went missing".to_string()))
}

/// Load an asset the actor is allowed to see; anything else is a 404.
pub async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthUser,
    id: Uuid,
) -> Result<asset::Model, AppError> {
    asset::Entity::find_by_id(id)
        .filter(scope::assets(actor))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))
}

/// Like [`find_visible`], but the actor must also be allowed to modify it.
async fn find_modifiable<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthUser,
    id: Uuid,
) -> Result<asset::Model, AppError> {
    actor.require(Capability::ManageAssets)?;
    let asset = find_visible(conn, actor, id).await?;
    if !actor.may_act_on(asset.owner_id) {
        tracing::warn!(user = %actor.username, asset_id = %id, "not the asset owner");
        return Err(AppError::permission_denied());
    }
    Ok(asset)
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct AssetFilters {
    /// One of image, video, pdf, doc, audio, other.
    pub file_type: Option<String>,
    /// Owner user id.
    pub owner: Option<i32>,
    pub is_active: Option<bool>,
    /// created_at, updated_at, file_size or title; prefix `-` for descending.
    pub ordering: Option<String>,
}

/// Resolve `ordering` into a column and direction. Default `-created_at`.
pub fn parse_ordering(raw: Option<&str>) -> Result<(asset::Column, Order), AppError> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty()).unwrap_or("-created_at");
    let (name, order) = match raw.strip_prefix('-') {
        Some(name) => (name, Order::Desc),
        None => (raw, Order::Asc),
    };
    let column = match name {
        "created_at" => asset::Column::CreatedAt,
        "updated_at" => asset::Column::UpdatedAt,
        "file_size" => asset::Column::FileSize,
        "title" => asset::Column::Title,
        other => {
            return Err(AppError::field(
                "ordering",
                format!("\"{}\" is not a valid ordering.", other),
            ))
        }
    };
    Ok((column, order))
}

#[utoipa::path(
    get,
    path = "/api/assets",
    params(Pagination, AssetFilters),
    responses(
        (status = 200, description = "Assets visible to the caller", body = PaginatedResponse<AssetResponse>),
        (status = 400, description = "Invalid filter")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn list_assets(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    base: BaseUrl,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<AssetFilters>,
) -> Result<Json<PaginatedResponse<AssetResponse>>, AppError> {
    let mut condition = Condition::all().add(scope::assets(&actor));

    if let Some(raw) = filters.file_type.as_deref().filter(|r| !r.is_empty()) {
        let kind = FileType::parse(raw).ok_or_else(|| {
            AppError::field("file_type", format!("\"{}\" is not a valid choice.", raw))
        })?;
        condition = condition.add(asset::Column::FileType.eq(kind));
    }
    if let Some(owner) = filters.owner {
        condition = condition.add(asset::Column::OwnerId.eq(owner));
    }
    if let Some(is_active) = filters.is_active {
        condition = condition.add(asset::Column::IsActive.eq(is_active));
    }
    let (column, order) = parse_ordering(filters.ordering.as_deref())?;

    let page = pagination.page();
    let limit = pagination.limit();
    let paginator = asset::Entity::find()
        .filter(condition)
        .order_by(column, order)
        .order_by_asc(asset::Column::Id)
        .paginate(&state.db, limit);

    let total_items = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;
    let data = build_responses(&state.db, items, base.url()).await?;

    Ok(Json(PaginatedResponse::new(data, total_items, page, limit)))
}

#[utoipa::path(
    post,
    path = "/api/assets",
    request_body(content = Vec<u8>, content_type = "multipart/form-data",
        description = "file, title, description, tags (repeated or a JSON array), file_type"),
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Editor or admin role required")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn create_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    client: ClientMeta,
    base: BaseUrl,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AssetResponse>), AppError> {
    actor.require(Capability::ManageAssets)?;

    let form = AssetForm::read(multipart).await?;
    form.check_create()?;
    let AssetForm {
        file,
        title,
        description,
        tags,
        file_type,
        is_active,
        ..
    } = form;
    let (Some(file), Some(title)) = (file, title) else {
        return Err(AppError::BadRequest("File and title are required".to_string()));
    };

    let key = asset_key(actor.id, &file.filename);
    state.store.put(&key, file.data.clone()).await?;

    let created = insert_asset(
        &state,
        &actor,
        &client,
        NewAsset {
            key: key.clone(),
            file,
            title,
            description: description.filter(|d| !d.is_empty()),
            tags: tags.unwrap_or_default(),
            file_type,
            is_active: is_active.unwrap_or(true),
        },
    )
    .await;

    let created = match created {
        Ok(created) => created,
        Err(e) => {
            blobs::purge(state.store.as_ref(), [key]).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        user = %actor.username,
        asset_id = %created.id,
        file_type = created.file_type.as_str(),
        size = created.file_size,
        "asset uploaded"
    );
    let response = build_one(&state.db, created, base.url()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Same handler, kept under the path older clients post to.
#[utoipa::path(
    post,
    path = "/api/assets/upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Editor or admin role required")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn upload_asset(
    state: State<AppState>,
    actor: Extension<AuthUser>,
    client: ClientMeta,
    base: BaseUrl,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AssetResponse>), AppError> {
    create_asset(state, actor, client, base, multipart).await
}

struct NewAsset {
    key: String,
    file: UploadedFile,
    title: String,
    description: Option<String>,
    tags: Vec<String>,
    file_type: Option<FileType>,
    is_active: bool,
}

async fn insert_asset(
    state: &AppState,
    actor: &AuthUser,
    client: &ClientMeta,
    new: NewAsset,
) -> Result<asset::Model, DbErr> {
    let now = chrono::Utc::now().naive_utc();
    let file_type = new
        .file_type
        .unwrap_or_else(|| FileType::infer(&new.file.filename));

    let txn = state.db.begin().await?;
    let created = asset::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(actor.id),
        file_key: Set(new.key),
        original_filename: Set(new.file.filename.clone()),
        file_type: Set(file_type),
        title: Set(new.title),
        description: Set(new.description),
        tags: Set(serde_json::json!(new.tags)),
        version: Set(1),
        file_size: Set(new.file.size()),
        mime_type: Set(new.file.mime_type()),
        is_active: Set(new.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    activity::record(
        &txn,
        created.id,
        actor.id,
        Action::Upload,
        serde_json::json!({
            "filename": created.original_filename,
            "file_size": created.file_size,
        }),
        client,
    )
    .await?;
    txn.commit().await?;

    Ok(created)
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "Asset details", body = AssetResponse),
        (status = 404, description = "Asset not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn get_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    client: ClientMeta,
    base: BaseUrl,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetResponse>, AppError> {
    let asset = find_visible(&state.db, &actor, id).await?;

    activity::record(
        &state.db,
        asset.id,
        actor.id,
        Action::View,
        serde_json::json!({}),
        &client,
    )
    .await?;

    Ok(Json(build_one(&state.db, asset, base.url()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/assets/{id}",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data",
        description = "title, description, tags, is_active, file, changes"),
    responses(
        (status = 200, description = "Asset updated", body = AssetResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the owner, or role too low"),
        (status = 404, description = "Asset not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn update_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    client: ClientMeta,
    base: BaseUrl,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AssetResponse>, AppError> {
    let current = find_modifiable(&state.db, &actor, id).await?;
    let form = AssetForm::read(multipart).await?;

    if let Some(title) = form.title.as_deref() {
        if title.is_empty() {
            return Err(AppError::field("title", "This field may not be blank."));
        }
        if title.chars().count() > 255 {
            return Err(AppError::field(
                "title",
                "Ensure this field has no more than 255 characters.",
            ));
        }
    }

    let new_key = match &form.file {
        Some(file) => {
            let key = asset_key(current.owner_id, &file.filename);
            state.store.put(&key, file.data.clone()).await?;
            Some(key)
        }
        None => None,
    };

    let updated = apply_update(&state, &actor, &client, current, form, new_key.clone()).await;
    let updated = match updated {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(key) = new_key {
                blobs::purge(state.store.as_ref(), [key]).await;
            }
            return Err(e.into());
        }
    };

    Ok(Json(build_one(&state.db, updated, base.url()).await?))
}

async fn apply_update(
    state: &AppState,
    actor: &AuthUser,
    client: &ClientMeta,
    current: asset::Model,
    form: AssetForm,
    new_key: Option<String>,
) -> Result<asset::Model, DbErr> {
    let mut pending = current.clone().into_active_model();
    let mut changed: Vec<&str> = Vec::new();

    if let Some(title) = form.title {
        pending.title = Set(title);
        changed.push("title");
    }
    if let Some(description) = form.description {
        pending.description = Set(Some(description).filter(|d| !d.is_empty()));
        changed.push("description");
    }
    if let Some(tags) = form.tags {
        pending.tags = Set(serde_json::json!(tags));
        changed.push("tags");
    }
    if let Some(is_active) = form.is_active {
        pending.is_active = Set(is_active);
        changed.push("is_active");
    }
    pending.updated_at = Set(chrono::Utc::now().naive_utc());

    let txn = state.db.begin().await?;
    if let (Some(file), Some(key)) = (form.file, new_key) {
        versioning::supersede(
            &txn,
            &current,
            &mut pending,
            versioning::StoredFile {
                key,
                size: file.size(),
                mime_type: file.mime_type(),
                original_filename: file.filename,
            },
            actor.id,
            form.changes,
        )
        .await?;
    }
    let file_replaced = versioning::replaces_file(&pending);
    let updated = pending.update(&txn).await?;

    activity::record(
        &txn,
        updated.id,
        actor.id,
        Action::Edit,
        serde_json::json!({
            "fields": changed,
            "file_replaced": file_replaced,
            "version": updated.version,
        }),
        client,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(user = %actor.username, asset_id = %updated.id, file_replaced, "asset updated");
    Ok(updated)
}

#[utoipa::path(
    delete,
    path = "/api/assets/{id}",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 403, description = "Not the owner, or role too low"),
        (status = 404, description = "Asset not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let asset = find_modifiable(&state.db, &actor, id).await?;

    let keys = blobs::keys_for_assets(&state.db, &[asset.id]).await?;
    asset::Entity::delete_by_id(asset.id).exec(&state.db).await?;
    blobs::purge(state.store.as_ref(), keys).await;

    tracing::info!(user = %actor.username, asset_id = %id, "asset deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}/download",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Asset or file content not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn download_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    client: ClientMeta,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let asset = find_visible(&state.db, &actor, id).await?;
    let data = state.store.get(&asset.file_key).await?;

    activity::record(
        &state.db,
        asset.id,
        actor.id,
        Action::Download,
        serde_json::json!({ "version": asset.version }),
        &client,
    )
    .await?;

    let content_type = asset
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&asset.original_filename),
            ),
        ],
        data,
    )
        .into_response())
}

/// `attachment` header with the filename reduced to safe ASCII.
pub fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}/versions",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "Version history, newest first", body = [VersionResponse]),
        (status = 404, description = "Asset not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn list_versions(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    base: BaseUrl,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VersionResponse>>, AppError> {
    let asset = find_visible(&state.db, &actor, id).await?;

    let versions = asset_version::Entity::find()
        .filter(asset_version::Column::AssetId.eq(asset.id))
        .order_by_desc(asset_version::Column::VersionNumber)
        .all(&state.db)
        .await?;

    Ok(Json(
        versions
            .into_iter()
            .map(|v| VersionResponse::build(v, base.url()))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/versions/{version_id}/restore",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("version_id" = Uuid, Path, description = "Version to restore")
    ),
    responses(
        (status = 200, description = "Version restored as a new version", body = AssetResponse),
        (status = 403, description = "Not the owner, or role too low"),
        (status = 404, description = "Asset or version not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn restore_version(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    client: ClientMeta,
    base: BaseUrl,
    Path((id, version_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AssetResponse>, AppError> {
    let current = find_modifiable(&state.db, &actor, id).await?;

    let version = asset_version::Entity::find_by_id(version_id)
        .filter(asset_version::Column::AssetId.eq(current.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Version not found".to_string()))?;

    if !state.store.exists(&version.file_key).await? {
        tracing::warn!(key = %version.file_key, "version blob missing");
        return Err(AppError::NotFound("File content not found".to_string()));
    }

    let txn = state.db.begin().await?;
    let mut pending = current.clone().into_active_model();
    pending.updated_at = Set(chrono::Utc::now().naive_utc());
    versioning::supersede(
        &txn,
        &current,
        &mut pending,
        versioning::StoredFile {
            mime_type: mime_guess::from_path(&version.file_key)
                .first()
                .map(|m| m.essence_str().to_string())
                .or_else(|| current.mime_type.clone()),
            original_filename: restored_filename(&current.original_filename, &version.file_key),
            key: version.file_key.clone(),
            size: version.file_size,
        },
        actor.id,
        Some(format!("Restored version {}", version.version_number)),
    )
    .await?;
    let updated = pending.update(&txn).await?;

    activity::record(
        &txn,
        updated.id,
        actor.id,
        Action::Edit,
        serde_json::json!({
            "restored_version": version.version_number,
            "file_replaced": true,
            "version": updated.version,
        }),
        &client,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        user = %actor.username,
        asset_id = %updated.id,
        restored = version.version_number,
        "asset version restored"
    );
    Ok(Json(build_one(&state.db, updated, base.url()).await?))
}

/// Keep the current filename stem but take the restored blob's extension.
pub fn restored_filename(current: &str, key: &str) -> String {
    let stem = std::path::Path::new(current)
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(current);
    let ext = key
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext);
    match ext {
        Some(ext) if extension_of(current).as_deref() == Some(&ext.to_ascii_lowercase()) => {
            current.to_string()
        }
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/api/assets/search",
    params(
        ("q" = Option<String>, Query, description = "Text in title or description, or an exact tag"),
        ("file_type" = Option<FileType>, Query, description = "File type"),
        ("tags" = Option<Vec<String>>, Query, description = "Repeated; all must be present"),
        ("date_from" = Option<String>, Query, description = "Created on or after (date or date-time)"),
        ("date_to" = Option<String>, Query, description = "Created on or before (date or date-time)")
    ),
    responses(
        (status = 200, description = "Matching active assets", body = [AssetResponse]),
        (status = 400, description = "Invalid search parameter")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn search_assets(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    base: BaseUrl,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<AssetResponse>>, AppError> {
    let params = SearchParams::from_query(raw.as_deref().unwrap_or_default())?;

    let mut condition = Condition::all()
        .add(scope::assets(&actor))
        .add(asset::Column::IsActive.eq(true));
    if let Some(kind) = params.file_type {
        condition = condition.add(asset::Column::FileType.eq(kind));
    }
    if let Some(from) = params.date_from {
        condition = condition.add(asset::Column::CreatedAt.gte(from));
    }
    if let Some(to) = params.date_to {
        condition = condition.add(asset::Column::CreatedAt.lte(to));
    }

    let matches: Vec<asset::Model> = asset::Entity::find()
        .filter(condition)
        .order_by_desc(asset::Column::CreatedAt)
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|asset| params.matches(asset))
        .collect();

    tracing::debug!(user = %actor.username, hits = matches.len(), "asset search");
    Ok(Json(build_responses(&state.db, matches, base.url()).await?))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Most used first, ties alphabetical.
pub fn rank_tags<I>(tag_lists: I, limit: usize) -> Vec<TagCount>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for tags in tag_lists {
        for tag in tags {
            *counts.entry(tag).or_default() += 1;
        }
    }
    let mut ranked: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    ranked.truncate(limit);
    ranked
}

#[utoipa::path(
    get,
    path = "/api/assets/tags/popular",
    responses(
        (status = 200, description = "Most used tags on visible active assets", body = [TagCount])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Assets"
)]
pub async fn popular_tags(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<Json<Vec<TagCount>>, AppError> {
    let rows: Vec<serde_json::Value> = asset::Entity::find()
        .select_only()
        .column(asset::Column::Tags)
        .filter(scope::assets(&actor))
        .filter(asset::Column::IsActive.eq(true))
        .into_tuple()
        .all(&state.db)
        .await?;

    let tag_lists = rows.into_iter().map(|tags| {
        tags.as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    });

    Ok(Json(rank_tags(tag_lists, POPULAR_TAG_LIMIT)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_defaults_to_newest_first() {
        let (column, order) = parse_ordering(None).unwrap();
        assert!(matches!(column, asset::Column::CreatedAt));
        assert!(matches!(order, Order::Desc));
    }

    #[test]
    fn ordering_accepts_known_columns_only() {
        let (column, order) = parse_ordering(Some("title")).unwrap();
        assert!(matches!(column, asset::Column::Title));
        assert!(matches!(order, Order::Asc));
        assert!(parse_ordering(Some("-password")).is_err());
    }

    #[test]
    fn tags_ranked_by_count_then_name() {
        let ranked = rank_tags(
            vec![
                vec!["logo".to_string(), "2024".to_string()],
                vec!["logo".to_string()],
                vec!["brand".to_string(), "2024".to_string()],
                vec!["logo".to_string(), "zeta".to_string()],
            ],
            3,
        );
        assert_eq!(
            ranked,
            vec![
                TagCount { tag: "logo".into(), count: 3 },
                TagCount { tag: "2024".into(), count: 2 },
                TagCount { tag: "brand".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn disposition_strips_unsafe_characters() {
        assert_eq!(
            content_disposition("my \"report\".pdf"),
            "attachment; filename=\"my _report_.pdf\""
        );
        assert_eq!(content_disposition("résumé.doc"), "attachment; filename=\"r_sum_.doc\"");
    }

    #[test]
    fn restored_filename_follows_blob_extension() {
        assert_eq!(restored_filename("logo.png", "assets/1/abc.PNG"), "logo.png");
        assert_eq!(restored_filename("logo.png", "assets/1/abc.jpg"), "logo.jpg");
        assert_eq!(restored_filename("README", "assets/1/abc"), "README");
    }
}
