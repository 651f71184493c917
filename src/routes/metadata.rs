use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::metadata::{self, Entity as Metadata};
use crate::error::{AppError, FieldErrors};
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::routes::assets::find_visible;
use crate::scope;
use crate::AppState;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MetadataResponse {
    pub id: Uuid,
    pub asset: Uuid,
    pub field_name: String,
    pub field_value: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<metadata::Model> for MetadataResponse {
    fn from(row: metadata::Model) -> Self {
        MetadataResponse {
            id: row.id,
            asset: row.asset_id,
            field_name: row.field_name,
            field_value: row.field_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct MetadataFilters {
    /// Only fields of this asset.
    pub asset: Option<Uuid>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateMetadataRequest {
    pub asset: Option<Uuid>,
    pub field_name: Option<String>,
    pub field_value: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateMetadataRequest {
    pub field_name: Option<String>,
    pub field_value: Option<String>,
}

fn check_field_name(name: &str, errors: &mut FieldErrors) {
    if name.is_empty() {
        errors
            .entry("field_name".to_string())
            .or_default()
            .push("This field may not be blank.".to_string());
    } else if name.chars().count() > 100 {
        errors
            .entry("field_name".to_string())
            .or_default()
            .push("Ensure this field has no more than 100 characters.".to_string());
    }
}

fn duplicate_field(e: sea_orm::DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::field(
            "non_field_errors",
            "The fields asset, field_name must make a unique set.",
        ),
        _ => AppError::DatabaseError(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/metadata",
    params(Pagination, MetadataFilters),
    responses(
        (status = 200, description = "Metadata on visible assets", body = PaginatedResponse<MetadataResponse>),
        (status = 403, description = "Editor or admin role required")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Metadata"
)]
pub async fn list_metadata(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<MetadataFilters>,
) -> Result<Json<PaginatedResponse<MetadataResponse>>, AppError> {
    let mut condition =
        Condition::all().add(scope::through_asset(&actor, metadata::Column::AssetId));
    if let Some(asset_id) = filters.asset {
        condition = condition.add(metadata::Column::AssetId.eq(asset_id));
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginator = Metadata::find()
        .filter(condition)
        .order_by_asc(metadata::Column::AssetId)
        .order_by_asc(metadata::Column::FieldName)
        .paginate(&state.db, limit);

    let total_items = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;
    let data = rows.into_iter().map(MetadataResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_items, page, limit)))
}

#[utoipa::path(
    post,
    path = "/api/metadata",
    request_body = CreateMetadataRequest,
    responses(
        (status = 201, description = "Metadata field created", body = MetadataResponse),
        (status = 400, description = "Validation error or duplicate field name"),
        (status = 403, description = "Asset belongs to someone else")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Metadata"
)]
pub async fn create_metadata(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    AppJson(payload): AppJson<CreateMetadataRequest>,
) -> Result<(StatusCode, Json<MetadataResponse>), AppError> {
    let mut errors = FieldErrors::new();
    if payload.asset.is_none() {
        errors.insert("asset".to_string(), vec!["This field is required.".to_string()]);
    }
    let field_name = payload.field_name.unwrap_or_default().trim().to_string();
    check_field_name(&field_name, &mut errors);
    let field_value = match payload.field_value {
        Some(value) => value,
        None => {
            errors.insert("field_value".to_string(), vec!["This field is required.".to_string()]);
            String::new()
        }
    };
    let Some(asset_id) = payload.asset.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    let asset = find_visible(&state.db, &actor, asset_id).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::field("asset", "Invalid asset - object does not exist."),
        other => other,
    })?;
    if !actor.may_act_on(asset.owner_id) {
        tracing::warn!(user = %actor.username, asset_id = %asset.id, "metadata on foreign asset");
        return Err(AppError::permission_denied());
    }

    let now = chrono::Utc::now().naive_utc();
    let created = metadata::ActiveModel {
        id: Set(Uuid::new_v4()),
        asset_id: Set(asset.id),
        field_name: Set(field_name),
        field_value: Set(field_value),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(duplicate_field)?;

    Ok((StatusCode::CREATED, Json(MetadataResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/metadata/{id}",
    params(
        ("id" = Uuid, Path, description = "Metadata ID")
    ),
    responses(
        (status = 200, description = "Metadata field", body = MetadataResponse),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Metadata"
)]
pub async fn get_metadata(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MetadataResponse>, AppError> {
    let row = find_metadata(&state, &actor, id).await?;
    Ok(Json(MetadataResponse::from(row)))
}

#[utoipa::path(
    put,
    path = "/api/metadata/{id}",
    params(
        ("id" = Uuid, Path, description = "Metadata ID")
    ),
    request_body = UpdateMetadataRequest,
    responses(
        (status = 200, description = "Metadata field updated", body = MetadataResponse),
        (status = 403, description = "Asset belongs to someone else"),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Metadata"
)]
pub async fn update_metadata(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateMetadataRequest>,
) -> Result<Json<MetadataResponse>, AppError> {
    let row = find_owned_metadata(&state, &actor, id).await?;

    let mut errors = FieldErrors::new();
    let field_name = payload.field_name.map(|name| name.trim().to_string());
    if let Some(name) = &field_name {
        check_field_name(name, &mut errors);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut active = row.into_active_model();
    if let Some(name) = field_name {
        active.field_name = Set(name);
    }
    if let Some(value) = payload.field_value {
        active.field_value = Set(value);
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(&state.db).await.map_err(duplicate_field)?;

    Ok(Json(MetadataResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/metadata/{id}",
    params(
        ("id" = Uuid, Path, description = "Metadata ID")
    ),
    responses(
        (status = 204, description = "Metadata field deleted"),
        (status = 403, description = "Asset belongs to someone else"),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Metadata"
)]
pub async fn delete_metadata(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let row = find_owned_metadata(&state, &actor, id).await?;
    Metadata::delete_by_id(row.id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_metadata(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
) -> Result<metadata::Model, AppError> {
    Metadata::find_by_id(id)
        .filter(scope::through_asset(actor, metadata::Column::AssetId))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Metadata not found".to_string()))
}

async fn find_owned_metadata(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
) -> Result<metadata::Model, AppError> {
    let row = find_metadata(state, actor, id).await?;
    let asset = find_visible(&state.db, actor, row.asset_id).await?;
    if !actor.may_act_on(asset.owner_id) {
        return Err(AppError::permission_denied());
    }
    Ok(row)
}
