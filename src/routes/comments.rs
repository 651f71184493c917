use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{
    comment::{self, Entity as Comment},
    user::{self, Capability},
};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::routes::assets::find_visible;
use crate::scope;
use crate::AppState;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub asset: Uuid,
    pub user: i32,
    pub username: Option<String>,
    pub content: String,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl CommentResponse {
    fn build(row: comment::Model, username: Option<String>) -> Self {
        CommentResponse {
            id: row.id,
            asset: row.asset_id,
            user: row.user_id,
            username,
            content: row.content,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Visible assets only; soft-deleted comments are for admins.
fn visible(actor: &AuthUser) -> Condition {
    let condition = Condition::all().add(scope::through_asset(actor, comment::Column::AssetId));
    if actor.role.can(Capability::BypassOwnership) {
        condition
    } else {
        condition.add(comment::Column::IsActive.eq(true))
    }
}

fn check_content(content: Option<String>) -> Result<String, AppError> {
    match content.map(|c| c.trim().to_string()) {
        Some(c) if !c.is_empty() => Ok(c),
        Some(_) => Err(AppError::field("content", "This field may not be blank.")),
        None => Err(AppError::field("content", "This field is required.")),
    }
}

async fn with_usernames(
    state: &AppState,
    rows: Vec<comment::Model>,
) -> Result<Vec<CommentResponse>, AppError> {
    let names: HashMap<i32, String> = if rows.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Username)
            .filter(user::Column::Id.is_in(rows.iter().map(|r| r.user_id)))
            .into_tuple::<(i32, String)>()
            .all(&state.db)
            .await?
            .into_iter()
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let name = names.get(&row.user_id).cloned();
            CommentResponse::build(row, name)
        })
        .collect())
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CommentFilters {
    /// Only comments on this asset.
    pub asset: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/activity/comments",
    params(Pagination, CommentFilters),
    responses(
        (status = 200, description = "Comments on visible assets, newest first", body = PaginatedResponse<CommentResponse>)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<CommentFilters>,
) -> Result<Json<PaginatedResponse<CommentResponse>>, AppError> {
    let mut condition = visible(&actor);
    if let Some(asset_id) = filters.asset {
        condition = condition.add(comment::Column::AssetId.eq(asset_id));
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginator = Comment::find()
        .filter(condition)
        .order_by_desc(comment::Column::CreatedAt)
        .paginate(&state.db, limit);

    let total_items = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;
    let data = with_usernames(&state, rows).await?;

    Ok(Json(PaginatedResponse::new(data, total_items, page, limit)))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    pub asset: Option<Uuid>,
    pub content: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/activity/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let asset_id = payload
        .asset
        .ok_or_else(|| AppError::field("asset", "This field is required."))?;
    let content = check_content(payload.content)?;

    let asset = find_visible(&state.db, &actor, asset_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => {
                AppError::field("asset", "Invalid asset - object does not exist.")
            }
            other => other,
        })?;

    let now = chrono::Utc::now().naive_utc();
    let created = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        asset_id: Set(asset.id),
        user_id: Set(actor.id),
        content: Set(content),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::build(created, Some(actor.username))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/activity/comments/{id}",
    params(
        ("id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommentResponse>, AppError> {
    let row = find_comment(&state, &actor, id).await?;
    let mut built = with_usernames(&state, vec![row]).await?;
    built
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::InternalServerError("comment response went missing".to_string()))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/api/activity/comments/{id}",
    params(
        ("id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Only the author may edit"),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let row = find_comment(&state, &actor, id).await?;
    if row.user_id != actor.id {
        return Err(AppError::Forbidden(
            "You can only edit your own comments.".to_string(),
        ));
    }
    let content = check_content(payload.content)?;

    let mut active = row.into_active_model();
    active.content = Set(content);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(&state.db).await?;

    Ok(Json(CommentResponse::build(updated, Some(actor.username))))
}

#[utoipa::path(
    delete,
    path = "/api/activity/comments/{id}",
    params(
        ("id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Comment deactivated"),
        (status = 403, description = "Only the author or an admin may delete"),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Comments"
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let row = find_comment(&state, &actor, id).await?;
    if !actor.may_act_on(row.user_id) {
        return Err(AppError::Forbidden(
            "You can only delete your own comments.".to_string(),
        ));
    }

    let mut active = row.into_active_model();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_comment(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
) -> Result<comment::Model, AppError> {
    Comment::find_by_id(id)
        .filter(visible(actor))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
}
