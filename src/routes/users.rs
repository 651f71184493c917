use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::{
    asset,
    user::{self, Entity as User},
};
use crate::error::{AppError, FieldErrors};
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::routes::auth::looks_like_email;
use crate::services::blobs;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: user::Role,
    pub first_name: String,
    pub last_name: String,
    pub profile_info: Option<String>,
    pub date_joined: chrono::NaiveDateTime,
    pub last_login: Option<chrono::NaiveDateTime>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_info: user.profile_info,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    email: Option<String>,
    role: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_info: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    responses(
        (status = 200, description = "List of all users", body = [UserResponse]),
        (status = 403, description = "Admin role required")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = User::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/auth/users/{id}",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state, user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/auth/users/{id}",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state, user_id).await?;
    let mut errors = FieldErrors::new();

    let role = match payload.role.as_deref() {
        Some(raw) => match user::Role::parse(raw) {
            Some(role) => Some(role),
            None => {
                errors.insert(
                    "role".to_string(),
                    vec!["Role must be one of: admin, editor, viewer".to_string()],
                );
                None
            }
        },
        None => None,
    };

    let email = match payload.email {
        Some(email) => {
            let email = email.trim().to_string();
            if !looks_like_email(&email) {
                errors.insert("email".to_string(), vec!["Enter a valid email address.".to_string()]);
            } else if email != user.email
                && User::find()
                    .filter(user::Column::Email.eq(&email))
                    .one(&state.db)
                    .await?
                    .is_some()
            {
                errors.insert(
                    "email".to_string(),
                    vec!["A user with this email already exists.".to_string()],
                );
            }
            Some(email)
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut active_user = user.into_active_model();
    if let Some(email) = email {
        active_user.email = Set(email);
    }
    if let Some(role) = role {
        active_user.role = Set(role);
    }
    if let Some(first_name) = payload.first_name {
        active_user.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        active_user.last_name = Set(last_name);
    }
    if let Some(profile_info) = payload.profile_info {
        active_user.profile_info = Set(Some(profile_info));
    }

    let updated = active_user.update(&state.db).await?;
    tracing::info!(admin = %auth_user.username, user_id, "user updated");
    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/auth/users/{id}",
    params(
        ("id" = i32, Path, description = "User ID to delete")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let user = find_user(&state, user_id).await?;

    if user.id == auth_user.id {
        tracing::warn!(admin = %auth_user.username, "admin tried to delete themselves");
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }

    let asset_ids: Vec<uuid::Uuid> = asset::Entity::find()
        .select_only()
        .column(asset::Column::Id)
        .filter(asset::Column::OwnerId.eq(user.id))
        .into_tuple()
        .all(&state.db)
        .await?;
    let keys = blobs::keys_for_assets(&state.db, &asset_ids).await?;

    // Assets, versions, comments and activity go through FK cascades.
    User::delete_by_id(user.id).exec(&state.db).await?;
    blobs::purge(state.store.as_ref(), keys).await;

    tracing::info!(admin = %auth_user.username, user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_user(state: &AppState, user_id: i32) -> Result<user::Model, AppError> {
    User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
