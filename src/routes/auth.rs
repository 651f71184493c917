use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};

use crate::entities::{
    refresh_token::{self, Entity as RefreshToken},
    user::{self, Entity as User},
};
use crate::error::{AppError, FieldErrors};
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::routes::users::UserResponse;
use crate::services::{passwords, tokens};
use crate::AppState;

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_info: Option<String>,
}

/// A registration that passed every check that does not need the database.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: user::Role,
    pub first_name: String,
    pub last_name: String,
    pub profile_info: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut add = |field: &str, message: String| {
            errors.entry(field.to_string()).or_default().push(message);
        };

        let username = self.username.unwrap_or_default().trim().to_string();
        if username.is_empty() {
            add("username", "This field is required.".to_string());
        } else {
            if username.chars().count() < 3 {
                add("username", "Username must be at least 3 characters long.".to_string());
            }
            if username.chars().count() > 150
                || !username
                    .chars()
                    .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
            {
                add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                        .to_string(),
                );
            }
        }

        let email = self.email.unwrap_or_default().trim().to_string();
        if email.is_empty() {
            add("email", "This field is required.".to_string());
        } else if !looks_like_email(&email) {
            add("email", "Enter a valid email address.".to_string());
        }

        let password = self.password.unwrap_or_default();
        let password2 = self.password2.unwrap_or_default();
        if password.is_empty() {
            add("password", "This field is required.".to_string());
        } else {
            for problem in passwords::password_problems(&password, &username) {
                add("password", problem);
            }
        }
        if password2.is_empty() {
            add("password2", "This field is required.".to_string());
        } else if !password.is_empty() && password != password2 {
            add("password2", "Password fields didn't match.".to_string());
        }

        // TODO: decide whether self-registration may pick admin; today any
        // role is accepted and only the default is viewer.
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => user::Role::default(),
            Some(raw) => user::Role::parse(raw).unwrap_or_else(|| {
                add("role", "Role must be one of: admin, editor, viewer".to_string());
                user::Role::default()
            }),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewUser {
            username,
            email,
            password,
            role,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            profile_info: self.profile_info.filter(|info| !info.is_empty()),
        })
    }
}

pub fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    user: UserResponse,
    access: String,
    refresh: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    refresh: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RefreshResponse {
    access: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ProfileUpdateRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    profile_info: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    old_password: Option<String>,
    new_password: Option<String>,
    new_password2: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Field-level validation errors")
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let new_user = payload.validate().map_err(AppError::Validation)?;

    let mut errors = FieldErrors::new();
    if User::find()
        .filter(user::Column::Username.eq(&new_user.username))
        .one(&state.db)
        .await?
        .is_some()
    {
        errors.insert(
            "username".to_string(),
            vec!["A user with this username already exists.".to_string()],
        );
    }
    if User::find()
        .filter(user::Column::Email.eq(&new_user.email))
        .one(&state.db)
        .await?
        .is_some()
    {
        errors.insert(
            "email".to_string(),
            vec!["A user with this email already exists.".to_string()],
        );
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let password_hash = passwords::hash_password(&new_user.password)?;
    let created = user::ActiveModel {
        username: Set(new_user.username),
        email: Set(new_user.email),
        password: Set(password_hash),
        role: Set(new_user.role),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        profile_info: Set(new_user.profile_info),
        date_joined: Set(chrono::Utc::now().naive_utc()),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::field(
            "non_field_errors",
            "A user with this username or email already exists.",
        ),
        _ => AppError::DatabaseError(e),
    })?;

    let pair = tokens::issue_pair(&state.db, &state.config, &created).await?;

    tracing::info!(user = %created.username, role = created.role.as_str(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(created),
            access: pair.access,
            refresh: pair.refresh,
            message: Some("User registered successfully".to_string()),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (username, password) = match (payload.username, payload.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => {
            return Err(AppError::BadRequest(
                "Please provide both username and password".to_string(),
            ))
        }
    };

    let user = User::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?;

    let user = match user {
        Some(user) if passwords::verify_password(&password, &user.password)? => user,
        _ => {
            tracing::info!(user = %username, "login failed");
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let mut active_user = user.into_active_model();
    active_user.last_login = Set(Some(chrono::Utc::now().naive_utc()));
    let user = active_user.update(&state.db).await?;

    let pair = tokens::issue_pair(&state.db, &state.config, &user).await?;

    tracing::info!(user = %user.username, "login succeeded");
    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        access: pair.access,
        refresh: pair.refresh,
        message: None,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshResponse),
        (status = 401, description = "Invalid, revoked or expired refresh token")
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let token_hash = tokens::hash_token(&payload.refresh);

    let token = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(&token_hash))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid refresh token. Please re-login.".to_string())
        })?;

    if token.revoked {
        return Err(AppError::Unauthorized(
            "User logged out. Please re-login.".to_string(),
        ));
    }

    if token.expires_at < chrono::Utc::now().naive_utc() {
        return Err(AppError::Unauthorized(
            "Refresh token expired. Please re-login.".to_string(),
        ));
    }

    let user = User::find_by_id(token.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found. Please re-login.".to_string()))?;

    let access = tokens::issue_access_token(&state.config, &user)?;
    Ok(Json(RefreshResponse { access }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Logged out successfully", body = MessageResponse),
        (status = 404, description = "Refresh token not found")
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let token_hash = tokens::hash_token(&payload.refresh);

    let token = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(&token_hash))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Refresh token not found".to_string()))?;

    let mut active_token = token.into_active_model();
    active_token.revoked = Set(true);
    active_token.update(&state.db).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Own profile", body = UserResponse),
        (status = 401, description = "Unauthorized - Invalid or missing token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Authentication"
)]
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = current_user(&state, &auth_user).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Unauthorized - Invalid or missing token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Authentication"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(payload): AppJson<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = current_user(&state, &auth_user).await?;

    let mut active_user = user.into_active_model();
    if let Some(first_name) = payload.first_name {
        active_user.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        active_user.last_name = Set(last_name);
    }
    if let Some(profile_info) = payload.profile_info {
        active_user.profile_info = Set(Some(profile_info).filter(|info| !info.is_empty()));
    }

    let updated = active_user.update(&state.db).await?;
    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/api/auth/profile/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Wrong old password or weak new password")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Authentication"
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut errors = FieldErrors::new();
    let old_password = payload.old_password.unwrap_or_default();
    let new_password = payload.new_password.unwrap_or_default();
    let new_password2 = payload.new_password2.unwrap_or_default();

    for (field, value) in [
        ("old_password", &old_password),
        ("new_password", &new_password),
        ("new_password2", &new_password2),
    ] {
        if value.is_empty() {
            errors.insert(field.to_string(), vec!["This field is required.".to_string()]);
        }
    }
    if !new_password.is_empty() {
        let problems = passwords::password_problems(&new_password, &auth_user.username);
        if !problems.is_empty() {
            errors.insert("new_password".to_string(), problems);
        }
        if !new_password2.is_empty() && new_password != new_password2 {
            errors.insert(
                "new_password2".to_string(),
                vec!["Password fields didn't match.".to_string()],
            );
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = current_user(&state, &auth_user).await?;
    if !passwords::verify_password(&old_password, &user.password)? {
        return Err(AppError::field("old_password", "Wrong password."));
    }

    let mut active_user = user.into_active_model();
    active_user.password = Set(passwords::hash_password(&new_password)?);
    active_user.update(&state.db).await?;

    tracing::info!(user = %auth_user.username, "password changed");
    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

async fn current_user(state: &AppState, auth_user: &AuthUser) -> Result<user::Model, AppError> {
    User::find_by_id(auth_user.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user = %auth_user.username, "token refers to a missing user");
            AppError::Unauthorized("User not found".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: Some("carol".to_string()),
            email: Some("carol@example.com".to_string()),
            password: Some("tangerine-sky".to_string()),
            password2: Some("tangerine-sky".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_registration_defaults_to_viewer() {
        let user = request().validate().unwrap();
        assert_eq!(user.role, user::Role::Viewer);
        assert_eq!(user.username, "carol");
    }

    #[test]
    fn mismatched_passwords_are_reported_on_password2() {
        let mut req = request();
        req.password2 = Some("different-sky".to_string());
        let errors = req.validate().unwrap_err();
        assert_eq!(errors["password2"], vec!["Password fields didn't match.".to_string()]);
        assert!(!errors.contains_key("password"));
    }

    #[test]
    fn missing_fields_and_bad_role_are_collected() {
        let errors = RegisterRequest {
            role: Some("su".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        for field in ["username", "email", "password", "password2", "role"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn short_username_and_weak_password() {
        let mut req = request();
        req.username = Some("cj".to_string());
        req.password = Some("12345678".to_string());
        req.password2 = Some("12345678".to_string());
        let errors = req.validate().unwrap_err();
        assert!(errors["username"][0].contains("at least 3 characters"));
        assert!(errors["password"].iter().any(|m| m.contains("entirely numeric")));
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a b@c.de"));
        assert!(!looks_like_email("a@@b.co"));
        assert!(!looks_like_email("a@b.co."));
    }
}
