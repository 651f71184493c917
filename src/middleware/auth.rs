use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::entities::user::{self, Capability, Role};
use crate::error::AppError;
use crate::services::tokens::decode_access_token;
use crate::AppState;

/// Identity of the caller as currently stored, looked up from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            tracing::warn!(
                user = %self.username,
                role = self.role.as_str(),
                ?capability,
                "permission denied"
            );
            Err(AppError::permission_denied())
        }
    }

    /// Owners may act on their own objects; admins on anyone's.
    pub fn may_act_on(&self, owner_id: i32) -> bool {
        self.id == owner_id || self.role.can(Capability::BypassOwnership)
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    let claims = decode_access_token(&state.config.jwt_secret, token).map_err(|e| {
        tracing::debug!(error = %e, "JWT decode error");
        AppError::Unauthorized("Given token not valid".to_string())
    })?;

    let id = claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized("Given token not valid".to_string()))?;

    // Role changes and deletions apply to tokens already issued.
    let stored = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            tracing::debug!(user_id = id, "token for a deleted user");
            AppError::Unauthorized("User not found".to_string())
        })?;

    req.extensions_mut().insert(AuthUser {
        id: stored.id,
        username: stored.username,
        role: stored.role,
    });

    Ok(next.run(req).await)
}
