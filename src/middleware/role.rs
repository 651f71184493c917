use axum::{extract::Request, middleware::Next, response::Response};

use crate::entities::user::Capability;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;

async fn require(capability: Capability, req: Request, next: Next) -> Result<Response, AppError> {
    let auth_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    auth_user.require(capability)?;

    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    require(Capability::ManageUsers, req, next).await
}

pub async fn require_editor(req: Request, next: Next) -> Result<Response, AppError> {
    require(Capability::ManageAssets, req, next).await
}
