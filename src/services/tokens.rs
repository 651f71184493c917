use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{refresh_token, user};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: user::Role,
    pub exp: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_access_token(config: &Config, user: &user::Model) -> Result<String, AppError> {
    let expiration = chrono::Utc::now().timestamp() + config.access_token_ttl_secs;
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        exp: expiration.max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encode error: {}", e)))
}

pub fn decode_access_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// Issue an access token plus a persisted refresh token.
pub async fn issue_pair<C: ConnectionTrait>(
    db: &C,
    config: &Config,
    user: &user::Model,
) -> Result<TokenPair, AppError> {
    let access = issue_access_token(config, user)?;

    let refresh = generate_refresh_token();
    let now = chrono::Utc::now().naive_utc();
    refresh_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        token_hash: Set(hash_token(&refresh)),
        expires_at: Set(now + chrono::Duration::seconds(config.refresh_token_ttl_secs)),
        created_at: Set(now),
        revoked: Set(false),
    }
    .insert(db)
    .await?;

    Ok(TokenPair { access, refresh })
}

pub fn generate_refresh_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut random_bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
