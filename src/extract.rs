//! Request-derived values handed explicitly to handlers and response
//! builders.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use url::Url;

use crate::config::parse_base_url;
use crate::error::AppError;
use crate::AppState;

/// `axum::Json` whose rejections render as the usual JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Caller address and user agent recorded with activity entries.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());

        let ip = forwarded
            .or_else(|| {
                parts
                    .headers
                    .get("x-real-ip")
                    .and_then(|h| h.to_str().ok())
                    .map(|ip| ip.trim().to_string())
            })
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(ClientMeta { ip, user_agent })
    }
}

/// Origin for absolute blob URLs: the configured public URL, else the
/// request's Host. `None` when neither is available.
#[derive(Debug, Clone, Default)]
pub struct BaseUrl(pub Option<Url>);

impl BaseUrl {
    pub fn url(&self) -> Option<&Url> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(url) = &state.config.public_base_url {
            return Ok(BaseUrl(Some(url.clone())));
        }

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .filter(|h| !h.is_empty());
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .filter(|proto| *proto == "https" || *proto == "http")
            .unwrap_or("http");

        Ok(BaseUrl(
            host.and_then(|host| parse_base_url(&format!("{}://{}", scheme, host)).ok()),
        ))
    }
}

/// Absolute URL of a stored blob, served under `/media/`.
pub fn media_url(base: Option<&Url>, key: &str) -> Option<String> {
    base.and_then(|base| base.join(&format!("media/{}", key)).ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_needs_a_base() {
        assert_eq!(media_url(None, "assets/1/a.png"), None);
        let base = Url::parse("http://localhost:3000/").unwrap();
        assert_eq!(
            media_url(Some(&base), "assets/1/a.png").as_deref(),
            Some("http://localhost:3000/media/assets/1/a.png")
        );
    }
}
