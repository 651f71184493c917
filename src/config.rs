use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: String,
    /// Directory holding uploaded blobs.
    pub media_root: PathBuf,
    /// Origin used to build absolute file URLs. When unset the request's
    /// Host header is used instead.
    pub public_base_url: Option<Url>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let public_base_url = match env::var("PUBLIC_BASE_URL") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_base_url(&raw).map_err(|reason| {
                ConfigError::Invalid {
                    name: "PUBLIC_BASE_URL",
                    reason,
                }
            })?),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            media_root: PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string())),
            public_base_url,
            access_token_ttl_secs: parsed("ACCESS_TOKEN_TTL_SECS", 900)?,
            refresh_token_ttl_secs: parsed("REFRESH_TOKEN_TTL_SECS", 86_400)?,
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", 100 * 1024 * 1024)?,
        })
    }
}

/// Parse an origin and make sure it ends with a slash so that
/// `Url::join` keeps any path prefix.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    Ok(url)
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://cdn.example.com/dam").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/dam/");
        assert_eq!(
            url.join("media/a.png").unwrap().as_str(),
            "https://cdn.example.com/dam/media/a.png"
        );
    }

    #[test]
    fn base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:someone@example.com").is_err());
    }
}
