pub mod activity_log;
pub mod asset;
pub mod asset_version;
pub mod comment;
pub mod metadata;
pub mod refresh_token;
pub mod user;
