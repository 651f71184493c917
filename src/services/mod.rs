pub mod activity;
pub mod blobs;
pub mod passwords;
pub mod tokens;
pub mod versioning;
