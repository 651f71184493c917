pub mod config;
pub mod entities;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod pagination;
pub mod routes;
pub mod scope;
pub mod search;
pub mod services;
pub mod storage;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::storage::ObjectStore;

/// Shared handles given to every request.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub store: Arc<dyn ObjectStore>,
}
