mod activity;
mod assets;
mod auth;
mod comments;
mod home;
mod media;
mod metadata;
mod upload;
mod users;

pub use auth::looks_like_email;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::auth_middleware;
use crate::middleware::role::{require_admin, require_editor};
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        home::health,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::profile,
        auth::update_profile,
        auth::change_password,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        assets::list_assets,
        assets::create_asset,
        assets::upload_asset,
        assets::get_asset,
        assets::update_asset,
        assets::delete_asset,
        assets::download_asset,
        assets::list_versions,
        assets::restore_version,
        assets::search_assets,
        assets::popular_tags,
        media::serve_media,
        metadata::list_metadata,
        metadata::create_metadata,
        metadata::get_metadata,
        metadata::update_metadata,
        metadata::delete_metadata,
        activity::list_logs,
        activity::create_log,
        activity::get_log,
        activity::recent_activity,
        comments::list_comments,
        comments::create_comment,
        comments::get_comment,
        comments::update_comment,
        comments::delete_comment,
    ),
    components(
        schemas(
            home::HealthResponse,
            auth::RegisterRequest,
            auth::AuthResponse,
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::RefreshResponse,
            auth::MessageResponse,
            auth::ProfileUpdateRequest,
            auth::ChangePasswordRequest,
            users::UserResponse,
            users::UpdateUserRequest,
            assets::AssetResponse,
            assets::OwnerSummary,
            assets::VersionResponse,
            assets::TagCount,
            metadata::MetadataResponse,
            metadata::CreateMetadataRequest,
            metadata::UpdateMetadataRequest,
            activity::ActivityLogResponse,
            activity::CreateLogRequest,
            comments::CommentResponse,
            comments::CreateCommentRequest,
            comments::UpdateCommentRequest,
            crate::entities::user::Role,
            crate::entities::asset::FileType,
            crate::entities::activity_log::Action,
        )
    ),
    tags(
        (name = "General", description = "Landing page and health"),
        (name = "Authentication", description = "Registration, login, tokens and the caller's own profile"),
        (name = "User Management", description = "User administration (admin role required)"),
        (name = "Assets", description = "Upload, browse, version and search assets"),
        (name = "Media", description = "Stored file content"),
        (name = "Metadata", description = "Custom key/value fields on assets (editor or admin)"),
        (name = "Activity", description = "Activity log"),
        (name = "Comments", description = "Comments on assets")
    ),
    info(
        title = "Asset Vault API",
        version = "0.1.0",
        description = "Digital asset management: role-scoped asset access, file versioning, search, metadata, activity logging and comments",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // Any authenticated user; role checks happen per handler
    let protected_routes = Router::new()
        .route(
            "/api/auth/profile",
            get(auth::profile).put(auth::update_profile),
        )
        .route(
            "/api/auth/profile/change-password",
            post(auth::change_password),
        )
        .route(
            "/api/assets",
            get(assets::list_assets).post(assets::create_asset),
        )
        .route("/api/assets/upload", post(assets::upload_asset))
        .route("/api/assets/search", get(assets::search_assets))
        .route("/api/assets/tags/popular", get(assets::popular_tags))
        .route(
            "/api/assets/{id}",
            get(assets::get_asset)
                .patch(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/api/assets/{id}/download", get(assets::download_asset))
        .route("/api/assets/{id}/versions", get(assets::list_versions))
        .route(
            "/api/assets/{id}/versions/{version_id}/restore",
            post(assets::restore_version),
        )
        .route(
            "/api/activity/logs",
            get(activity::list_logs).post(activity::create_log),
        )
        .route("/api/activity/logs/{id}", get(activity::get_log))
        .route("/api/activity/recent", get(activity::recent_activity))
        .route(
            "/api/activity/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/activity/comments/{id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let editor_routes = Router::new()
        .route(
            "/api/metadata",
            get(metadata::list_metadata).post(metadata::create_metadata),
        )
        .route(
            "/api/metadata/{id}",
            get(metadata::get_metadata)
                .put(metadata::update_metadata)
                .delete(metadata::delete_metadata),
        )
        .route_layer(middleware::from_fn(require_editor))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/api/auth/users", get(users::list_users))
        .route(
            "/api/auth/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let max_upload_bytes = state.config.max_upload_bytes;
    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/api/health", get(home::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/media/{*key}", get(media::serve_media))
        .merge(protected_routes)
        .merge(editor_routes)
        .merge(admin_routes)
        .with_state(state);

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
