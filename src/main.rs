use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use asset_vault::config::Config;
use asset_vault::entities::user::{self, Role};
use asset_vault::routes::{create_routes, looks_like_email};
use asset_vault::services::passwords::{hash_password, password_problems};
use asset_vault::storage::LocalStore;
use asset_vault::AppState;

#[derive(Parser)]
#[command(name = "asset-vault", version, about = "Digital asset management server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations and start the HTTP server (default)
    Serve,
    /// Create an admin account, prompting for the password
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&db, None)
        .await
        .context("failed to run migrations")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::CreateAdmin { username, email } => create_admin(&db, username, email).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn serve(config: Config, db: sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    let store = LocalStore::new(&config.media_root).with_context(|| {
        format!("failed to create media root {}", config.media_root.display())
    })?;

    let bind_address = config.bind_address.clone();
    let state = AppState {
        db,
        config: Arc::new(config),
        store: Arc::new(store),
    };
    let app = create_routes(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn create_admin(
    db: &sea_orm::DatabaseConnection,
    username: String,
    email: String,
) -> anyhow::Result<()> {
    let username = username.trim().to_string();
    let email = email.trim().to_string();
    if username.chars().count() < 3 {
        bail!("username must be at least 3 characters long");
    }
    if !looks_like_email(&email) {
        bail!("'{}' is not a valid email address", email);
    }
    let taken = user::Entity::find()
        .filter(
            sea_orm::Condition::any()
                .add(user::Column::Username.eq(&username))
                .add(user::Column::Email.eq(&email)),
        )
        .one(db)
        .await?;
    if taken.is_some() {
        bail!("a user with this username or email already exists");
    }

    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Password (again): ")?;
    if password != confirm {
        bail!("passwords didn't match");
    }
    let problems = password_problems(&password, &username);
    if !problems.is_empty() {
        bail!(problems.join(" "));
    }

    let hash = hash_password(&password).map_err(|e| anyhow!("failed to hash password: {:?}", e))?;
    let admin = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password: Set(hash),
        role: Set(Role::Admin),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        profile_info: Set(None),
        date_joined: Set(chrono::Utc::now().naive_utc()),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user = %admin.username, id = admin.id, "admin created");
    Ok(())
}
