//! Clamp Incident Register web server

mod auth;
mod db;
mod error;
mod pages;
mod respond;
mod routes;
#[cfg(test)]
mod testutil;

use axum::{
    routing::{get, post},
    Router,
};
use clamp_core::{upload::UPLOAD_SUBDIR, Argon2Scheme, PasswordScheme};
use sha2::{Digest, Sha512};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::Key, MemoryStore, SessionManagerLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: AppConfig,
    pub passwords: Arc<dyn PasswordScheme>,
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub secret_key: Option<String>,
    pub default_admin_password: Option<String>,
    pub static_dir: String,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: std::env::var("CLAMP_DATABASE_PATH")
                .unwrap_or_else(|_| "clamping_business.db".to_string()),
            secret_key: std::env::var("SECRET_KEY").ok(),
            default_admin_password: std::env::var("DEFAULT_ADMIN_PASSWORD").ok(),
            static_dir: std::env::var("CLAMP_STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
            bind_addr: std::env::var("CLAMP_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}

impl AppConfig {
    pub fn static_root(&self) -> PathBuf {
        PathBuf::from(&self.static_dir)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.static_root().join(UPLOAD_SUBDIR)
    }

    /// Candidate database files for the startup schema-evolution probe:
    /// the configured path, the instance directory, then the current
    /// working directory.
    pub fn database_candidates(&self) -> Vec<PathBuf> {
        let file_name = Path::new(&self.database_path)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("clamping_business.db"));
        let mut candidates = vec![PathBuf::from(&self.database_path)];
        candidates.push(PathBuf::from("instance").join(&file_name));
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(&file_name));
        }
        candidates
    }
}

/// Cookie signing key: derived from the configured secret, or generated
/// fresh (sessions will not survive a restart) with a warning.
fn session_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => {
            warn!("No SECRET_KEY set in environment; using a runtime-generated signing key");
            warn!("Sessions will not survive a restart until SECRET_KEY is set to a persistent secret");
            Key::generate()
        }
    }
}

pub fn app(state: Arc<AppState>, key: Key) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_signed(key);

    Router::new()
        // Health check
        .route("/health", get(routes::health_check))
        // Clamp records
        .route("/", get(routes::clamps::index))
        .route("/dashboard", get(routes::clamps::dashboard))
        .route("/clamp-form", get(routes::clamps::clamp_form))
        .route("/clamp_form", get(routes::clamps::clamp_form))
        .route("/clamp-list", get(routes::clamps::clamp_list))
        .route("/clamp_list", get(routes::clamps::clamp_list))
        .route("/add-clamp", post(routes::clamps::add_clamp))
        .route(
            "/edit-clamp/:id",
            get(routes::clamps::edit_clamp_form).post(routes::clamps::edit_clamp),
        )
        .route("/delete-clamp/:id", get(routes::clamps::delete_clamp))
        .route(
            "/delete-clamp-with-appeals/:id",
            post(routes::clamps::delete_clamp_with_appeals),
        )
        .route("/api/clamp/:id", get(routes::clamps::api_clamp))
        .route("/clamp/:id/appeals", get(routes::clamps::clamp_appeals))
        .route("/invoicing", get(routes::clamps::invoicing))
        .route(
            "/presentation/invoice/:id",
            get(routes::clamps::presentation_invoice),
        )
        // Appeals
        .route("/appeals", get(routes::appeals::appeals))
        .route("/add-appeal", post(routes::appeals::add_appeal))
        .route("/edit-appeal/:id", post(routes::appeals::edit_appeal))
        .route("/delete-appeal/:id", get(routes::appeals::delete_appeal))
        // Authentication
        .route(
            "/login",
            get(routes::auth::login_form).post(routes::auth::login),
        )
        .route("/logout", get(routes::auth::logout))
        .route(
            "/change-password",
            get(routes::auth::change_password_form).post(routes::auth::change_password),
        )
        // Accounts
        .route("/users", get(routes::users::users))
        .route("/users/add", post(routes::users::add_user))
        .route("/users/delete/:id", get(routes::users::delete_user))
        // Static assets and uploads
        .nest_service("/static", ServeDir::new(state.config.static_root()))
        // Sessions
        .layer(session_layer)
        // Tracing
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "clamp_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clamp Incident Register");

    let config = AppConfig::default();

    // Create upload directory
    std::fs::create_dir_all(config.upload_dir()).expect("Failed to create upload directory");

    // Evolve pre-existing database files before touching the schema
    db::migrate::ensure_schema_columns(&config.database_candidates()).await;

    // Connect to database
    let pool = db::connect(Path::new(&config.database_path))
        .await
        .expect("Failed to open database");

    db::init_schema(&pool).await.expect("Failed to create schema");

    info!("Database ready at {}", config.database_path);

    // Password hashing strategy, chosen once here
    let passwords: Arc<dyn PasswordScheme> = Arc::new(Argon2Scheme);

    db::ensure_bootstrap_admin(
        &pool,
        passwords.as_ref(),
        config.default_admin_password.as_deref(),
    )
    .await
    .expect("Failed to provision bootstrap admin");

    let key = session_key(config.secret_key.as_deref());
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState {
        db: pool,
        config,
        passwords,
    });

    let app = app(state, key);

    info!("Listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}
