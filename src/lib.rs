pub mod auth;
pub mod config;
pub mod conversations;
pub mod db;
pub mod error;
pub mod proxy;

use std::sync::Arc;
use std::time::Duration;
use actix_web::{web, HttpResponse};
use tracing::{error, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, Session, SessionManager, SessionUser};
pub use conversations::ConversationService;
pub use db::{DbOperations, Store};
pub use proxy::CompletionGateway;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Landing page served at `/`.
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Health check endpoint handler
/// Reports whether the database answers, plus a timestamp
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match state.store.ping().await {
        Ok(()) => "up",
        Err(e) => {
            error!("Health check could not reach the database: {}", e);
            "down"
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Registers every route. Shared by the binary and the integration tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api")
                .route("/register", web::post().to(auth::handlers::register))
                .route("/login", web::post().to(auth::handlers::login))
                .route("/logout", web::post().to(auth::handlers::logout))
                .route("/user", web::get().to(auth::handlers::current_user))
                .route("/conversations", web::get().to(conversations::handlers::list_conversations))
                .route("/conversations", web::post().to(conversations::handlers::create_conversation))
                .route(
                    "/conversations/{id}/messages",
                    web::get().to(conversations::handlers::list_messages),
                )
                .route("/chat", web::post().to(proxy::handlers::chat)),
        );
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionManager>,
    pub auth_service: Arc<AuthService>,
    pub conversations: Arc<ConversationService>,
    pub completion: Arc<CompletionGateway>,
}

impl AppState {
    /// Opens the database, creates the schema if needed and wires the services.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(5),
        )
        .await?;
        db.init_schema().await?;

        Self::with_store(config, Arc::new(db))
    }

    pub fn with_store(config: Settings, store: Arc<dyn Store>) -> Result<Self> {
        if config.uses_insecure_secret() {
            warn!("Using the built-in session secret; set APP_AUTH__SESSION_SECRET for any real deployment");
        }
        if config.completion.api_key.is_empty() {
            warn!("No completion API key configured; chat requests will be rejected upstream");
        }

        Ok(Self {
            sessions: Arc::new(SessionManager::new(&config.auth)),
            auth_service: Arc::new(AuthService::new(store.clone())),
            conversations: Arc::new(ConversationService::new(store.clone())),
            completion: Arc::new(CompletionGateway::new(&config.completion)?),
            store,
            config: Arc::new(config),
        })
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}
