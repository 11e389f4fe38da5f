use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;

/// Signing secret used when none is configured. Never deploy with this value.
pub const INSECURE_DEFAULT_SECRET: &str = "development_secret";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are StudyAI, a helpful AI assistant for students. \
Provide clear, concise, and accurate information to help with homework, studying, \
and understanding academic concepts.";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_secret: String,
    pub session_expiry_hours: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Deserialize, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout_secs: u64,
}

// Hand-written so the API key never ends up in logs.
impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    /// Comma separated list, used when `allow_any_origin` is off.
    pub allowed_origins: String,
    pub max_age: u32,
}

impl CorsConfig {
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub completion: CompletionConfig,
    pub cors: CorsConfig,
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("environment", "development")?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5000)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("database.url", "sqlite://database.db")?
        .set_default("database.max_connections", 5)?
        .set_default("auth.session_secret", INSECURE_DEFAULT_SECRET)?
        .set_default("auth.session_expiry_hours", 24)?
        .set_default("auth.cookie_name", "studyai_session")?
        .set_default("auth.cookie_secure", false)?
        .set_default("completion.api_url", "https://api.deepseek.com/v1/chat/completions")?
        .set_default("completion.api_key", "")?
        .set_default("completion.model", "deepseek-chat")?
        .set_default("completion.system_prompt", DEFAULT_SYSTEM_PROMPT)?
        .set_default("completion.timeout_secs", 60)?
        .set_default("cors.enabled", true)?
        .set_default("cors.allow_any_origin", false)?
        .set_default("cors.allowed_origins", "http://localhost:5000,http://127.0.0.1:5000")?
        .set_default("cors.max_age", 3600)
}

fn environment_source() -> Environment {
    // E.g. `APP_SERVER__PORT=5001` sets `Settings.server.port`
    Environment::with_prefix("app")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment_source())
            .build()?
            .try_deserialize()
    }

    /// Deterministic settings for tests: a private in-memory database and no
    /// environment overrides.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults(Config::builder())?
            .set_override("environment", "test")?
            .set_override("server.workers", 1)?
            .set_override("database.url", "sqlite::memory:")?
            .set_override("database.max_connections", 1)?
            .set_override("auth.session_secret", "test_secret")?
            .set_override("auth.session_expiry_hours", 1)?
            .set_override("completion.api_url", "http://127.0.0.1:9/v1/chat/completions")?
            .set_override("completion.api_key", "test-key")?
            .set_override("completion.timeout_secs", 5)?
            .build()?
            .try_deserialize()
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.auth.session_secret == INSECURE_DEFAULT_SECRET
    }
}
