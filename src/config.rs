use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
const DEFAULT_RATE_LIMIT_AUTH_REQUESTS: u32 = 300;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters). No default: startup fails without it.
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT lifetime in seconds (5 min to 24 h)
    #[validate(range(min = 300, max = 86400))]
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    /// JWT issuer claim
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Rate limiting: requests per window per client IP
    #[serde(default = "default_rate_limit_requests")]
    #[validate(range(min = 1))]
    pub rate_limit_requests_per_window: u32,

    /// Rate limiting: allowance for `/api/auth` paths
    #[serde(default = "default_rate_limit_auth_requests")]
    #[validate(range(min = 1))]
    pub rate_limit_auth_requests_per_window: u32,

    /// Rate limiting: window size (seconds)
    #[serde(default = "default_rate_limit_window_secs")]
    #[validate(range(min = 1))]
    pub rate_limit_window_seconds: u64,

    /// Rate limit path policies: comma-separated list of `prefix:limit:window_secs`
    /// Example: "/api/orders:60:60,/api/gallery:20:60"
    #[serde(default)]
    pub rate_limit_path_policies: Option<String>,

    /// Attempts at generating a unique item code before giving up
    #[serde(default = "default_item_code_max_attempts")]
    #[validate(range(min = 1, max = 50))]
    pub item_code_max_attempts: u32,

    /// Largest accepted gallery upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Maximum JSON request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Image storage credentials. All three are required in production.
    #[serde(default)]
    pub cloudinary_cloud_name: Option<String>,
    #[serde(default)]
    pub cloudinary_api_key: Option<String>,
    #[serde(default)]
    pub cloudinary_api_secret: Option<String>,

    /// Base URL of the image storage REST API
    #[serde(default = "default_cloudinary_api_base")]
    pub cloudinary_api_base: String,

    /// Outbound image storage timeout (seconds)
    #[serde(default = "default_storage_timeout_secs")]
    pub storage_timeout_secs: u64,

    /// Master admin created at startup when no user with this name exists
    #[serde(default)]
    pub bootstrap_admin_username: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,
}

impl AppConfig {
    /// Builds a configuration with every optional setting at its default.
    pub fn new(database_url: String, jwt_secret: String, environment: String) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration: default_jwt_expiration(),
            jwt_issuer: default_jwt_issuer(),
            host: "127.0.0.1".to_string(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            rate_limit_requests_per_window: default_rate_limit_requests(),
            rate_limit_auth_requests_per_window: default_rate_limit_auth_requests(),
            rate_limit_window_seconds: default_rate_limit_window_secs(),
            rate_limit_path_policies: None,
            item_code_max_attempts: default_item_code_max_attempts(),
            max_upload_bytes: default_max_upload_bytes(),
            max_body_size: default_max_body_size(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_api_base: default_cloudinary_api_base(),
            storage_timeout_secs: default_storage_timeout_secs(),
            bootstrap_admin_username: None,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// True when all three image storage credentials are present.
    pub fn has_image_storage(&self) -> bool {
        [
            &self.cloudinary_cloud_name,
            &self.cloudinary_api_key,
            &self.cloudinary_api_secret,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.is_production() && !self.has_image_storage() {
            let mut err = ValidationError::new("image_storage_required");
            err.message = Some(
                "APP__CLOUDINARY_CLOUD_NAME, APP__CLOUDINARY_API_KEY and APP__CLOUDINARY_API_SECRET are required in production".into(),
            );
            errors.add("cloudinary_api_secret", err);
        }

        if self.rate_limit_auth_requests_per_window < self.rate_limit_requests_per_window {
            let mut err = ValidationError::new("auth_rate_limit_too_low");
            err.message = Some(
                "rate_limit_auth_requests_per_window must not be lower than rate_limit_requests_per_window".into(),
            );
            errors.add("rate_limit_auth_requests_per_window", err);
        }

        let bootstrap = [
            self.bootstrap_admin_username.is_some(),
            self.bootstrap_admin_email.is_some(),
            self.bootstrap_admin_password.is_some(),
        ];
        if bootstrap.iter().any(|set| *set) && !bootstrap.iter().all(|set| *set) {
            let mut err = ValidationError::new("bootstrap_admin_incomplete");
            err.message = Some(
                "bootstrap_admin_username, bootstrap_admin_email and bootstrap_admin_password must be set together".into(),
            );
            errors.add("bootstrap_admin_password", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs derive validation followed by the cross-field checks.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.validate_additional_constraints()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_jwt_expiration() -> u64 {
    3600
}
fn default_jwt_issuer() -> String {
    "backoffice-api".to_string()
}
fn default_db_max_connections() -> u32 {
    20
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    10
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    10
}
fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}
fn default_rate_limit_auth_requests() -> u32 {
    DEFAULT_RATE_LIMIT_AUTH_REQUESTS
}
fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}
fn default_item_code_max_attempts() -> u32 {
    5
}
fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_event_channel_capacity() -> usize {
    1024
}
fn default_cloudinary_api_base() -> String {
    DEFAULT_CLOUDINARY_API_BASE.to_string()
}
fn default_storage_timeout_secs() -> u64 {
    30
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

pub(crate) fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 4] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "INSECURE_DEFAULT_DO_NOT_USE_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "default", "12345", "abcdef", "secret"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("backoffice_api={},tower_http=debug", level));

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from an explicit directory and profile name.
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    // jwt_secret deliberately has no default.
    let config = Config::builder()
        .set_default("database_url", "sqlite://backoffice.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
        .add_source(File::with_name(&dir.join(run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 64 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    const STRONG_SECRET: &str =
        "Qm7vT2xK9pL4wR8nZ3cF6hJ1yB5sD0gA-Nu7Ex2Wq9Kt4Lr8Mz3Vc6Hb1Jy5Sd0Gf";

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://backoffice.db?mode=memory".into(),
            STRONG_SECRET.into(),
            "production".into(),
        )
    }

    fn with_storage(mut cfg: AppConfig) -> AppConfig {
        cfg.cloudinary_cloud_name = Some("demo".into());
        cfg.cloudinary_api_key = Some("key".into());
        cfg.cloudinary_api_secret = Some("secret".into());
        cfg
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = with_storage(base_config());
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = with_storage(base_config());
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_image_storage() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://example.com".into());
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("cloudinary_api_secret"));

        assert!(with_storage(cfg).validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn partial_bootstrap_admin_is_rejected() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.bootstrap_admin_username = Some("root".into());
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn jwt_secret_rules() {
        assert!(validate_jwt_secret(STRONG_SECRET).is_ok());
        assert!(validate_jwt_secret("short").is_err());
        assert!(validate_jwt_secret(&"a".repeat(80)).is_err());
        assert!(validate_jwt_secret(&format!("password{}", STRONG_SECRET)).is_err());
        assert!(validate_jwt_secret(&"ab".repeat(40)).is_err());
    }

    #[test]
    fn expiration_outside_bounds_fails_validation() {
        let mut cfg = base_config();
        cfg.jwt_expiration = 10;
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod load_tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn missing_secret_fails_fast() {
        if env::var("APP__JWT_SECRET").is_ok() {
            return;
        }
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "database_url = \"sqlite://x.db\"\n");

        let result = load_config_from(dir.path(), "development");
        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }

    #[test]
    fn profile_file_overrides_default_file() {
        if env::var("APP__JWT_SECRET").is_ok() || env::var("APP__PORT").is_ok() {
            return;
        }
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            "jwt_secret = \"Qm7vT2xK9pL4wR8nZ3cF6hJ1yB5sD0gA-Nu7Ex2Wq9Kt4Lr8Mz3Vc6Hb1Jy5Sd0Gf\"\nport = 9000\n",
        );
        write(&dir, "staging.toml", "port = 9100\ncors_allow_any_origin = true\n");

        let config = load_config_from(dir.path(), "staging").unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.environment, "staging");
        assert_eq!(config.rate_limit_auth_requests_per_window, 300);
    }
}
