//! Process settings.
//!
//! Loaded once at startup with the `config` crate, lowest precedence first:
//!
//! 1. built-in defaults (the serde defaults below),
//! 2. an optional file named by `GATEWAY_CONFIG` (default `gateway.{toml,yaml,json}`),
//! 3. process environment variables (`PORT`, `USER_SERVICE_URL`, ...).
//!
//! [`Settings::gateway_config`] turns the flat settings into the immutable
//! [`GatewayConfig`] every runtime component is built from.  Nothing reads
//! the environment after this point.

use crate::handlers::RESERVED_PATHS;
use crate::routes::{canonical_backends, canonical_routes};
use crate::server::GatewayServerConfig;
use config::{Config, Environment, File, FileFormat};
use rentway_kernel::{AuthConfig, CorsConfig, GatewayConfig, RateLimitConfig, RouteRule};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming the optional settings file.
pub const CONFIG_FILE_ENV: &str = "GATEWAY_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "gateway";

/// Settings loading errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting '{0}': {1}")]
    Invalid(&'static str, String),
}

/// Deployment flavour; drives the CORS fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEnv {
    #[default]
    Development,
    Production,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Base URL of every backend microservice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub user_service_url: String,
    pub vehicle_service_url: String,
    pub rental_service_url: String,
    pub payment_service_url: String,
    pub notification_service_url: String,
    pub admin_service_url: String,
    pub support_service_url: String,
    pub rating_service_url: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            user_service_url: "http://user-service:3001".to_string(),
            vehicle_service_url: "http://vehicle-service:3002".to_string(),
            rental_service_url: "http://rental-service:3003".to_string(),
            payment_service_url: "http://payment-service:3004".to_string(),
            notification_service_url: "http://notification-service:3005".to_string(),
            admin_service_url: "http://admin-service:3006".to_string(),
            support_service_url: "http://support-service:3007".to_string(),
            rating_service_url: "http://rating-service:3008".to_string(),
        }
    }
}

/// Flat process settings.  Keys match the environment variable names in
/// lower case.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
    pub gateway_env: DeployEnv,
    pub log_level: String,
    pub log_format: LogFormat,
    pub frontend_url: String,
    #[serde(deserialize_with = "comma_list")]
    pub additional_cors_origins: Vec<String>,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
    #[serde(deserialize_with = "comma_list")]
    pub public_api_paths: Vec<String>,
    pub uploads_dir: PathBuf,
    pub files_root: PathBuf,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub user_service_url: String,
    pub vehicle_service_url: String,
    pub rental_service_url: String,
    pub payment_service_url: String,
    pub notification_service_url: String,
    pub admin_service_url: String,
    pub support_service_url: String,
    pub rating_service_url: String,
    /// Replaces the built-in route table when set (file only).
    pub routes: Option<Vec<RouteRule>>,
}

impl Default for Settings {
    fn default() -> Self {
        let urls = ServiceUrls::default();
        Self {
            port: 3000,
            gateway_env: DeployEnv::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            frontend_url: "http://frontend:4000".to_string(),
            additional_cors_origins: Vec::new(),
            rate_limit_max_requests: 100,
            rate_limit_window_seconds: 60,
            public_api_paths: Vec::new(),
            uploads_dir: PathBuf::from("/app/uploads"),
            files_root: PathBuf::from("/app"),
            request_timeout_secs: 30,
            max_body_bytes: 50 * 1024 * 1024,
            user_service_url: urls.user_service_url,
            vehicle_service_url: urls.vehicle_service_url,
            rental_service_url: urls.rental_service_url,
            payment_service_url: urls.payment_service_url,
            notification_service_url: urls.notification_service_url,
            admin_service_url: urls.admin_service_url,
            support_service_url: urls.support_service_url,
            rating_service_url: urls.rating_service_url,
            routes: None,
        }
    }
}

/// Accept either a list or a single comma-separated string.
fn comma_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Many(Vec<String>),
        One(String),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::Many(items) => items,
        Raw::One(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl Settings {
    /// Load from the optional settings file and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let settings: Settings = Config::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    /// Load from an in-memory document only (no environment).
    pub fn from_document(content: &str, format: FileFormat) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(content, format))
            .build()?
            .try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "request_timeout_secs",
                "must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(SettingsError::Invalid(
                "max_body_bytes",
                "must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn service_urls(&self) -> ServiceUrls {
        ServiceUrls {
            user_service_url: self.user_service_url.clone(),
            vehicle_service_url: self.vehicle_service_url.clone(),
            rental_service_url: self.rental_service_url.clone(),
            payment_service_url: self.payment_service_url.clone(),
            notification_service_url: self.notification_service_url.clone(),
            admin_service_url: self.admin_service_url.clone(),
            support_service_url: self.support_service_url.clone(),
            rating_service_url: self.rating_service_url.clone(),
        }
    }

    /// CORS allow-list: the frontend first, then any additional origins.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        for origin in &self.additional_cors_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }

    /// Build the (not yet validated) gateway configuration.
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::new("rentway-gateway")
            .with_timeout_ms(self.request_timeout_secs.saturating_mul(1000))
            .with_rate_limit(RateLimitConfig::new(
                self.rate_limit_max_requests,
                self.rate_limit_window_seconds,
            ))
            .with_auth(AuthConfig::default().with_public_paths(self.public_api_paths.clone()))
            .with_cors(CorsConfig::new(
                self.cors_origins(),
                self.gateway_env == DeployEnv::Development,
            ))
            .with_reserved_paths(RESERVED_PATHS);
        config.routes = self.routes.clone().unwrap_or_else(canonical_routes);
        config.backends = canonical_backends(&self.service_urls());
        config
    }

    /// Listener and local-endpoint settings for the server.
    pub fn server_config(&self) -> GatewayServerConfig {
        GatewayServerConfig {
            port: self.port,
            files_root: self.files_root.clone(),
            uploads_dir: self.uploads_dir.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Default `tracing` filter directive when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> String {
        let level = self.log_level.to_ascii_lowercase();
        format!("rentway_gateway={level},rentway_kernel={level},tower_http={level}")
    }
}
