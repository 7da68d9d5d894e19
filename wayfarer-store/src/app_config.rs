use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Bounded retries for the optimistic capacity update before a
    /// ConcurrencyConflict surfaces to the caller.
    #[serde(default = "default_retry_attempts")]
    pub reservation_retry_attempts: u32,
    /// Upper bound on a single booking's party size.
    #[serde(default = "default_max_party_size")]
    pub max_party_size: i32,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_max_party_size() -> i32 {
    20
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            reservation_retry_attempts: default_retry_attempts(),
            max_party_size: default_max_party_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment variables with a WAYFARER__ prefix
            .add_source(config::Environment::with_prefix("WAYFARER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
