/*
 * Responsibility
 * - 環境変数からの設定読み込み (DATABASE_URL, CACHE_URL など)
 * - 不足があれば ConfigError で起動失敗にする
 */
use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Missing(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Connection settings for one named postgres pool.
pub struct PgConfig {
    pub url: String,
    pub max_connections: u32,
}

impl PgConfig {
    /// Reads `DATABASE_URL` for the `default` pool, `DATABASE_URL_<NAME>`
    /// otherwise. `DATABASE_MAX_CONNECTIONS` applies to all pools.
    pub fn from_env(name: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let key = if name == "default" {
            "DATABASE_URL".to_string()
        } else {
            format!("DATABASE_URL_{}", name.to_ascii_uppercase())
        };

        let url = std::env::var(&key).map_err(|_| ConfigError::Missing(key))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(20);

        Ok(Self {
            url,
            max_connections,
        })
    }
}

/// Connection settings for the cache backend.
pub struct CacheConfig {
    pub url: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let url = std::env::var("CACHE_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Self { url }
    }
}
