//! Binds a shared cache connection into the request scope.
use async_trait::async_trait;
use axum::extract::Request;
use redis::aio::ConnectionManager;

use crate::config::CacheConfig;
use crate::error::PolicyError;
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// Makes a Valkey/Redis connection manager available to handlers.
///
/// Parameters:
/// - `cache_name` (default `"default"`): scope key suffix; the manager lands
///   under `cache.<cache_name>`.
///
/// The manager multiplexes over one shared connection and clones are cheap,
/// so `before` only inserts a clone into the scope and `after` has nothing to
/// release.
#[derive(Clone)]
pub struct Cache {
    manager: ConnectionManager,
    params: ParameterSet,
}

impl Cache {
    /// Connects to a URL like `redis://localhost:6379`.
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected cache backend");
        Ok(Self::from_manager(manager))
    }

    pub async fn from_config(config: &CacheConfig) -> Result<Self, redis::RedisError> {
        Self::connect(&config.url).await
    }

    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self {
            manager,
            params: ParameterSet::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }

    pub fn scope_key(name: &str) -> String {
        format!("cache.{name}")
    }
}

#[async_trait]
impl Policy for Cache {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn construction_params(&self) -> ParameterSet {
        self.params.clone()
    }

    async fn before(&self, req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError> {
        let name = params.get_str("cache_name").unwrap_or("default");

        let scope = Scope::attach_to(req);
        scope.insert(Self::scope_key(name), self.manager.clone());
        tracing::debug!(cache_name = name, "bound cache client");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_key_is_namespaced() {
        assert_eq!(Cache::scope_key("default"), "cache.default");
    }
}
