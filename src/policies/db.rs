//! Postgres session-per-request.
//!
//! `PgPools` is built once at startup (one pool per name); the `Db` policy
//! then checks a connection out of the named pool in `before`, parks it in
//! the scope for the handler, and releases it in `after` — on the failure
//! path too, so a handler error never leaks a connection.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::Request, response::Response};
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, Postgres};
use tokio::sync::Mutex;

use crate::config::PgConfig;
use crate::error::PolicyError;
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// Named pool registry, typically filled once during startup.
#[derive(Default)]
pub struct PgPools {
    pools: HashMap<String, PgPool>,
}

impl PgPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from config and registers it under `name`.
    pub async fn connect(
        &mut self,
        name: impl Into<String>,
        config: &PgConfig,
    ) -> Result<(), sqlx::Error> {
        let name = name.into();
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        tracing::info!(
            name = %name,
            max_connections = config.max_connections,
            "created postgres pool"
        );
        self.pools.insert(name, pool);
        Ok(())
    }

    /// Registers an already-built pool (tests, shared pools).
    pub fn insert(&mut self, name: impl Into<String>, pool: PgPool) {
        self.pools.insert(name.into(), pool);
    }

    pub fn get(&self, name: &str) -> Option<&PgPool> {
        self.pools.get(name)
    }
}

/// A checked-out connection parked in the scope for the handler.
///
/// Lock it to run queries; the policy's `after` hook takes the connection
/// back, which returns it to the pool.
pub struct DbSession {
    conn: Mutex<Option<PoolConnection<Postgres>>>,
}

impl DbSession {
    fn new(conn: PoolConnection<Postgres>) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Option<PoolConnection<Postgres>>> {
        self.conn.lock().await
    }

    async fn close(&self) {
        // Dropping the connection hands it back to the pool.
        self.conn.lock().await.take();
    }
}

/// Session-per-request policy over a [`PgPools`] registry.
///
/// Parameters:
/// - `db_name` (default `"default"`): which pool to draw from. The session
///   lands in the scope under `db_session.<db_name>`.
#[derive(Clone)]
pub struct Db {
    pools: Arc<PgPools>,
    params: ParameterSet,
}

impl Db {
    pub fn new(pools: Arc<PgPools>) -> Self {
        Self {
            pools,
            params: ParameterSet::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }

    pub fn scope_key(name: &str) -> String {
        format!("db_session.{name}")
    }
}

#[async_trait]
impl Policy for Db {
    fn name(&self) -> &'static str {
        "db"
    }

    fn construction_params(&self) -> ParameterSet {
        self.params.clone()
    }

    async fn before(&self, req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError> {
        let name = params.get_str("db_name").unwrap_or("default");

        let pool = self
            .pools
            .get(name)
            .ok_or_else(|| PolicyError::configuration("DB session not found"))?;

        tracing::debug!(db_name = name, "opening session");
        let conn = pool.acquire().await.map_err(|e| {
            PolicyError::configuration(format!("could not acquire connection for '{name}': {e}"))
        })?;

        let scope = Scope::attach_to(req);
        scope.insert(Self::scope_key(name), DbSession::new(conn));
        Ok(())
    }

    async fn after(
        &self,
        scope: &Scope,
        _response: Option<&mut Response>,
        params: &ParameterSet,
    ) -> Result<(), PolicyError> {
        let name = params.get_str("db_name").unwrap_or("default");
        let key = Self::scope_key(name);

        if let Some(session) = scope.get::<DbSession>(&key) {
            tracing::debug!(db_name = name, "closing session");
            session.close().await;
            scope.remove(&key);
        }
        Ok(())
    }
}
