//! Bundled policies: small, swappable I/O glue built on the lifecycle core.

pub mod admin_auth;
pub mod basic_auth;
pub mod cache;
pub mod db;
pub mod session_check;

pub use admin_auth::AdminAuth;
pub use basic_auth::BasicAuth;
pub use cache::Cache;
pub use db::{Db, DbSession, PgPools};
pub use session_check::SessionCheck;
