//! Bearer-token equality check against a configured admin token.
use async_trait::async_trait;
use axum::{extract::Request, http::header};

use crate::error::PolicyError;
use crate::params::ParameterSet;
use crate::policy::Policy;

/// Accepts requests carrying `Authorization: Bearer <admin_token>`.
///
/// Parameters:
/// - `admin_token` (required): the expected token. Supplied at construction
///   (`AdminAuth::new`) or at the attachment site, which wins.
#[derive(Clone, Debug, Default)]
pub struct AdminAuth {
    params: ParameterSet,
}

impl AdminAuth {
    pub fn new(admin_token: impl Into<String>) -> Self {
        Self {
            params: ParameterSet::new().with("admin_token", admin_token.into()),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }
}

/// Extracts the token from a `Bearer <token>` header value. The token must be
/// alphanumeric (empty is allowed; it then simply fails the comparison).
fn bearer_token(value: &str) -> Result<&str, PolicyError> {
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| PolicyError::validation("malformed_bearer", "Malformed bearer token"))?;
    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PolicyError::validation(
            "malformed_bearer",
            "Malformed bearer token",
        ));
    }
    Ok(token)
}

#[async_trait]
impl Policy for AdminAuth {
    fn name(&self) -> &'static str {
        "admin_auth"
    }

    fn construction_params(&self) -> ParameterSet {
        self.params.clone()
    }

    async fn before(&self, req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError> {
        let expected = params.get_str("admin_token").ok_or_else(|| {
            PolicyError::configuration("missing 'admin_token' parameter")
        })?;

        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                PolicyError::validation("missing_authorization", "Missing authorization header")
            })?;

        let token = bearer_token(value)?;

        if token != expected {
            tracing::warn!("admin token mismatch");
            return Err(PolicyError::Unauthorized);
        }

        Ok(())
    }
}
