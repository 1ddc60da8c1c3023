//! Basic auth check against a configured user/password map.
use async_trait::async_trait;
use axum::{extract::Request, http::header};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use serde_json::Value;

use crate::error::PolicyError;
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// Scope key holding the authenticated user name after a successful check.
pub const USER_SCOPE_KEY: &str = "basic_auth.user";

/// Checks `Authorization: Basic <base64(user:password)>` (URL-safe alphabet)
/// against the `users` parameter, an object mapping user names to passwords:
///
/// ```
/// use axum_interceptors::policies::BasicAuth;
/// use serde_json::json;
///
/// let policy = BasicAuth::new(json!({"alice": "wonder"}));
/// ```
///
/// On success the user name is written to the scope under
/// [`USER_SCOPE_KEY`].
#[derive(Clone, Debug, Default)]
pub struct BasicAuth {
    params: ParameterSet,
}

impl BasicAuth {
    pub fn new(users: Value) -> Self {
        Self {
            params: ParameterSet::new().with("users", users),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }
}

fn decode_credentials(value: &str) -> Result<(String, String), PolicyError> {
    let payload = value.strip_prefix("Basic ").ok_or_else(|| {
        PolicyError::validation("malformed_basic_auth", "Malformed Basic Auth header")
    })?;

    let decoded = URL_SAFE.decode(payload).map_err(|_| {
        PolicyError::validation("malformed_basic_auth", "Malformed Basic Auth header")
    })?;
    let text = String::from_utf8(decoded).map_err(|_| {
        PolicyError::validation("malformed_basic_auth", "Malformed Basic Auth header")
    })?;

    let (user, password) = text.split_once(':').ok_or_else(|| {
        PolicyError::validation(
            "malformed_basic_auth",
            "Malformed Basic Auth payload (should be username:password)",
        )
    })?;

    Ok((user.to_string(), password.to_string()))
}

#[async_trait]
impl Policy for BasicAuth {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    fn construction_params(&self) -> ParameterSet {
        self.params.clone()
    }

    async fn before(&self, req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError> {
        let users = params
            .get("users")
            .and_then(Value::as_object)
            .ok_or_else(|| PolicyError::configuration("missing 'users' parameter"))?;

        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                PolicyError::validation("missing_authorization", "Missing authorization header")
            })?;

        let (user, password) = decode_credentials(value)?;

        match users.get(&user).and_then(Value::as_str) {
            Some(expected) if expected == password => {
                let scope = Scope::attach_to(req);
                scope.insert(USER_SCOPE_KEY, user);
                Ok(())
            }
            _ => {
                tracing::warn!(user = %user, "basic auth rejected");
                Err(PolicyError::Unauthorized)
            }
        }
    }
}
