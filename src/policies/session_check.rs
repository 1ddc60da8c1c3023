//! Rejects requests without an established session.
use async_trait::async_trait;
use axum::extract::Request;

use crate::error::PolicyError;
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// Requires that an upstream layer (session middleware, another policy) has
/// populated the session scope key before the handler runs.
///
/// Parameters:
/// - `session_key` (default `"session"`): the scope key to look for.
#[derive(Clone, Debug, Default)]
pub struct SessionCheck {
    params: ParameterSet,
}

impl SessionCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }
}

#[async_trait]
impl Policy for SessionCheck {
    fn name(&self) -> &'static str {
        "session_check"
    }

    fn construction_params(&self) -> ParameterSet {
        self.params.clone()
    }

    async fn before(&self, req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError> {
        let key = params.get_str("session_key").unwrap_or("session");

        let scope = Scope::attach_to(req);
        if !scope.contains_key(key) {
            return Err(PolicyError::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> Request {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn rejects_without_session() {
        let policy = SessionCheck::new();
        let mut req = request();

        let err = policy
            .before(&mut req, &ParameterSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::Unauthorized));
    }

    #[tokio::test]
    async fn accepts_with_session() {
        let policy = SessionCheck::new();
        let mut req = request();
        Scope::attach_to(&mut req).insert("session", String::from("sid-1"));

        policy.before(&mut req, &ParameterSet::new()).await.unwrap();
    }

    #[tokio::test]
    async fn session_key_is_overridable() {
        let policy = SessionCheck::new().with("session_key", "admin_session");
        let mut req = request();
        Scope::attach_to(&mut req).insert("session", String::from("sid-1"));

        let err = policy
            .before(&mut req, &policy.construction_params())
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::Unauthorized));
    }
}
