/*
 * Responsibility
 * - HandlerGroup: verb ごとの async handler をまとめた型の契約
 * - Intercepted: 宣言された verb の dispatch だけをライフサイクルで包む
 *   (verb 以外のメンバは Deref でそのまま素通し)
 * - serve: group を BoxHandler として公開 (未宣言 verb は 405)
 */
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
};

use crate::bind::{self, BoxHandler, HandlerFuture, HandlerResult};
use crate::error::AttachError;
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// The fixed request-verb vocabulary. Only members of this set are eligible
/// for interception on a handler group.
pub const RECOGNIZED_VERBS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

pub fn is_recognized(method: &Method) -> bool {
    RECOGNIZED_VERBS.contains(method)
}

/// A type holding several verb-named async handlers behind one dispatch
/// entry point, plus whatever helper methods it likes.
///
/// `verbs` enumerates the handlers the group actually declares; `dispatch`
/// routes a request to the matching one. Helper methods stay plain Rust
/// methods and are never touched by attachment.
#[async_trait]
pub trait HandlerGroup: Send + Sync + 'static {
    fn verbs(&self) -> &'static [Method];

    async fn dispatch(&self, req: Request) -> HandlerResult;
}

/// A handler group with a policy bound to its declared verb handlers.
///
/// Built at attachment time; an undeclared or unrecognized request method
/// passes straight through to the inner group, everything else runs the full
/// before/dispatch/after sequence. Derefs to the inner group so non-verb
/// members keep their identity.
pub struct Intercepted<G, P> {
    inner: G,
    policy: P,
    params: ParameterSet,
}

impl<G: HandlerGroup, P: Policy + Clone> Intercepted<G, P> {
    pub(crate) fn new(inner: G, policy: P, params: ParameterSet) -> Result<Self, AttachError> {
        // Fail at attachment, not at first request.
        if let Some(verb) = inner.verbs().iter().find(|m| !is_recognized(m)) {
            return Err(AttachError::UnrecognizedVerb(verb.clone()));
        }
        Ok(Self {
            inner,
            policy,
            params,
        })
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

impl<G, P> std::fmt::Debug for Intercepted<G, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intercepted")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<G, P> Deref for Intercepted<G, P> {
    type Target = G;

    fn deref(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: HandlerGroup, P: Policy + Clone> HandlerGroup for Intercepted<G, P> {
    fn verbs(&self) -> &'static [Method] {
        self.inner.verbs()
    }

    async fn dispatch(&self, mut req: Request) -> HandlerResult {
        if !self.verbs().contains(req.method()) {
            return self.inner.dispatch(req).await;
        }

        let scope = Scope::attach_to(&mut req);
        self.policy
            .before(&mut req, &self.params)
            .await
            .map_err(bind::into_handler_error)?;
        let outcome = self.inner.dispatch(req).await;
        bind::finish(&self.policy, &scope, outcome, &self.params).await
    }
}

/// Exposes a group as a `BoxHandler`: declared verbs dispatch, anything else
/// answers 405 with an `Allow` header.
pub fn serve<G: HandlerGroup>(group: Arc<G>) -> BoxHandler {
    Arc::new(move |req: Request| -> HandlerFuture {
        let group = Arc::clone(&group);
        Box::pin(async move {
            if !group.verbs().contains(req.method()) {
                let allow = group
                    .verbs()
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut res = StatusCode::METHOD_NOT_ALLOWED.into_response();
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    res.headers_mut().insert(header::ALLOW, value);
                }
                return Ok(res);
            }
            group.dispatch(req).await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_vocabulary() {
        assert!(is_recognized(&Method::GET));
        assert!(is_recognized(&Method::PATCH));
        assert!(is_recognized(&Method::CONNECT));
        assert!(!is_recognized(&Method::from_bytes(b"BREW").unwrap()));
    }
}
