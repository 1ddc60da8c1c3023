/*
 * Responsibility
 * - StageLayer / StageService: policy を tower の Layer / Service として
 *   チェーンに差し込む (inner = 残りのチェーン全体)
 * - apply: axum Router 全体への適用 (middleware::from_fn ベース)
 */
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::bind::{self, HandlerError, HandlerResult};
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// Tower layer running one policy for every request that flows through it.
///
/// Stages compose by nesting: the outermost layer's `before` runs first and
/// its `after` runs last. Configuration is resolved once, at layer
/// construction; there is no per-handler attachment step in this mode.
#[derive(Clone)]
pub struct StageLayer<P> {
    policy: P,
    params: ParameterSet,
}

impl<P: Policy + Clone> StageLayer<P> {
    pub fn new(policy: P) -> Self {
        let params = policy.construction_params();
        Self { policy, params }
    }

    pub fn with_params(policy: P, params: ParameterSet) -> Self {
        let params = policy.construction_params().merge(&params);
        Self { policy, params }
    }
}

impl<S, P: Policy + Clone> Layer<S> for StageLayer<P> {
    type Service = StageService<S, P>;

    fn layer(&self, inner: S) -> Self::Service {
        StageService {
            inner,
            policy: self.policy.clone(),
            params: self.params.clone(),
        }
    }
}

/// The service produced by [`StageLayer`]. Runs the same lifecycle as a
/// per-handler attachment, with the inner service standing in for the
/// handler; an inner error is a handler failure, so `after` observes `None`
/// and the error propagates unchanged.
#[derive(Clone)]
pub struct StageService<S, P> {
    inner: S,
    policy: P,
    params: ParameterSet,
}

impl<S, P> Service<Request> for StageService<S, P>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: Into<HandlerError>,
    S::Future: Send,
    P: Policy + Clone,
{
    type Response = Response;
    type Error = HandlerError;
    type Future = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // Take the ready inner service, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let policy = self.policy.clone();
        let params = self.params.clone();

        Box::pin(async move {
            let scope = Scope::attach_to(&mut req);
            policy
                .before(&mut req, &params)
                .await
                .map_err(bind::into_handler_error)?;
            let outcome = inner.call(req).await.map_err(Into::into);
            bind::finish(&policy, &scope, outcome, &params).await
        })
    }
}

/// Applies a policy to every request of an axum router.
///
/// axum renders handler failures into responses before they reach outer
/// middleware, so in this mode `after` always observes `Some(response)`; a
/// `before` rejection renders through the policy error's own response
/// mapping.
pub fn apply<P, S>(router: Router<S>, policy: P, params: ParameterSet) -> Router<S>
where
    P: Policy + Clone,
    S: Clone + Send + Sync + 'static,
{
    let effective = policy.construction_params().merge(&params);

    router.layer(middleware::from_fn(move |mut req: Request, next: Next| {
        let policy = policy.clone();
        let params = effective.clone();
        async move {
            let scope = Scope::attach_to(&mut req);
            if let Err(err) = policy.before(&mut req, &params).await {
                tracing::warn!(policy = policy.name(), error = %err, "stage rejected request");
                return err.into_response();
            }
            let mut response = next.run(req).await;
            match policy.after(&scope, Some(&mut response), &params).await {
                Ok(()) => response,
                Err(err) => err.into_response(),
            }
        }
    }))
}
