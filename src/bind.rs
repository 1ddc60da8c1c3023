/*
 * Responsibility
 * - BoxHandler (boxed async handler) と IntoBoxHandler 変換
 * - before → handler → after のライフサイクル実行 (wrap / finish)
 * - axum handler への変換 (into_axum)
 */
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};

use crate::error::{self, PolicyError};
use crate::params::ParameterSet;
use crate::policy::Policy;
use crate::scope::Scope;

/// Failure raised by a wrapped handler. Boxed so the original error object
/// reaches the caller unchanged through any number of nested attachments.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<Response, HandlerError>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// The wrapped-callable shape: same calling convention in and out, so a
/// wrapped handler can be wrapped again.
pub type BoxHandler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// Anything a policy can be attached to: an async closure/fn taking the
/// request, or an already-wrapped `BoxHandler` (attachments nest, the
/// outermost attach call runs outermost).
pub trait IntoBoxHandler {
    fn into_box_handler(self) -> BoxHandler;
}

impl IntoBoxHandler for BoxHandler {
    fn into_box_handler(self) -> BoxHandler {
        self
    }
}

impl<F, Fut> IntoBoxHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn into_box_handler(self) -> BoxHandler {
        Arc::new(move |req| Box::pin(self(req)))
    }
}

/// Wraps `inner` with the lifecycle contract for `policy`.
///
/// Per invocation:
/// 1. the scope is attached to the request (shared, not copied);
/// 2. `before` runs; on error the handler and `after` never run (fail closed);
/// 3. the inner handler runs;
/// 4. `after` runs with `Some(response)` on success, `None` on failure;
/// 5. the response (possibly mutated by `after`) or the original failure is
///    returned.
pub(crate) fn wrap<P>(policy: P, params: ParameterSet, inner: BoxHandler) -> BoxHandler
where
    P: Policy + Clone,
{
    Arc::new(move |mut req: Request| -> HandlerFuture {
        let policy = policy.clone();
        let params = params.clone();
        let inner = Arc::clone(&inner);
        Box::pin(async move {
            let scope = Scope::attach_to(&mut req);
            policy
                .before(&mut req, &params)
                .await
                .map_err(into_handler_error)?;
            let outcome = inner(req).await;
            finish(&policy, &scope, outcome, &params).await
        })
    })
}

/// The post-dispatch half of the lifecycle, shared by function, group and
/// pipeline modes. The three terminal outcomes are explicit here:
/// - success: `after` sees the response and may mutate or replace it;
/// - handler failure: `after` sees `None`, then the original failure is
///   re-raised unchanged;
/// - `after` failure: propagates, masking a handler failure if there was one.
pub(crate) async fn finish<P: Policy>(
    policy: &P,
    scope: &Scope,
    outcome: HandlerResult,
    params: &ParameterSet,
) -> HandlerResult {
    match outcome {
        Ok(mut response) => {
            policy
                .after(scope, Some(&mut response), params)
                .await
                .map_err(into_handler_error)?;
            Ok(response)
        }
        Err(failure) => {
            tracing::debug!(
                policy = policy.name(),
                error = %failure,
                "handler failed, running after hook"
            );
            policy
                .after(scope, None, params)
                .await
                .map_err(into_handler_error)?;
            Err(failure)
        }
    }
}

pub(crate) fn into_handler_error(err: PolicyError) -> HandlerError {
    Box::new(err)
}

type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Adapts a wrapped handler into an axum handler closure.
///
/// A `PolicyError` renders through its own `IntoResponse`; any other handler
/// failure becomes a plain 500.
pub fn into_axum(
    handler: BoxHandler,
) -> impl Fn(Request) -> ResponseFuture + Clone + Send + Sync + 'static {
    move |req: Request| -> ResponseFuture {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            match handler(req).await {
                Ok(response) => response,
                Err(failure) => match failure.downcast::<PolicyError>() {
                    Ok(policy_err) => (*policy_err).into_response(),
                    Err(other) => {
                        tracing::error!(error = %other, "handler failed");
                        error::internal_error()
                    }
                },
            }
        })
    }
}
