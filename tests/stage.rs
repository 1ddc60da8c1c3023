//! Pipeline mode: policies as tower layers and applied to a whole axum router.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use axum::routing::get;
use serde_json::json;
use tower::{Layer, ServiceExt, service_fn};

use axum_interceptors::{
    HandlerError, ParameterSet, Policy, PolicyError, Scope, StageLayer, apply,
};

type Log = Arc<Mutex<Vec<String>>>;

fn request() -> Request {
    Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap()
}

#[derive(Clone, Default)]
struct Recorder {
    label: &'static str,
    log: Log,
    params: ParameterSet,
    seen: Arc<Mutex<Vec<ParameterSet>>>,
    fail_before: bool,
}

impl Recorder {
    fn labeled(label: &'static str, log: &Log) -> Self {
        Self {
            label,
            log: Arc::clone(log),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Policy for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn construction_params(&self) -> ParameterSet {
        self.params.clone()
    }

    async fn before(&self, _req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError> {
        self.seen.lock().unwrap().push(params.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.before", self.label));
        if self.fail_before {
            return Err(PolicyError::Unauthorized);
        }
        Ok(())
    }

    async fn after(
        &self,
        _scope: &Scope,
        response: Option<&mut Response>,
        _params: &ParameterSet,
    ) -> Result<(), PolicyError> {
        let tag = if response.is_some() { "some" } else { "none" };
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.after({tag})", self.label));
        Ok(())
    }
}

#[tokio::test]
async fn stage_runs_the_lifecycle_around_the_inner_service() {
    let log: Log = Default::default();
    let policy = Recorder::labeled("p", &log);

    let inner_log = Arc::clone(&log);
    let svc = policy.stage().layer(service_fn(move |_req: Request| {
        let log = Arc::clone(&inner_log);
        async move {
            log.lock().unwrap().push("inner".into());
            Ok::<_, HandlerError>(Response::new(Body::from("ok")))
        }
    }));

    let res = svc.oneshot(request()).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["p.before", "inner", "p.after(some)"]
    );
}

#[tokio::test]
async fn stages_nest_as_an_onion() {
    let log: Log = Default::default();
    let outer = Recorder::labeled("outer", &log);
    let inner = Recorder::labeled("inner", &log);

    let terminal_log = Arc::clone(&log);
    let terminal = service_fn(move |_req: Request| {
        let log = Arc::clone(&terminal_log);
        async move {
            log.lock().unwrap().push("terminal".into());
            Ok::<_, HandlerError>(Response::new(Body::empty()))
        }
    });

    let svc = StageLayer::new(outer).layer(StageLayer::new(inner).layer(terminal));

    svc.oneshot(request()).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "outer.before",
            "inner.before",
            "terminal",
            "inner.after(some)",
            "outer.after(some)"
        ]
    );
}

#[tokio::test]
async fn inner_service_failure_reaches_after_with_no_response() {
    let log: Log = Default::default();
    let policy = Recorder::labeled("p", &log);

    let svc = StageLayer::new(policy).layer(service_fn(|_req: Request| async {
        Err::<Response, HandlerError>("boom".into())
    }));

    let err = svc.oneshot(request()).await.unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(*log.lock().unwrap(), vec!["p.before", "p.after(none)"]);
}

#[tokio::test]
async fn stage_params_resolve_at_construction() {
    let log: Log = Default::default();
    let policy = Recorder {
        params: ParameterSet::new().with("a", 1),
        ..Recorder::labeled("p", &log)
    };
    let seen = Arc::clone(&policy.seen);

    let svc = policy
        .stage_with(ParameterSet::new().with("a", 2).with("b", 3))
        .layer(service_fn(|_req: Request| async {
            Ok::<_, HandlerError>(Response::new(Body::empty()))
        }));

    svc.oneshot(request()).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].get("a"), Some(&json!(2)));
    assert_eq!(seen[0].get("b"), Some(&json!(3)));
}

#[tokio::test]
async fn apply_wraps_every_route_of_a_router() {
    let log: Log = Default::default();
    let policy = Recorder::labeled("p", &log);

    let router = Router::new().route("/", get(|| async { "hello" }));
    let router = apply(router, policy, ParameterSet::new());

    let res = router.oneshot(request()).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), vec!["p.before", "p.after(some)"]);
}

#[tokio::test]
async fn apply_renders_a_before_rejection() {
    let log: Log = Default::default();
    let policy = Recorder {
        fail_before: true,
        ..Recorder::labeled("p", &log)
    };

    let router = Router::new().route("/", get(|| async { "hello" }));
    let router = apply(router, policy, ParameterSet::new());

    let res = router.oneshot(request()).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(*log.lock().unwrap(), vec!["p.before"]);
}
