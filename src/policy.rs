/*
 * Responsibility
 * - Policy trait: before/after フックと構築時パラメータ
 * - attach の二形態 (素の attach / attach_with によるパラメータ付き) と
 *   型レベルの unbound() (構築時設定なし) を同じ内部経路に流す
 * - Attachment: 付け先 (関数 / handler group) を後から受け取る中間形
 */
use async_trait::async_trait;
use axum::{extract::Request, response::Response};

use crate::bind::{self, BoxHandler, IntoBoxHandler};
use crate::error::{AttachError, PolicyError};
use crate::group::{HandlerGroup, Intercepted};
use crate::params::ParameterSet;
use crate::scope::Scope;
use crate::stage::StageLayer;

/// A reusable pre/post behavior attachable to request handlers.
///
/// `before` runs ahead of the handler and is fail-closed: an error here means
/// the handler and `after` never run. `after` runs once per invocation after
/// the handler, with `Some(&mut response)` on success (mutate it to change
/// what the caller sees) or `None` when the handler failed. The default
/// `after` does nothing.
///
/// One policy instance can be attached to any number of targets; each
/// attachment carries its own merged parameter set, and each invocation runs
/// independently.
#[async_trait]
pub trait Policy: Send + Sync + 'static {
    /// Stable name used in log lines.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Parameters fixed when the policy instance was created. Attachment-time
    /// parameters override these key-by-key.
    fn construction_params(&self) -> ParameterSet {
        ParameterSet::new()
    }

    async fn before(&self, req: &mut Request, params: &ParameterSet) -> Result<(), PolicyError>;

    async fn after(
        &self,
        scope: &Scope,
        response: Option<&mut Response>,
        params: &ParameterSet,
    ) -> Result<(), PolicyError> {
        let _ = (scope, response, params);
        Ok(())
    }

    /// Bare attachment: no attachment-time parameters.
    fn attach<H: IntoBoxHandler>(&self, target: H) -> BoxHandler
    where
        Self: Clone + Sized,
    {
        self.attach_with(ParameterSet::new()).to(target)
    }

    /// Curried attachment: supply parameters now, the target later.
    fn attach_with(&self, params: ParameterSet) -> Attachment<Self>
    where
        Self: Clone + Sized,
    {
        Attachment::new(self.clone(), params)
    }

    /// Blanket attachment to a handler group; only its declared verb handlers
    /// are intercepted.
    fn attach_group<G: HandlerGroup>(&self, group: G) -> Result<Intercepted<G, Self>, AttachError>
    where
        Self: Clone + Sized,
    {
        self.attach_with(ParameterSet::new()).to_group(group)
    }

    /// Type-level entry point: attach without constructing a configured
    /// instance first. `P::unbound().to(h)` behaves exactly like
    /// `P::default().attach(h)`.
    fn unbound() -> Attachment<Self>
    where
        Self: Default + Clone + Sized,
    {
        Self::default().attach_with(ParameterSet::new())
    }

    /// Pipeline form: a tower layer running this policy for every request.
    fn stage(&self) -> StageLayer<Self>
    where
        Self: Clone + Sized,
    {
        StageLayer::new(self.clone())
    }

    /// Pipeline form with extra parameters, resolved once at construction.
    fn stage_with(&self, params: ParameterSet) -> StageLayer<Self>
    where
        Self: Clone + Sized,
    {
        StageLayer::with_params(self.clone(), params)
    }
}

/// A policy plus attachment-time parameters, waiting for its target.
///
/// The effective parameter set (construction merged with attachment,
/// attachment winning) is resolved when the target arrives; both inputs are
/// immutable so this is indistinguishable from resolving per call.
pub struct Attachment<P> {
    policy: P,
    params: ParameterSet,
}

impl<P: Policy + Clone> Attachment<P> {
    pub(crate) fn new(policy: P, params: ParameterSet) -> Self {
        Self { policy, params }
    }

    /// Adds one attachment-time parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params = self.params.with(key, value);
        self
    }

    fn effective(&self) -> ParameterSet {
        self.policy.construction_params().merge(&self.params)
    }

    /// Attaches to a single callable.
    pub fn to<H: IntoBoxHandler>(self, target: H) -> BoxHandler {
        let effective = self.effective();
        bind::wrap(self.policy, effective, target.into_box_handler())
    }

    /// Attaches to a handler group, validating its verb set up front.
    pub fn to_group<G: HandlerGroup>(self, group: G) -> Result<Intercepted<G, P>, AttachError> {
        let effective = self.effective();
        Intercepted::new(group, self.policy, effective)
    }
}
