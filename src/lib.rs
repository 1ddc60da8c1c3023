/*
 * Responsibility
 * - モジュール配線と公開 API の re-export（ロジックは置かない）
 *
 * 全体像:
 * - policy: before/after フックの契約と attach の入り口
 * - bind: 単一 handler への attach とライフサイクル実行
 * - group: verb handler をまとめた型への一括 attach
 * - stage: Router / tower チェーン全体への適用
 * - policies: 同梱ポリシー (auth / db / cache / session)
 */

pub mod bind;
pub mod config;
pub mod error;
pub mod group;
pub mod params;
pub mod policies;
pub mod policy;
pub mod scope;
pub mod stage;

pub use bind::{BoxHandler, HandlerError, HandlerFuture, HandlerResult, IntoBoxHandler, into_axum};
pub use error::{AttachError, PolicyError};
pub use group::{HandlerGroup, Intercepted, RECOGNIZED_VERBS, serve};
pub use params::ParameterSet;
pub use policy::{Attachment, Policy};
pub use scope::Scope;
pub use stage::{StageLayer, StageService, apply};
