/*
 * Responsibility
 * - PolicyError 定義 (Configuration / Validation / Unauthorized)
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - handler 本体のエラーはここでは表現しない (HandlerError として素通し)
 */
use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Failure raised by a policy hook.
///
/// Anything a handler itself raises is a `HandlerError` and passes through the
/// wrapper untouched; this enum only covers the hooks' own failure modes.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy cannot resolve required configuration. Server-side fault.
    #[error("missing configuration: {message}")]
    Configuration { message: String },
    /// Inbound data failed a well-formedness check. Client-side fault.
    #[error("{code}: {message}")]
    Validation { code: &'static str, message: String },
    /// Well-formed credential failed the policy's check.
    #[error("unauthorized")]
    Unauthorized,
}

impl PolicyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for PolicyError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            PolicyError::Configuration { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration", message)
            }
            PolicyError::Validation { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, code, message)
            }
            PolicyError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized".into())
            }
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

/// Failure while attaching a policy to a handler group.
///
/// Raised at attachment time, not at first request.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("handler group declares unsupported verb: {0}")]
    UnrecognizedVerb(Method),
}

/// Fallback response for handler failures that are not a `PolicyError`.
pub(crate) fn internal_error() -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: "INTERNAL_SERVER_ERROR",
            message: "internal server error".into(),
        },
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
