use std::{io, path::PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{NotFound, SessionError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("invalid task transition: {0}")]
    Transition(String),

    #[error("could not encode job descriptor: {0}")]
    DescriptorEncode(#[from] toml::ser::Error),

    #[error("could not write job descriptor to {} or {}: {source}", primary.display(), fallback.display())]
    DescriptorWriteFailed {
        primary: PathBuf,
        fallback: PathBuf,
        source: io::Error,
    },

    #[error("worker failed: {0}")]
    WorkerInvocationFailed(String),

    #[error("worker timed out after {secs}s")]
    WorkerTimeout { secs: u64 },

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("session store unavailable")]
    StoreUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(nf) => ServiceError::NotFound(nf),
            other => ServiceError::Transition(other.to_string()),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Transition(_) => "invalid_transition",
            ServiceError::DescriptorEncode(_) => "descriptor_encode",
            ServiceError::DescriptorWriteFailed { .. } => "descriptor_write_failed",
            ServiceError::WorkerInvocationFailed(_) => "worker_failed",
            ServiceError::WorkerTimeout { .. } => "worker_timeout",
            ServiceError::Upload(_) => "upload_failed",
            ServiceError::InvalidRequest(_) => "invalid_request",
            ServiceError::StoreUnavailable => "store_unavailable",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Upload(_) | ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::WorkerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Cuerpo de error que ve el cliente: `{"error": tipo, "message": texto}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::EntityKind;

    #[test]
    fn not_found_maps_to_404_with_id() {
        let err = ServiceError::from(NotFound::new(EntityKind::Dataset, "d99"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains("d99"));
    }

    #[test]
    fn worker_errors_are_server_side() {
        assert_eq!(
            ServiceError::WorkerInvocationFailed("exit status: 1".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::WorkerTimeout { secs: 5 }.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn invalid_request_is_client_side() {
        let err = ServiceError::InvalidRequest("model name \"../x\"".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn bad_transition_is_tagged() {
        let err: ServiceError = SessionError::InvalidTransition {
            task_id: "t1".into(),
            from: common::TaskStatus::Complete,
            to: common::TaskStatus::Failed,
        }
        .into();
        assert_eq!(err.kind(), "invalid_transition");
        assert!(err.to_string().contains("t1"));
    }

    #[test]
    fn session_not_found_keeps_its_kind() {
        let err: ServiceError =
            SessionError::NotFound(NotFound::new(EntityKind::Task, "t3")).into();
        assert!(matches!(err, ServiceError::NotFound(ref nf) if nf.kind == EntityKind::Task));
    }
}
