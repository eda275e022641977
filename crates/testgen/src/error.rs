use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use testgen_core::github::{ContributionFailure, SlugError};
use testgen_core::summary::{ExtractError, SchemaError};

use crate::llm::DispatchError;

/// Failures surfaced to HTTP clients and CLI users.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    TransportFailure(String),

    #[error("{0}")]
    EmptyOutput(String),

    #[error("Model returned malformed output: {0}")]
    SchemaViolation(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{detail}")]
    Remote { status: u16, detail: String },

    #[error("{0}")]
    RemoteStepFailure(Box<ContributionFailure>),

    #[error("A branch with this name already exists: {0}")]
    Conflict(Box<ContributionFailure>),

    #[error("{0}")]
    Unexpected(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::TransportFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::EmptyOutput(_) | Error::SchemaViolation(_) => StatusCode::BAD_GATEWAY,
            Error::MissingCredential(_) | Error::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Remote { status, .. } => remote_status(Some(*status)),
            Error::RemoteStepFailure(failure) => remote_status(failure.cause.status()),
            Error::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Contribution failure behind this error, if any.
    pub fn contribution(&self) -> Option<&ContributionFailure> {
        match self {
            Error::RemoteStepFailure(failure) | Error::Conflict(failure) => Some(&**failure),
            _ => None,
        }
    }
}

/// Pass a remote status through, falling back to 502 when there is none.
fn remote_status(status: Option<u16>) -> StatusCode {
    status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::BackendUnreachable { .. } => Error::TransportFailure(err.to_string()),
            DispatchError::EmptyResponse { .. } => Error::EmptyOutput(err.to_string()),
            DispatchError::MissingCredential { .. } => Error::MissingCredential(err.to_string()),
            DispatchError::UnexpectedBackendError { .. } => Error::Unexpected(err.to_string()),
        }
    }
}

impl From<ExtractError> for Error {
    fn from(err: ExtractError) -> Self {
        Error::SchemaViolation(err.to_string())
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::SchemaViolation(err.to_string())
    }
}

impl From<SlugError> for Error {
    fn from(err: SlugError) -> Self {
        Error::BadRequest(err.to_string())
    }
}

impl From<ContributionFailure> for Error {
    fn from(failure: ContributionFailure) -> Self {
        if failure.is_conflict() {
            Error::Conflict(Box::new(failure))
        } else {
            Error::RemoteStepFailure(Box::new(failure))
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        log::warn!("Request failed [{}]: {}", status, self);

        let mut body = json!({ "detail": self.to_string() });

        if let Some(failure) = self.contribution() {
            body["step"] = json!(failure.step);
            body["branch_created"] = json!(failure.progress.branch.is_some());
            body["branch"] = json!(failure.progress.branch);
            body["committed"] = json!(failure.progress.committed);
            if !failure.progress.skipped.is_empty() {
                body["skipped"] = json!(failure.progress.skipped);
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testgen_core::github::{Progress, Step, StepCause};

    fn failure(step: Step, status: u16) -> ContributionFailure {
        ContributionFailure {
            step,
            cause: StepCause::Status {
                status,
                detail: "boom".to_string(),
            },
            progress: Progress {
                branch: Some("feature/add-tests-abcdef".to_string()),
                committed: vec!["a.ts".to_string()],
                skipped: vec![],
            },
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_dispatch_errors_map_to_taxonomy() {
        let unreachable: Error = DispatchError::BackendUnreachable {
            backend: "ollama",
            model: "phi3:mini".to_string(),
            detail: "connection refused".to_string(),
        }
        .into();
        assert_eq!(unreachable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(unreachable.to_string().contains("phi3:mini"));

        let empty: Error = DispatchError::EmptyResponse {
            backend: "ollama",
            model: "m".to_string(),
        }
        .into();
        assert!(matches!(empty, Error::EmptyOutput(_)));

        let missing: Error = DispatchError::MissingCredential {
            backend: "openai",
            variable: "LLM_API_KEY",
        }
        .into();
        assert!(matches!(missing, Error::MissingCredential(_)));
    }

    #[test]
    fn test_conflict_is_distinguished() {
        let err: Error = failure(Step::CreateBranch, 409).into();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: Error = failure(Step::FetchBaseRef, 404).into();
        assert!(matches!(err, Error::RemoteStepFailure(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_transport_step_failure_is_bad_gateway() {
        let err: Error = ContributionFailure {
            step: Step::FetchRepoInfo,
            cause: StepCause::Transport {
                detail: "timed out".to_string(),
            },
            progress: Progress::default(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_contribution_failure_response_exposes_progress() {
        let err: Error = failure(Step::CommitFiles, 422).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["step"], "commit_files");
        assert_eq!(body["branch_created"], true);
        assert_eq!(body["branch"], "feature/add-tests-abcdef");
        assert_eq!(body["committed"], serde_json::json!(["a.ts"]));
        assert!(body["detail"].as_str().unwrap().contains("commit_files"));
    }

    #[tokio::test]
    async fn test_plain_error_response_has_detail_only() {
        let response = Error::BadRequest("GitHub OAuth failed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"detail": "GitHub OAuth failed"})
        );
    }
}
