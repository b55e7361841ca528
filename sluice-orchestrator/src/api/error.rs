//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sluice_core::dto::error::ErrorBody;
use sluice_engine::{BuildError, SubmitError};

use crate::service::recipe_service::RecipeError;
use crate::service::run_service::RunError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    /// Recipe rejected by validation
    BadRequest { message: String, field: String },
    /// Recipe could not be bound
    Conflict { message: String, field: String },
    /// A referenced resource is registered but unavailable
    Unavailable { message: String, field: String },
    /// A stage of a sync run failed
    StageFailed { message: String, stage_index: usize },
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(msg).with_kind("not_found"),
            ),
            ApiError::BadRequest { message, field } => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new(message)
                    .with_kind("validation")
                    .with_field(field),
            ),
            ApiError::Conflict { message, field } => (
                StatusCode::CONFLICT,
                ErrorBody::new(message).with_kind("build").with_field(field),
            ),
            ApiError::Unavailable { message, field } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody::new(message).with_kind("build").with_field(field),
            ),
            ApiError::StageFailed {
                message,
                stage_index,
            } => (
                StatusCode::BAD_GATEWAY,
                ErrorBody::new(message)
                    .with_kind("stage")
                    .with_stage(stage_index),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(msg).with_kind("internal"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        let message = err.to_string();
        match err {
            SubmitError::Validation(e) => ApiError::BadRequest {
                message,
                field: e.field,
            },
            SubmitError::Build(e @ BuildError::Unavailable { .. }) => ApiError::Unavailable {
                message,
                field: e.field().to_string(),
            },
            SubmitError::Build(e) => ApiError::Conflict {
                message,
                field: e.field().to_string(),
            },
            SubmitError::Stage { error, .. } => ApiError::StageFailed {
                message,
                stage_index: error.stage_index,
            },
            SubmitError::Canceled(_) | SubmitError::Aborted(_) | SubmitError::Tracker(_) => {
                ApiError::InternalError(message)
            }
        }
    }
}

impl From<RecipeError> for ApiError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::Submit(e) => e.into(),
            RecipeError::MissingResult(id) => {
                ApiError::InternalError(format!("Run {} finished without a result", id))
            }
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::NotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            RunError::InvalidState(msg) => ApiError::InternalError(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::domain::run::{StageError, StageErrorKind, StageKind};
    use sluice_engine::{ValidationError, ValidationErrorKind};
    use uuid::Uuid;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = SubmitError::Validation(ValidationError::new(
            "destination",
            ValidationErrorKind::NotFound,
            "destination-connectors/x is not registered",
        ))
        .into();

        assert!(matches!(&err, ApiError::BadRequest { field, .. } if field == "destination"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_build_errors() {
        let unavailable: ApiError = SubmitError::Build(BuildError::Unavailable {
            field: "source".to_string(),
            name: "source-connectors/source-http".to_string(),
        })
        .into();
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let ambiguous: ApiError = SubmitError::Build(BuildError::AmbiguousTag {
            field: "model_instances[0]".to_string(),
            model_id: "dummy-det".to_string(),
            tag: "latest".to_string(),
            candidates: vec!["v1".to_string(), "v2".to_string()],
        })
        .into();
        assert_eq!(ambiguous.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_stage_error_maps_to_bad_gateway() {
        let err: ApiError = SubmitError::Stage {
            run_id: Uuid::new_v4(),
            error: StageError {
                stage_index: 1,
                stage: "models/dummy-det/instances/v1".to_string(),
                stage_kind: StageKind::Model,
                kind: StageErrorKind::Timeout,
                cause: "infer did not complete within 60s".to_string(),
            },
        }
        .into();

        assert!(matches!(err, ApiError::StageFailed { stage_index: 1, .. }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_run_not_found() {
        let err: ApiError = RunError::NotFound(Uuid::new_v4()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
