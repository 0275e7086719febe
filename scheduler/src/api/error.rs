use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::SchedulerError;

pub type ApiResult<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub enum Error {
    BadRequest(String),
    NotFound(String),
    InternalServerError,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            Error::NotFound(reason) => (StatusCode::NOT_FOUND, reason),
            Error::InternalServerError => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<SchedulerError> for Error {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidOperation(_)
            | SchedulerError::InvalidCondition(_)
            | SchedulerError::InvalidCleaningStrategy(_)
            | SchedulerError::DependencyNotFound(_) => Error::BadRequest(err.to_string()),
            SchedulerError::TaskNotFound(_) => Error::NotFound(err.to_string()),
            SchedulerError::UnexpectedTaskStatus { .. } => Error::BadRequest(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "unhandled error in request handler");
        Error::InternalServerError
    }
}
