use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::image_processing::RenderError;
use crate::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum AppError {
  #[error("bad request {0}")]
  BadRequest(String),
  #[error("unauthorized {0}")]
  Unauthorized(String),
  #[error("not found")]
  NotFound,
  #[error("conflict {0}")]
  Conflict(String),
  #[error("unsupported media type")]
  UnsupportedMediaType,
  #[error("internal server error {0}")]
  InternalServerError(String),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, msg) = match self {
      AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
      AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
      AppError::NotFound => (StatusCode::NOT_FOUND, "not found".to_owned()),
      AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
      AppError::UnsupportedMediaType => (
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "unsupported media type".to_owned(),
      ),
      AppError::InternalServerError(msg) => {
        error!("internal server error: {}", msg);
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal server error".to_owned(),
        )
      }
    };

    (status, Json(json!({ "error": msg }))).into_response()
  }
}

impl From<anyhow::Error> for AppError {
  fn from(e: anyhow::Error) -> Self {
    AppError::InternalServerError(format!("{:#}", e))
  }
}

impl From<PipelineError> for AppError {
  fn from(e: PipelineError) -> Self {
    AppError::BadRequest(e.to_string())
  }
}

impl From<RenderError> for AppError {
  fn from(e: RenderError) -> Self {
    match e {
      RenderError::Encode(_) => AppError::InternalServerError(e.to_string()),
      _ => AppError::BadRequest(e.to_string()),
    }
  }
}

impl From<AuthError> for AppError {
  fn from(e: AuthError) -> Self {
    match e {
      AuthError::InvalidToken(_) => AppError::Unauthorized(e.to_string()),
      _ => AppError::InternalServerError(e.to_string()),
    }
  }
}
