// vitrine/src/errors.rs

use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use etapa::EtapaError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Shipping Provider Error: {0}")]
  Shipping(String),

  #[error("Postal Code Lookup Error: {0}")]
  PostalCode(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: EtapaError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Collaborator outages the caller may retry.
  pub fn is_retryable(&self) -> bool {
    matches!(self, AppError::Gateway(_) | AppError::Shipping(_) | AppError::PostalCode(_))
  }

  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::Gateway(m)
      | AppError::Shipping(m)
      | AppError::PostalCode(m) => m.clone(),
      AppError::Store(StoreError::NotFound(m)) => m.clone(),
      AppError::Store(e @ StoreError::InvalidTransition { .. }) => e.to_string(),
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "An internal error occurred.".to_string()
      }
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) | AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) | AppError::Store(StoreError::InvalidTransition { .. }) => StatusCode::CONFLICT,
      AppError::Gateway(_) | AppError::Shipping(_) | AppError::PostalCode(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "success": false,
      "error": self.public_message(),
      "retryable": self.is_retryable(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
