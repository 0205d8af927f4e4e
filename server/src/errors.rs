// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use jemo_core::{ErrorKind, MarketError};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Market(#[from] MarketError),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Market(e) => e.code(),
      AppError::Validation(_) => "VALIDATION_ERROR",
      AppError::Auth(_) => "UNAUTHORIZED",
      AppError::Config(_) => "CONFIG_ERROR",
      AppError::Sqlx(_) => "STORAGE_ERROR",
      AppError::Internal(_) => "INTERNAL_ERROR",
    }
  }

  fn details(&self) -> Value {
    match self {
      AppError::Market(e) => e.details(),
      _ => json!({}),
    }
  }

  fn message(&self) -> String {
    match self {
      // Driver messages can leak schema details.
      AppError::Sqlx(_) => "Database operation failed".to_string(),
      AppError::Market(MarketError::Storage(_)) => "Database operation failed".to_string(),
      other => other.to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Market(e) => match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, code = self.code(), "Responding with error");
    } else {
      tracing::warn!(application_error = %self, code = self.code(), "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "error": self.code(),
      "message": self.message(),
      "details": self.details(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;
  use jemo_core::model::OrderStatus;

  #[actix_rt::test]
  async fn test_market_errors_map_to_status_and_body() {
    let err = AppError::from(MarketError::OrderNotCancellable {
      current: OrderStatus::InTransit,
    });
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let body = to_bytes(err.error_response().into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "ORDER_NOT_CANCELLABLE");
    assert_eq!(body["details"]["currentStatus"], "IN_TRANSIT");
  }

  #[test]
  fn test_kind_to_status() {
    let cases = [
      (MarketError::not_found("order", "x"), StatusCode::NOT_FOUND),
      (MarketError::KycNotApproved, StatusCode::FORBIDDEN),
      (MarketError::JobAlreadyAssigned, StatusCode::CONFLICT),
      (MarketError::ProviderUnavailable("down".into()), StatusCode::BAD_GATEWAY),
      (MarketError::Storage("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(AppError::from(err).status_code(), status);
    }
    assert_eq!(AppError::Auth("no".into()).status_code(), StatusCode::UNAUTHORIZED);
  }

  #[test]
  fn test_storage_message_is_redacted() {
    let err = AppError::from(MarketError::Storage("relation \"payouts\" does not exist".into()));
    assert_eq!(err.message(), "Database operation failed");
    assert_eq!(err.code(), "STORAGE_ERROR");
  }
}
