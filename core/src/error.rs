// core/src/error.rs
use anyhow::Error as AnyhowError;
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::{ActorRole, OrderStatus};

/// Failures of the workflow engine itself, as opposed to business rule
/// violations raised by step handlers.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Type mismatch during context downcast (expected {expected_type}, step: '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Error in step handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

/// Broad category of a `MarketError`, used by the HTTP layer to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  BadRequest,
  Forbidden,
  Conflict,
  Upstream,
  Internal,
}

#[derive(Debug, Error)]
pub enum MarketError {
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: String },

  #[error("{actor} cannot move order from {current} to {target}")]
  InvalidOrderTransition {
    actor: ActorRole,
    current: OrderStatus,
    target: OrderStatus,
    allowed: Vec<OrderStatus>,
  },

  #[error("{message}")]
  InvalidReceivedTransition { current: OrderStatus, message: String },

  #[error("order in status {current} can no longer be cancelled")]
  OrderNotCancellable { current: OrderStatus },

  #[error("delivery of this order is handled by the assigned agency")]
  DeliveryManagedByAgency { target: OrderStatus },

  #[error("delivery job is not open")]
  JobNotOpen,

  #[error("delivery job has already been assigned to an agency")]
  JobAlreadyAssigned,

  #[error("delivery job cannot move from {current} to {target}")]
  InvalidJobTransition { current: String, target: String },

  #[error("payout in status {current} cannot be retried")]
  PayoutNotRetryable { current: String },

  #[error("a payout is already being processed for this vendor")]
  PayoutInFlight { payout_id: uuid::Uuid },

  #[error("insufficient balance: {available} available, {requested} requested")]
  InsufficientBalance { available: i64, requested: i64 },

  #[error("withdrawals are locked for this vendor")]
  WithdrawalsLocked { reason: Option<String> },

  #[error("withdrawals are already locked for this vendor")]
  WalletAlreadyLocked,

  #[error("withdrawals are not locked for this vendor")]
  WalletNotLocked,

  #[error("invalid phone number: {0}")]
  InvalidPhone(String),

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("vendor KYC is not approved")]
  KycNotApproved,

  #[error("delivery agency is not active")]
  AgencyInactive,

  #[error("payout provider rejected the transfer: {message}")]
  ProviderRejected { message: String, raw: Option<Value> },

  #[error("payout provider unavailable: {0}")]
  ProviderUnavailable(String),

  #[error("storage error: {0}")]
  Storage(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error(transparent)]
  Flow(#[from] FlowError),
}

impl MarketError {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    MarketError::NotFound { entity, id: id.to_string() }
  }

  pub fn kind(&self) -> ErrorKind {
    use MarketError::*;
    match self {
      NotFound { .. } => ErrorKind::NotFound,
      InvalidOrderTransition { .. }
      | InvalidReceivedTransition { .. }
      | OrderNotCancellable { .. }
      | DeliveryManagedByAgency { .. }
      | JobNotOpen
      | InvalidJobTransition { .. }
      | PayoutNotRetryable { .. }
      | InsufficientBalance { .. }
      | WithdrawalsLocked { .. }
      | WalletAlreadyLocked
      | WalletNotLocked
      | InvalidPhone(_)
      | Validation(_) => ErrorKind::BadRequest,
      Forbidden(_) | KycNotApproved | AgencyInactive => ErrorKind::Forbidden,
      JobAlreadyAssigned | PayoutInFlight { .. } => ErrorKind::Conflict,
      ProviderRejected { .. } | ProviderUnavailable(_) => ErrorKind::Upstream,
      Storage(_) | Internal(_) | Flow(_) => ErrorKind::Internal,
    }
  }

  /// Stable machine-readable code.
  pub fn code(&self) -> &'static str {
    use MarketError::*;
    match self {
      NotFound { .. } => "NOT_FOUND",
      InvalidOrderTransition { .. } => "INVALID_ORDER_TRANSITION",
      InvalidReceivedTransition { .. } => "INVALID_RECEIVED_TRANSITION",
      OrderNotCancellable { .. } => "ORDER_NOT_CANCELLABLE",
      DeliveryManagedByAgency { .. } => "DELIVERY_MANAGED_BY_AGENCY",
      JobNotOpen => "JOB_NOT_OPEN",
      JobAlreadyAssigned => "JOB_ALREADY_ASSIGNED",
      InvalidJobTransition { .. } => "INVALID_JOB_TRANSITION",
      PayoutNotRetryable { .. } => "PAYOUT_NOT_RETRYABLE",
      PayoutInFlight { .. } => "PAYOUT_IN_FLIGHT",
      InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
      WithdrawalsLocked { .. } => "WITHDRAWALS_LOCKED",
      WalletAlreadyLocked => "WALLET_ALREADY_LOCKED",
      WalletNotLocked => "WALLET_NOT_LOCKED",
      InvalidPhone(_) => "INVALID_PHONE",
      Validation(_) => "VALIDATION_ERROR",
      Forbidden(_) => "FORBIDDEN",
      KycNotApproved => "KYC_NOT_APPROVED",
      AgencyInactive => "AGENCY_INACTIVE",
      ProviderRejected { .. } => "PAYOUT_PROVIDER_REJECTED",
      ProviderUnavailable(_) => "PAYOUT_PROVIDER_UNAVAILABLE",
      Storage(_) => "STORAGE_ERROR",
      Internal(_) | Flow(_) => "INTERNAL_ERROR",
    }
  }

  /// Context fields for the error body. Empty object when there is nothing to add.
  pub fn details(&self) -> Value {
    use MarketError::*;
    match self {
      NotFound { entity, id } => json!({ "entity": entity, "id": id }),
      InvalidOrderTransition {
        actor,
        current,
        target,
        allowed,
      } => json!({
        "currentStatus": current,
        "targetStatus": target,
        "actor": actor,
        "allowed": allowed,
      }),
      InvalidReceivedTransition { current, .. } => json!({
        "currentStatus": current,
        "targetStatus": OrderStatus::Completed,
      }),
      OrderNotCancellable { current } => json!({ "currentStatus": current }),
      DeliveryManagedByAgency { target } => json!({ "targetStatus": target }),
      InvalidJobTransition { current, target } => json!({ "currentStatus": current, "targetStatus": target }),
      PayoutNotRetryable { current } => json!({ "currentStatus": current }),
      PayoutInFlight { payout_id } => json!({ "payoutId": payout_id }),
      InsufficientBalance { available, requested } => json!({ "available": available, "requested": requested }),
      WithdrawalsLocked { reason } => json!({ "lockReason": reason }),
      ProviderRejected { raw, .. } => json!({ "providerResponse": raw }),
      _ => json!({}),
    }
  }
}

pub type MarketResult<T> = std::result::Result<T, MarketError>;
