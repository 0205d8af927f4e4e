// core/src/provider/mod.rs

//! Seam to the external mobile-money disbursement provider.

pub mod mock;

use crate::error::{MarketError, MarketResult};
use crate::model::{Payout, PayoutMethod};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use mock::ScriptedPayoutProvider;

const FAILURE_WORDS: &[&str] = &["FAILED", "FAILURE", "ERROR", "REJECTED", "CANCELLED", "EXPIRED"];

/// What we ask the provider to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutInstruction {
  pub app_transaction_ref: String,
  pub amount: i64,
  pub currency: String,
  pub method: PayoutMethod,
  pub phone: String,
  pub beneficiary_name: String,
}

impl PayoutInstruction {
  pub fn for_payout(payout: &Payout, currency: &str) -> Self {
    Self {
      app_transaction_ref: payout.app_transaction_ref.clone(),
      amount: payout.amount,
      currency: currency.to_string(),
      method: payout.method,
      phone: payout.destination_phone.clone(),
      beneficiary_name: payout.beneficiary_name.clone(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderData {
  #[serde(default)]
  pub transaction_id: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
}

/// The `{status, code, message, data}` envelope the provider answers with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub code: Option<i64>,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub data: ProviderData,
}

impl ProviderResponse {
  fn is_failure_word(word: &str) -> bool {
    FAILURE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word.trim()))
  }

  /// The provider took the transfer on.
  pub fn is_accepted(&self) -> bool {
    if self.status.trim().eq_ignore_ascii_case("success") {
      return true;
    }
    matches!(self.code, Some(200) | Some(201)) && !Self::is_failure_word(&self.status)
  }

  pub fn transaction_id(&self) -> Option<&str> {
    self.data.transaction_id.as_deref()
  }

  /// Human-readable summary for failure reasons.
  pub fn describe(&self) -> String {
    match (&self.message, self.code) {
      (Some(message), Some(code)) => format!("{} (status {}, code {})", message, self.status, code),
      (Some(message), None) => format!("{} (status {})", message, self.status),
      (None, Some(code)) => format!("status {}, code {}", self.status, code),
      (None, None) => format!("status {}", self.status),
    }
  }

  /// State of a transfer as reported by a verify call. The transfer status
  /// inside `data` wins over the envelope status when present.
  pub fn transfer_state(&self) -> TransferState {
    let status = self.data.status.as_deref().unwrap_or(&self.status);
    TransferState::from_provider_status(status)
  }
}

/// Final or not-yet-final state of a transfer at the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
  Successful,
  Failed,
  Pending,
}

impl TransferState {
  pub fn from_provider_status(status: &str) -> Self {
    match status.trim().to_ascii_uppercase().as_str() {
      "SUCCESSFUL" | "SUCCESS" => TransferState::Successful,
      "FAILED" | "REJECTED" | "CANCELLED" | "EXPIRED" => TransferState::Failed,
      _ => TransferState::Pending,
    }
  }
}

/// Parsed envelope plus the body exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
  pub parsed: ProviderResponse,
  pub raw: Value,
}

impl ProviderReply {
  pub fn from_raw(raw: Value) -> MarketResult<Self> {
    let parsed: ProviderResponse = serde_json::from_value(raw.clone())
      .map_err(|e| MarketError::ProviderUnavailable(format!("unexpected provider response: {}", e)))?;
    Ok(Self { parsed, raw })
  }
}

#[async_trait]
pub trait PayoutProvider: Send + Sync {
  async fn initiate_payout(&self, instruction: &PayoutInstruction) -> MarketResult<ProviderReply>;

  async fn verify_payout(&self, app_transaction_ref: &str) -> MarketResult<ProviderReply>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn reply(raw: Value) -> ProviderReply {
    ProviderReply::from_raw(raw).unwrap()
  }

  #[test]
  fn acceptance_signal() {
    assert!(reply(json!({"status": "SUCCESS", "code": 202})).parsed.is_accepted());
    assert!(reply(json!({"status": "pending", "code": 201})).parsed.is_accepted());
    assert!(reply(json!({"status": "success"})).parsed.is_accepted());
    assert!(!reply(json!({"status": "FAILED", "code": 200})).parsed.is_accepted());
    assert!(!reply(json!({"status": "pending", "code": 400})).parsed.is_accepted());
    assert!(!reply(json!({})).parsed.is_accepted());
  }

  #[test]
  fn verify_mapping() {
    assert_eq!(TransferState::from_provider_status("successful"), TransferState::Successful);
    assert_eq!(TransferState::from_provider_status("EXPIRED"), TransferState::Failed);
    assert_eq!(TransferState::from_provider_status("Rejected"), TransferState::Failed);
    assert_eq!(TransferState::from_provider_status("PROCESSING"), TransferState::Pending);
    let r = reply(json!({"status": "success", "code": 200, "data": {"status": "FAILED"}}));
    assert_eq!(r.parsed.transfer_state(), TransferState::Failed);
  }

  #[test]
  fn raw_body_is_kept_verbatim() {
    let raw = json!({"status": "success", "code": 200, "data": {"transaction_id": "TX-1"}, "extra": [1, 2]});
    let r = reply(raw.clone());
    assert_eq!(r.raw, raw);
    assert_eq!(r.parsed.transaction_id(), Some("TX-1"));
  }

  #[test]
  fn malformed_envelope_is_unavailable() {
    let err = ProviderReply::from_raw(json!({"status": 5})).unwrap_err();
    assert_eq!(err.code(), "PAYOUT_PROVIDER_UNAVAILABLE");
  }
}
