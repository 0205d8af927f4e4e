// core/src/model/payout.rs

use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
  Requested,
  Processing,
  Success,
  Failed,
}

text_enum!(PayoutStatus {
  Requested => "REQUESTED",
  Processing => "PROCESSING",
  Success => "SUCCESS",
  Failed => "FAILED",
});

impl PayoutStatus {
  /// Requested or processing: money may still move.
  pub fn is_in_flight(&self) -> bool {
    matches!(self, PayoutStatus::Requested | PayoutStatus::Processing)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutMethod {
  MtnMomo,
  OrangeMoney,
}

text_enum!(PayoutMethod {
  MtnMomo => "MTN_MOMO",
  OrangeMoney => "ORANGE_MONEY",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
  pub id: Uuid,
  pub vendor_id: Uuid,
  pub wallet_id: Uuid,
  pub amount: i64,
  pub method: PayoutMethod,
  pub destination_phone: String,
  pub beneficiary_name: String,
  /// Our reference sent to the provider. A fresh one is issued per attempt.
  pub app_transaction_ref: String,
  pub provider_ref: Option<String>,
  /// Provider response body, stored as received.
  pub provider_raw: Option<serde_json::Value>,
  pub failure_reason: Option<String>,
  pub status: PayoutStatus,
  pub requested_at: DateTime<Utc>,
  pub processed_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub failed_at: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}

impl Payout {
  pub fn new_app_reference() -> String {
    format!("JEMO-PO-{}", Uuid::new_v4().simple())
  }

  /// Puts a failed payout back to REQUESTED for another attempt.
  pub fn reset_for_retry(&mut self, at: DateTime<Utc>) {
    self.status = PayoutStatus::Requested;
    self.app_transaction_ref = Self::new_app_reference();
    self.provider_ref = None;
    self.provider_raw = None;
    self.failure_reason = None;
    self.failed_at = None;
    self.requested_at = at;
    self.updated_at = at;
  }

  pub fn mark_failed(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
    self.status = PayoutStatus::Failed;
    self.failure_reason = Some(reason.into());
    self.failed_at = Some(at);
    self.updated_at = at;
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPayoutProfile {
  pub vendor_id: Uuid,
  pub method: PayoutMethod,
  /// Normalised `237XXXXXXXXX`.
  pub phone: String,
  pub legal_name: String,
  pub updated_at: DateTime<Utc>,
}
