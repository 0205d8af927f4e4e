// server/src/models/payout.rs

use super::parse_column;
use chrono::{DateTime, Utc};
use jemo_core::model::{Payout, VendorPayoutProfile};
use jemo_core::MarketError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct PayoutRow {
  pub id: Uuid,
  pub vendor_id: Uuid,
  pub wallet_id: Uuid,
  pub amount: i64,
  pub method: String,
  pub destination_phone: String,
  pub beneficiary_name: String,
  pub app_transaction_ref: String,
  pub provider_ref: Option<String>,
  pub provider_raw: Option<serde_json::Value>,
  pub failure_reason: Option<String>,
  pub status: String,
  pub requested_at: DateTime<Utc>,
  pub processed_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub failed_at: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<PayoutRow> for Payout {
  type Error = MarketError;

  fn try_from(row: PayoutRow) -> Result<Self, Self::Error> {
    Ok(Payout {
      id: row.id,
      vendor_id: row.vendor_id,
      wallet_id: row.wallet_id,
      amount: row.amount,
      method: parse_column("payouts.method", &row.method)?,
      destination_phone: row.destination_phone,
      beneficiary_name: row.beneficiary_name,
      app_transaction_ref: row.app_transaction_ref,
      provider_ref: row.provider_ref,
      provider_raw: row.provider_raw,
      failure_reason: row.failure_reason,
      status: parse_column("payouts.status", &row.status)?,
      requested_at: row.requested_at,
      processed_at: row.processed_at,
      completed_at: row.completed_at,
      failed_at: row.failed_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct PayoutProfileRow {
  pub vendor_id: Uuid,
  pub method: String,
  pub phone: String,
  pub legal_name: String,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<PayoutProfileRow> for VendorPayoutProfile {
  type Error = MarketError;

  fn try_from(row: PayoutProfileRow) -> Result<Self, Self::Error> {
    Ok(VendorPayoutProfile {
      vendor_id: row.vendor_id,
      method: parse_column("vendor_payout_profiles.method", &row.method)?,
      phone: row.phone,
      legal_name: row.legal_name,
      updated_at: row.updated_at,
    })
  }
}
