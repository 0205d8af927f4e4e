// server/src/models/wallet.rs

use super::parse_column;
use chrono::{DateTime, Utc};
use jemo_core::model::{VendorWallet, WalletTransaction};
use jemo_core::MarketError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct WalletRow {
  pub id: Uuid,
  pub vendor_id: Uuid,
  pub available_balance: i64,
  pub pending_balance: i64,
  pub withdrawals_locked: bool,
  pub lock_reason: Option<String>,
  pub locked_at: Option<DateTime<Utc>>,
  pub locked_by_id: Option<Uuid>,
  pub updated_at: DateTime<Utc>,
}

impl From<WalletRow> for VendorWallet {
  fn from(row: WalletRow) -> Self {
    VendorWallet {
      id: row.id,
      vendor_id: row.vendor_id,
      available_balance: row.available_balance,
      pending_balance: row.pending_balance,
      withdrawals_locked: row.withdrawals_locked,
      lock_reason: row.lock_reason,
      locked_at: row.locked_at,
      locked_by_id: row.locked_by_id,
      updated_at: row.updated_at,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct WalletTxRow {
  pub id: Uuid,
  pub wallet_id: Uuid,
  pub vendor_id: Uuid,
  pub tx_type: String,
  pub status: String,
  pub amount: i64,
  pub payout_id: Option<Uuid>,
  pub order_id: Option<Uuid>,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<WalletTxRow> for WalletTransaction {
  type Error = MarketError;

  fn try_from(row: WalletTxRow) -> Result<Self, Self::Error> {
    Ok(WalletTransaction {
      id: row.id,
      wallet_id: row.wallet_id,
      vendor_id: row.vendor_id,
      tx_type: parse_column("wallet_transactions.tx_type", &row.tx_type)?,
      status: parse_column("wallet_transactions.status", &row.status)?,
      amount: row.amount,
      payout_id: row.payout_id,
      order_id: row.order_id,
      note: row.note,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}
