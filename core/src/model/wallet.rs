// core/src/model/wallet.rs

use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One per vendor. Only mutated inside a store transaction that also writes
/// the matching `WalletTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorWallet {
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

impl VendorWallet {
  pub fn open(vendor_id: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      vendor_id,
      available_balance: 0,
      pending_balance: 0,
      withdrawals_locked: false,
      lock_reason: None,
      locked_at: None,
      locked_by_id: None,
      updated_at: at,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTxType {
  OrderEarning,
  PayoutDebit,
  PayoutReversal,
}

text_enum!(WalletTxType {
  OrderEarning => "ORDER_EARNING",
  PayoutDebit => "PAYOUT_DEBIT",
  PayoutReversal => "PAYOUT_REVERSAL",
});

impl WalletTxType {
  pub fn is_credit(&self) -> bool {
    !matches!(self, WalletTxType::PayoutDebit)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTxStatus {
  Pending,
  Posted,
  Cancelled,
}

text_enum!(WalletTxStatus {
  Pending => "PENDING",
  Posted => "POSTED",
  Cancelled => "CANCELLED",
});

/// Ledger entry. Amount is always positive; direction comes from `tx_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
  pub id: Uuid,
  pub wallet_id: Uuid,
  pub vendor_id: Uuid,
  pub tx_type: WalletTxType,
  pub status: WalletTxStatus,
  pub amount: i64,
  pub payout_id: Option<Uuid>,
  pub order_id: Option<Uuid>,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl WalletTransaction {
  pub fn new(
    wallet: &VendorWallet,
    tx_type: WalletTxType,
    status: WalletTxStatus,
    amount: i64,
    note: impl Into<String>,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      wallet_id: wallet.id,
      vendor_id: wallet.vendor_id,
      tx_type,
      status,
      amount,
      payout_id: None,
      order_id: None,
      note: Some(note.into()),
      created_at: at,
      updated_at: at,
    }
  }

  pub fn for_payout(mut self, payout_id: Uuid) -> Self {
    self.payout_id = Some(payout_id);
    self
  }

  pub fn for_order(mut self, order_id: Uuid) -> Self {
    self.order_id = Some(order_id);
    self
  }
}
