// core/src/store/mod.rs

//! Transactional storage seam for the settlement flows.
//!
//! A `StoreTx` is one database transaction. Rows returned by the `load_*`
//! methods are locked for the rest of the transaction (`SELECT ... FOR UPDATE`
//! on PostgreSQL). Nothing is visible to other transactions until `commit`;
//! dropping an uncommitted `StoreTx` rolls it back.

pub mod memory;

use crate::error::MarketResult;
use crate::model::{
  AgencyAccount, DeliveryJob, DeliveryJobLog, Order, Payout, VendorAccount, VendorPayoutProfile, VendorWallet,
  WalletTransaction,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::{MemoryState, MemoryStore};

#[async_trait]
pub trait MarketStore: Send + Sync {
  async fn begin(&self) -> MarketResult<Box<dyn StoreTx>>;

  /// Liveness check for the health endpoint.
  async fn ping(&self) -> MarketResult<()> {
    Ok(())
  }
}

#[async_trait]
pub trait StoreTx: Send {
  // --- accounts ---
  async fn vendor_account(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorAccount>>;
  async fn agency_account(&mut self, agency_id: Uuid) -> MarketResult<Option<AgencyAccount>>;

  // --- orders ---
  /// Order with its items.
  async fn load_order(&mut self, order_id: Uuid) -> MarketResult<Option<Order>>;
  /// Persists status, timestamps and cancellation fields. Items are not rewritten.
  async fn save_order(&mut self, order: &Order) -> MarketResult<()>;
  async fn restock_product(&mut self, product_id: Uuid, quantity: i32) -> MarketResult<()>;

  // --- delivery jobs ---
  async fn load_job(&mut self, job_id: Uuid) -> MarketResult<Option<DeliveryJob>>;
  async fn job_for_order(&mut self, order_id: Uuid) -> MarketResult<Option<DeliveryJob>>;
  async fn open_jobs(&mut self) -> MarketResult<Vec<DeliveryJob>>;
  async fn insert_job(&mut self, job: &DeliveryJob) -> MarketResult<()>;
  async fn save_job(&mut self, job: &DeliveryJob) -> MarketResult<()>;
  /// Assigns an OPEN, unassigned job to `agency_id`. Returns `false` when
  /// another agency got there first.
  async fn claim_job(&mut self, job_id: Uuid, agency_id: Uuid, at: DateTime<Utc>) -> MarketResult<bool>;
  async fn append_job_log(&mut self, entry: &DeliveryJobLog) -> MarketResult<()>;

  // --- wallets ---
  async fn load_wallet(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorWallet>>;
  /// The vendor's wallet row, locked, created with zero balances when missing.
  /// Concurrent callers all get the stored row's `id`.
  async fn ensure_wallet(&mut self, vendor_id: Uuid, at: DateTime<Utc>) -> MarketResult<VendorWallet>;
  /// Inserts or updates by `vendor_id`.
  async fn save_wallet(&mut self, wallet: &VendorWallet) -> MarketResult<()>;
  async fn load_wallet_tx(&mut self, tx_id: Uuid) -> MarketResult<Option<WalletTransaction>>;
  async fn pending_earning_for_order(&mut self, order_id: Uuid) -> MarketResult<Option<WalletTransaction>>;
  async fn insert_wallet_tx(&mut self, entry: &WalletTransaction) -> MarketResult<()>;
  async fn save_wallet_tx(&mut self, entry: &WalletTransaction) -> MarketResult<()>;

  // --- payouts ---
  async fn load_payout(&mut self, payout_id: Uuid) -> MarketResult<Option<Payout>>;
  async fn payout_by_reference(&mut self, app_transaction_ref: &str) -> MarketResult<Option<Payout>>;
  /// A REQUESTED or PROCESSING payout for the vendor, if any.
  async fn in_flight_payout(&mut self, vendor_id: Uuid) -> MarketResult<Option<Payout>>;
  async fn insert_payout(&mut self, payout: &Payout) -> MarketResult<()>;
  async fn save_payout(&mut self, payout: &Payout) -> MarketResult<()>;
  async fn payout_profile(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorPayoutProfile>>;
  async fn save_payout_profile(&mut self, profile: &VendorPayoutProfile) -> MarketResult<()>;

  async fn commit(self: Box<Self>) -> MarketResult<()>;
}
