// core/src/store/memory.rs

//! In-process `MarketStore`.
//!
//! A transaction takes the store-wide async mutex and works on a private copy
//! of the state; commit swaps the copy in, drop throws it away. Transactions
//! are therefore fully serialised.

use super::{MarketStore, StoreTx};
use crate::error::{MarketError, MarketResult};
use crate::model::{
  AgencyAccount, DeliveryJob, DeliveryJobLog, DeliveryJobStatus, Order, Payout, Product, VendorAccount,
  VendorPayoutProfile, VendorWallet, WalletTransaction, WalletTxStatus, WalletTxType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
  pub vendors: HashMap<Uuid, VendorAccount>,
  pub agencies: HashMap<Uuid, AgencyAccount>,
  pub products: HashMap<Uuid, Product>,
  pub orders: HashMap<Uuid, Order>,
  pub jobs: HashMap<Uuid, DeliveryJob>,
  pub job_logs: Vec<DeliveryJobLog>,
  /// Keyed by vendor id.
  pub wallets: HashMap<Uuid, VendorWallet>,
  pub wallet_txs: HashMap<Uuid, WalletTransaction>,
  pub payouts: HashMap<Uuid, Payout>,
  pub payout_profiles: HashMap<Uuid, VendorPayoutProfile>,
}

impl MemoryState {
  pub fn logs_for_job(&self, job_id: Uuid) -> Vec<&DeliveryJobLog> {
    let mut logs: Vec<_> = self.job_logs.iter().filter(|l| l.job_id == job_id).collect();
    logs.sort_by_key(|l| l.created_at);
    logs
  }

  pub fn txs_for_payout(&self, payout_id: Uuid) -> Vec<&WalletTransaction> {
    let mut txs: Vec<_> = self.wallet_txs.values().filter(|t| t.payout_id == Some(payout_id)).collect();
    txs.sort_by_key(|t| t.created_at);
    txs
  }

  pub fn txs_for_vendor(&self, vendor_id: Uuid) -> Vec<&WalletTransaction> {
    let mut txs: Vec<_> = self.wallet_txs.values().filter(|t| t.vendor_id == vendor_id).collect();
    txs.sort_by_key(|t| t.created_at);
    txs
  }
}

#[derive(Clone)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
  // Commits left before one is made to fail; negative disables.
  commit_fault: Arc<AtomicI64>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new(MemoryState::default())
  }
}

impl MemoryStore {
  pub fn new(state: MemoryState) -> Self {
    Self {
      state: Arc::new(Mutex::new(state)),
      commit_fault: Arc::new(AtomicI64::new(-1)),
    }
  }

  /// Mutates the committed state directly, outside any transaction.
  pub async fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
    let mut guard = self.state.lock().await;
    f(&mut guard)
  }

  pub async fn snapshot(&self) -> MemoryState {
    self.state.lock().await.clone()
  }

  /// Lets the next `successful_commits` commits through and fails the one
  /// after with a storage error.
  pub fn fail_commit_after(&self, successful_commits: i64) {
    self.commit_fault.store(successful_commits, Ordering::SeqCst);
  }
}

#[async_trait]
impl MarketStore for MemoryStore {
  async fn begin(&self) -> MarketResult<Box<dyn StoreTx>> {
    let guard = Arc::clone(&self.state).lock_owned().await;
    let working = guard.clone();
    Ok(Box::new(MemoryTx {
      guard,
      working,
      commit_fault: Arc::clone(&self.commit_fault),
    }))
  }
}

struct MemoryTx {
  guard: OwnedMutexGuard<MemoryState>,
  working: MemoryState,
  commit_fault: Arc<AtomicI64>,
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn vendor_account(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorAccount>> {
    Ok(self.working.vendors.get(&vendor_id).cloned())
  }

  async fn agency_account(&mut self, agency_id: Uuid) -> MarketResult<Option<AgencyAccount>> {
    Ok(self.working.agencies.get(&agency_id).cloned())
  }

  async fn load_order(&mut self, order_id: Uuid) -> MarketResult<Option<Order>> {
    Ok(self.working.orders.get(&order_id).cloned())
  }

  async fn save_order(&mut self, order: &Order) -> MarketResult<()> {
    let stored = self
      .working
      .orders
      .get_mut(&order.id)
      .ok_or_else(|| MarketError::not_found("order", order.id))?;
    let items = std::mem::take(&mut stored.items);
    *stored = Order { items, ..order.clone() };
    Ok(())
  }

  async fn restock_product(&mut self, product_id: Uuid, quantity: i32) -> MarketResult<()> {
    let product = self
      .working
      .products
      .get_mut(&product_id)
      .ok_or_else(|| MarketError::not_found("product", product_id))?;
    product.stock += quantity;
    Ok(())
  }

  async fn load_job(&mut self, job_id: Uuid) -> MarketResult<Option<DeliveryJob>> {
    Ok(self.working.jobs.get(&job_id).cloned())
  }

  async fn job_for_order(&mut self, order_id: Uuid) -> MarketResult<Option<DeliveryJob>> {
    Ok(self.working.jobs.values().find(|j| j.order_id == order_id).cloned())
  }

  async fn open_jobs(&mut self) -> MarketResult<Vec<DeliveryJob>> {
    let mut jobs: Vec<_> = self
      .working
      .jobs
      .values()
      .filter(|j| j.status == DeliveryJobStatus::Open && j.agency_id.is_none())
      .cloned()
      .collect();
    jobs.sort_by_key(|j| j.created_at);
    Ok(jobs)
  }

  async fn insert_job(&mut self, job: &DeliveryJob) -> MarketResult<()> {
    if self.working.jobs.values().any(|j| j.order_id == job.order_id) {
      return Err(MarketError::Storage(format!("order {} already has a delivery job", job.order_id)));
    }
    self.working.jobs.insert(job.id, job.clone());
    Ok(())
  }

  async fn save_job(&mut self, job: &DeliveryJob) -> MarketResult<()> {
    match self.working.jobs.get_mut(&job.id) {
      Some(stored) => {
        *stored = job.clone();
        Ok(())
      }
      None => Err(MarketError::not_found("delivery job", job.id)),
    }
  }

  async fn claim_job(&mut self, job_id: Uuid, agency_id: Uuid, at: DateTime<Utc>) -> MarketResult<bool> {
    match self.working.jobs.get_mut(&job_id) {
      Some(job) if job.status == DeliveryJobStatus::Open && job.agency_id.is_none() => {
        job.status = DeliveryJobStatus::Accepted;
        job.agency_id = Some(agency_id);
        job.accepted_at = Some(at);
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn append_job_log(&mut self, entry: &DeliveryJobLog) -> MarketResult<()> {
    self.working.job_logs.push(entry.clone());
    Ok(())
  }

  async fn load_wallet(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorWallet>> {
    Ok(self.working.wallets.get(&vendor_id).cloned())
  }

  async fn ensure_wallet(&mut self, vendor_id: Uuid, at: DateTime<Utc>) -> MarketResult<VendorWallet> {
    let wallet = self
      .working
      .wallets
      .entry(vendor_id)
      .or_insert_with(|| VendorWallet::open(vendor_id, at));
    Ok(wallet.clone())
  }

  async fn save_wallet(&mut self, wallet: &VendorWallet) -> MarketResult<()> {
    self.working.wallets.insert(wallet.vendor_id, wallet.clone());
    Ok(())
  }

  async fn load_wallet_tx(&mut self, tx_id: Uuid) -> MarketResult<Option<WalletTransaction>> {
    Ok(self.working.wallet_txs.get(&tx_id).cloned())
  }

  async fn pending_earning_for_order(&mut self, order_id: Uuid) -> MarketResult<Option<WalletTransaction>> {
    Ok(
      self
        .working
        .wallet_txs
        .values()
        .find(|t| {
          t.order_id == Some(order_id) && t.tx_type == WalletTxType::OrderEarning && t.status == WalletTxStatus::Pending
        })
        .cloned(),
    )
  }

  async fn insert_wallet_tx(&mut self, entry: &WalletTransaction) -> MarketResult<()> {
    self.working.wallet_txs.insert(entry.id, entry.clone());
    Ok(())
  }

  async fn save_wallet_tx(&mut self, entry: &WalletTransaction) -> MarketResult<()> {
    match self.working.wallet_txs.get_mut(&entry.id) {
      Some(stored) => {
        *stored = entry.clone();
        Ok(())
      }
      None => Err(MarketError::not_found("wallet transaction", entry.id)),
    }
  }

  async fn load_payout(&mut self, payout_id: Uuid) -> MarketResult<Option<Payout>> {
    Ok(self.working.payouts.get(&payout_id).cloned())
  }

  async fn payout_by_reference(&mut self, app_transaction_ref: &str) -> MarketResult<Option<Payout>> {
    Ok(
      self
        .working
        .payouts
        .values()
        .find(|p| p.app_transaction_ref == app_transaction_ref)
        .cloned(),
    )
  }

  async fn in_flight_payout(&mut self, vendor_id: Uuid) -> MarketResult<Option<Payout>> {
    Ok(
      self
        .working
        .payouts
        .values()
        .find(|p| p.vendor_id == vendor_id && p.status.is_in_flight())
        .cloned(),
    )
  }

  async fn insert_payout(&mut self, payout: &Payout) -> MarketResult<()> {
    self.working.payouts.insert(payout.id, payout.clone());
    Ok(())
  }

  async fn save_payout(&mut self, payout: &Payout) -> MarketResult<()> {
    match self.working.payouts.get_mut(&payout.id) {
      Some(stored) => {
        *stored = payout.clone();
        Ok(())
      }
      None => Err(MarketError::not_found("payout", payout.id)),
    }
  }

  async fn payout_profile(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorPayoutProfile>> {
    Ok(self.working.payout_profiles.get(&vendor_id).cloned())
  }

  async fn save_payout_profile(&mut self, profile: &VendorPayoutProfile) -> MarketResult<()> {
    self.working.payout_profiles.insert(profile.vendor_id, profile.clone());
    Ok(())
  }

  async fn commit(self: Box<Self>) -> MarketResult<()> {
    let MemoryTx {
      mut guard,
      working,
      commit_fault,
    } = *self;
    if commit_fault.fetch_sub(1, Ordering::SeqCst) == 0 {
      return Err(MarketError::Storage("injected commit failure".to_string()));
    }
    *guard = working;
    Ok(())
  }
}
