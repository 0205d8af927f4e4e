// server/src/db/pg_store.rs

use super::storage_error;
use crate::models::{
  AgencyRow, DeliveryJobRow, OrderItemRow, OrderRow, PayoutProfileRow, PayoutRow, VendorAccountRow, WalletRow,
  WalletTxRow,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jemo_core::model::{
  AgencyAccount, DeliveryJob, DeliveryJobLog, Order, Payout, VendorAccount, VendorPayoutProfile, VendorWallet,
  WalletTransaction,
};
use jemo_core::{MarketError, MarketResult, MarketStore, StoreTx};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, customer_id, vendor_id, status, delivery_method, delivery_fee, \
  pickup_city, pickup_address, dropoff_city, dropoff_address, created_at, confirmed_at, in_transit_at, \
  delivered_at, cancelled_at, completed_at, cancel_reason, cancelled_by";

const JOB_COLUMNS: &str = "id, order_id, status, pickup_city, pickup_address, dropoff_city, dropoff_address, \
  fee, agency_id, created_at, accepted_at, picked_up_at, delivered_at, cancelled_at, cancel_reason";

const WALLET_COLUMNS: &str = "id, vendor_id, available_balance, pending_balance, withdrawals_locked, \
  lock_reason, locked_at, locked_by_id, updated_at";

const WALLET_TX_COLUMNS: &str =
  "id, wallet_id, vendor_id, tx_type, status, amount, payout_id, order_id, note, created_at, updated_at";

const PAYOUT_COLUMNS: &str = "id, vendor_id, wallet_id, amount, method, destination_phone, beneficiary_name, \
  app_transaction_ref, provider_ref, provider_raw, failure_reason, status, requested_at, processed_at, \
  completed_at, failed_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl MarketStore for PgStore {
  async fn begin(&self) -> MarketResult<Box<dyn StoreTx>> {
    let tx = self
      .pool
      .begin()
      .await
      .map_err(|e| storage_error("opening transaction", e))?;
    Ok(Box::new(PgTx { tx }))
  }

  async fn ping(&self) -> MarketResult<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
      .fetch_one(&self.pool)
      .await
      .map(|_| ())
      .map_err(|e| storage_error("pinging database", e))
  }
}

/// Rolled back by sqlx when dropped without `commit`.
pub struct PgTx {
  tx: Transaction<'static, Postgres>,
}

/// Fails with NotFound when an UPDATE matched no row.
fn expect_one(rows_affected: u64, entity: &'static str, id: Uuid) -> MarketResult<()> {
  if rows_affected == 0 {
    return Err(MarketError::not_found(entity, id));
  }
  Ok(())
}

#[async_trait]
impl StoreTx for PgTx {
  async fn vendor_account(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorAccount>> {
    let row = sqlx::query_as::<_, VendorAccountRow>("SELECT id, kyc_status FROM vendors WHERE id = $1")
      .bind(vendor_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading vendor", e))?;
    row.map(VendorAccount::try_from).transpose()
  }

  async fn agency_account(&mut self, agency_id: Uuid) -> MarketResult<Option<AgencyAccount>> {
    let row = sqlx::query_as::<_, AgencyRow>(
      "SELECT id, name, is_active, cities_covered FROM delivery_agencies WHERE id = $1",
    )
    .bind(agency_id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| storage_error("loading agency", e))?;
    Ok(row.map(AgencyAccount::from))
  }

  #[instrument(name = "pg::load_order", skip(self))]
  async fn load_order(&mut self, order_id: Uuid) -> MarketResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(order_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading order", e))?;
    let Some(row) = row else {
      return Ok(None);
    };
    let items = sqlx::query_as::<_, OrderItemRow>(
      "SELECT id, order_id, product_id, quantity, unit_price FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&mut *self.tx)
    .await
    .map_err(|e| storage_error("loading order items", e))?;
    row.into_order(items).map(Some)
  }

  async fn save_order(&mut self, order: &Order) -> MarketResult<()> {
    let result = sqlx::query(
      "UPDATE orders SET status = $2, confirmed_at = $3, in_transit_at = $4, delivered_at = $5, \
       cancelled_at = $6, completed_at = $7, cancel_reason = $8, cancelled_by = $9, updated_at = NOW() \
       WHERE id = $1",
    )
    .bind(order.id)
    .bind(order.status.as_str())
    .bind(order.confirmed_at)
    .bind(order.in_transit_at)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .bind(order.completed_at)
    .bind(order.cancel_reason.as_deref())
    .bind(order.cancelled_by)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("saving order", e))?;
    expect_one(result.rows_affected(), "order", order.id)
  }

  async fn restock_product(&mut self, product_id: Uuid, quantity: i32) -> MarketResult<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
      .bind(product_id)
      .bind(quantity)
      .execute(&mut *self.tx)
      .await
      .map_err(|e| storage_error("restocking product", e))?;
    expect_one(result.rows_affected(), "product", product_id)
  }

  async fn load_job(&mut self, job_id: Uuid) -> MarketResult<Option<DeliveryJob>> {
    let sql = format!("SELECT {} FROM delivery_jobs WHERE id = $1 FOR UPDATE", JOB_COLUMNS);
    let row = sqlx::query_as::<_, DeliveryJobRow>(&sql)
      .bind(job_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading delivery job", e))?;
    row.map(DeliveryJob::try_from).transpose()
  }

  async fn job_for_order(&mut self, order_id: Uuid) -> MarketResult<Option<DeliveryJob>> {
    let sql = format!("SELECT {} FROM delivery_jobs WHERE order_id = $1 FOR UPDATE", JOB_COLUMNS);
    let row = sqlx::query_as::<_, DeliveryJobRow>(&sql)
      .bind(order_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading delivery job for order", e))?;
    row.map(DeliveryJob::try_from).transpose()
  }

  async fn open_jobs(&mut self) -> MarketResult<Vec<DeliveryJob>> {
    let sql = format!(
      "SELECT {} FROM delivery_jobs WHERE status = 'OPEN' AND agency_id IS NULL ORDER BY created_at",
      JOB_COLUMNS
    );
    let rows = sqlx::query_as::<_, DeliveryJobRow>(&sql)
      .fetch_all(&mut *self.tx)
      .await
      .map_err(|e| storage_error("listing open delivery jobs", e))?;
    rows.into_iter().map(DeliveryJob::try_from).collect()
  }

  async fn insert_job(&mut self, job: &DeliveryJob) -> MarketResult<()> {
    sqlx::query(
      "INSERT INTO delivery_jobs (id, order_id, status, pickup_city, pickup_address, dropoff_city, \
       dropoff_address, fee, agency_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(job.id)
    .bind(job.order_id)
    .bind(job.status.as_str())
    .bind(&job.pickup_city)
    .bind(&job.pickup_address)
    .bind(&job.dropoff_city)
    .bind(&job.dropoff_address)
    .bind(job.fee)
    .bind(job.agency_id)
    .bind(job.created_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("inserting delivery job", e))?;
    Ok(())
  }

  async fn save_job(&mut self, job: &DeliveryJob) -> MarketResult<()> {
    let result = sqlx::query(
      "UPDATE delivery_jobs SET status = $2, agency_id = $3, accepted_at = $4, picked_up_at = $5, \
       delivered_at = $6, cancelled_at = $7, cancel_reason = $8 WHERE id = $1",
    )
    .bind(job.id)
    .bind(job.status.as_str())
    .bind(job.agency_id)
    .bind(job.accepted_at)
    .bind(job.picked_up_at)
    .bind(job.delivered_at)
    .bind(job.cancelled_at)
    .bind(job.cancel_reason.as_deref())
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("saving delivery job", e))?;
    expect_one(result.rows_affected(), "delivery job", job.id)
  }

  #[instrument(name = "pg::claim_job", skip(self, at))]
  async fn claim_job(&mut self, job_id: Uuid, agency_id: Uuid, at: DateTime<Utc>) -> MarketResult<bool> {
    let result = sqlx::query(
      "UPDATE delivery_jobs SET status = 'ACCEPTED', agency_id = $2, accepted_at = $3 \
       WHERE id = $1 AND status = 'OPEN' AND agency_id IS NULL",
    )
    .bind(job_id)
    .bind(agency_id)
    .bind(at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("claiming delivery job", e))?;
    debug!(rows = result.rows_affected(), "Conditional job claim executed.");
    Ok(result.rows_affected() == 1)
  }

  async fn append_job_log(&mut self, entry: &DeliveryJobLog) -> MarketResult<()> {
    sqlx::query(
      "INSERT INTO delivery_job_logs (id, job_id, action, actor_id, actor_role, previous_status, new_status, \
       note, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(entry.id)
    .bind(entry.job_id)
    .bind(entry.action.as_str())
    .bind(entry.actor_id)
    .bind(entry.actor_role.map(|r| r.as_str()))
    .bind(entry.previous_status.map(|s| s.as_str()))
    .bind(entry.new_status.as_str())
    .bind(entry.note.as_deref())
    .bind(entry.created_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("appending delivery job log", e))?;
    Ok(())
  }

  async fn load_wallet(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorWallet>> {
    let sql = format!("SELECT {} FROM vendor_wallets WHERE vendor_id = $1 FOR UPDATE", WALLET_COLUMNS);
    let row = sqlx::query_as::<_, WalletRow>(&sql)
      .bind(vendor_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading wallet", e))?;
    Ok(row.map(VendorWallet::from))
  }

  async fn ensure_wallet(&mut self, vendor_id: Uuid, at: DateTime<Utc>) -> MarketResult<VendorWallet> {
    // A losing concurrent insert waits on the winner, then reads its row below.
    let fresh = VendorWallet::open(vendor_id, at);
    sqlx::query(
      "INSERT INTO vendor_wallets (id, vendor_id, available_balance, pending_balance, withdrawals_locked, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (vendor_id) DO NOTHING",
    )
    .bind(fresh.id)
    .bind(fresh.vendor_id)
    .bind(fresh.available_balance)
    .bind(fresh.pending_balance)
    .bind(fresh.withdrawals_locked)
    .bind(fresh.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("creating wallet", e))?;

    self
      .load_wallet(vendor_id)
      .await?
      .ok_or_else(|| MarketError::Storage(format!("wallet for vendor {} vanished after insert", vendor_id)))
  }

  async fn save_wallet(&mut self, wallet: &VendorWallet) -> MarketResult<()> {
    sqlx::query(
      "INSERT INTO vendor_wallets (id, vendor_id, available_balance, pending_balance, withdrawals_locked, \
       lock_reason, locked_at, locked_by_id, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
       ON CONFLICT (vendor_id) DO UPDATE SET available_balance = EXCLUDED.available_balance, \
       pending_balance = EXCLUDED.pending_balance, withdrawals_locked = EXCLUDED.withdrawals_locked, \
       lock_reason = EXCLUDED.lock_reason, locked_at = EXCLUDED.locked_at, \
       locked_by_id = EXCLUDED.locked_by_id, updated_at = EXCLUDED.updated_at",
    )
    .bind(wallet.id)
    .bind(wallet.vendor_id)
    .bind(wallet.available_balance)
    .bind(wallet.pending_balance)
    .bind(wallet.withdrawals_locked)
    .bind(wallet.lock_reason.as_deref())
    .bind(wallet.locked_at)
    .bind(wallet.locked_by_id)
    .bind(wallet.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("saving wallet", e))?;
    Ok(())
  }

  async fn load_wallet_tx(&mut self, tx_id: Uuid) -> MarketResult<Option<WalletTransaction>> {
    let sql = format!("SELECT {} FROM wallet_transactions WHERE id = $1 FOR UPDATE", WALLET_TX_COLUMNS);
    let row = sqlx::query_as::<_, WalletTxRow>(&sql)
      .bind(tx_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading wallet transaction", e))?;
    row.map(WalletTransaction::try_from).transpose()
  }

  async fn pending_earning_for_order(&mut self, order_id: Uuid) -> MarketResult<Option<WalletTransaction>> {
    let sql = format!(
      "SELECT {} FROM wallet_transactions WHERE order_id = $1 AND tx_type = 'ORDER_EARNING' \
       AND status = 'PENDING' LIMIT 1 FOR UPDATE",
      WALLET_TX_COLUMNS
    );
    let row = sqlx::query_as::<_, WalletTxRow>(&sql)
      .bind(order_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading pending earning", e))?;
    row.map(WalletTransaction::try_from).transpose()
  }

  async fn insert_wallet_tx(&mut self, entry: &WalletTransaction) -> MarketResult<()> {
    sqlx::query(
      "INSERT INTO wallet_transactions (id, wallet_id, vendor_id, tx_type, status, amount, payout_id, order_id, \
       note, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(entry.id)
    .bind(entry.wallet_id)
    .bind(entry.vendor_id)
    .bind(entry.tx_type.as_str())
    .bind(entry.status.as_str())
    .bind(entry.amount)
    .bind(entry.payout_id)
    .bind(entry.order_id)
    .bind(entry.note.as_deref())
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("inserting wallet transaction", e))?;
    Ok(())
  }

  async fn save_wallet_tx(&mut self, entry: &WalletTransaction) -> MarketResult<()> {
    let result = sqlx::query(
      "UPDATE wallet_transactions SET status = $2, amount = $3, note = $4, updated_at = $5 WHERE id = $1",
    )
    .bind(entry.id)
    .bind(entry.status.as_str())
    .bind(entry.amount)
    .bind(entry.note.as_deref())
    .bind(entry.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("saving wallet transaction", e))?;
    expect_one(result.rows_affected(), "wallet transaction", entry.id)
  }

  async fn load_payout(&mut self, payout_id: Uuid) -> MarketResult<Option<Payout>> {
    let sql = format!("SELECT {} FROM payouts WHERE id = $1 FOR UPDATE", PAYOUT_COLUMNS);
    let row = sqlx::query_as::<_, PayoutRow>(&sql)
      .bind(payout_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading payout", e))?;
    row.map(Payout::try_from).transpose()
  }

  async fn payout_by_reference(&mut self, app_transaction_ref: &str) -> MarketResult<Option<Payout>> {
    let sql = format!("SELECT {} FROM payouts WHERE app_transaction_ref = $1 FOR UPDATE", PAYOUT_COLUMNS);
    let row = sqlx::query_as::<_, PayoutRow>(&sql)
      .bind(app_transaction_ref)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("loading payout by reference", e))?;
    row.map(Payout::try_from).transpose()
  }

  async fn in_flight_payout(&mut self, vendor_id: Uuid) -> MarketResult<Option<Payout>> {
    let sql = format!(
      "SELECT {} FROM payouts WHERE vendor_id = $1 AND status IN ('REQUESTED', 'PROCESSING') \
       ORDER BY requested_at LIMIT 1",
      PAYOUT_COLUMNS
    );
    let row = sqlx::query_as::<_, PayoutRow>(&sql)
      .bind(vendor_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(|e| storage_error("checking in-flight payouts", e))?;
    row.map(Payout::try_from).transpose()
  }

  async fn insert_payout(&mut self, payout: &Payout) -> MarketResult<()> {
    sqlx::query(
      "INSERT INTO payouts (id, vendor_id, wallet_id, amount, method, destination_phone, beneficiary_name, \
       app_transaction_ref, provider_ref, provider_raw, failure_reason, status, requested_at, processed_at, \
       completed_at, failed_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(payout.id)
    .bind(payout.vendor_id)
    .bind(payout.wallet_id)
    .bind(payout.amount)
    .bind(payout.method.as_str())
    .bind(&payout.destination_phone)
    .bind(&payout.beneficiary_name)
    .bind(&payout.app_transaction_ref)
    .bind(payout.provider_ref.as_deref())
    .bind(&payout.provider_raw)
    .bind(payout.failure_reason.as_deref())
    .bind(payout.status.as_str())
    .bind(payout.requested_at)
    .bind(payout.processed_at)
    .bind(payout.completed_at)
    .bind(payout.failed_at)
    .bind(payout.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("inserting payout", e))?;
    Ok(())
  }

  async fn save_payout(&mut self, payout: &Payout) -> MarketResult<()> {
    let result = sqlx::query(
      "UPDATE payouts SET app_transaction_ref = $2, provider_ref = $3, provider_raw = $4, failure_reason = $5, \
       status = $6, requested_at = $7, processed_at = $8, completed_at = $9, failed_at = $10, updated_at = $11 \
       WHERE id = $1",
    )
    .bind(payout.id)
    .bind(&payout.app_transaction_ref)
    .bind(payout.provider_ref.as_deref())
    .bind(&payout.provider_raw)
    .bind(payout.failure_reason.as_deref())
    .bind(payout.status.as_str())
    .bind(payout.requested_at)
    .bind(payout.processed_at)
    .bind(payout.completed_at)
    .bind(payout.failed_at)
    .bind(payout.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("saving payout", e))?;
    expect_one(result.rows_affected(), "payout", payout.id)
  }

  async fn payout_profile(&mut self, vendor_id: Uuid) -> MarketResult<Option<VendorPayoutProfile>> {
    let row = sqlx::query_as::<_, PayoutProfileRow>(
      "SELECT vendor_id, method, phone, legal_name, updated_at FROM vendor_payout_profiles WHERE vendor_id = $1",
    )
    .bind(vendor_id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| storage_error("loading payout profile", e))?;
    row.map(VendorPayoutProfile::try_from).transpose()
  }

  async fn save_payout_profile(&mut self, profile: &VendorPayoutProfile) -> MarketResult<()> {
    sqlx::query(
      "INSERT INTO vendor_payout_profiles (vendor_id, method, phone, legal_name, updated_at) \
       VALUES ($1, $2, $3, $4, $5) ON CONFLICT (vendor_id) DO UPDATE SET method = EXCLUDED.method, \
       phone = EXCLUDED.phone, legal_name = EXCLUDED.legal_name, updated_at = EXCLUDED.updated_at",
    )
    .bind(profile.vendor_id)
    .bind(profile.method.as_str())
    .bind(&profile.phone)
    .bind(&profile.legal_name)
    .bind(profile.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(|e| storage_error("saving payout profile", e))?;
    Ok(())
  }

  async fn commit(self: Box<Self>) -> MarketResult<()> {
    self.tx.commit().await.map_err(|e| storage_error("committing transaction", e))
  }
}
