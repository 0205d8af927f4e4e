// core/src/settlement/mod.rs

//! Settlement operations over orders, delivery jobs, wallets and payouts.
//!
//! Every public operation on [`Settlement`] runs a registered [`Flow`]
//! (`crate::flow`) whose first step is the actor access gate. Single-table
//! state changes happen inside one store transaction; the payout flows are
//! sagas that reserve locally, call the provider outside any transaction and
//! then confirm or compensate.

pub mod common_steps;
pub mod contexts;
pub mod delivery;
pub mod orders;
pub mod payouts;
pub mod wallet;

use crate::error::{MarketError, MarketResult};
use crate::flow::{ContextData, FlowRegistry};
use crate::model::{
  Actor, DeliveryJob, Order, OrderStatus, Payout, PayoutMethod, VendorPayoutProfile, VendorWallet,
};
use crate::provider::{PayoutProvider, TransferState};
use crate::store::MarketStore;
use contexts::*;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementConfig {
  /// ISO currency sent to the payout provider.
  pub currency: String,
  pub min_withdrawal: i64,
  /// Platform commission on the item subtotal, in basis points.
  pub platform_commission_bps: u32,
}

impl Default for SettlementConfig {
  fn default() -> Self {
    Self {
      currency: "XAF".to_string(),
      min_withdrawal: 500,
      platform_commission_bps: 0,
    }
  }
}

impl SettlementConfig {
  pub fn commission(&self, subtotal: i64) -> i64 {
    subtotal * i64::from(self.platform_commission_bps) / 10_000
  }

  /// What the vendor is owed for a delivered order. The delivery fee goes to
  /// the vendor only when the vendor carried the order.
  pub fn vendor_earnings(&self, order: &Order) -> i64 {
    let subtotal = order.subtotal();
    let fee = match order.delivery_method {
      crate::model::DeliveryMethod::VendorDelivery => order.delivery_fee,
      crate::model::DeliveryMethod::JemoRider => 0,
    };
    subtotal - self.commission(subtotal) + fee
  }
}

/// Collaborators handed to every flow context.
#[derive(Clone)]
pub struct SettlementDeps {
  pub store: Arc<dyn MarketStore>,
  pub provider: Arc<dyn PayoutProvider>,
  pub config: Arc<SettlementConfig>,
}

pub struct Settlement {
  deps: SettlementDeps,
  flows: FlowRegistry<MarketError>,
}

/// Registers one flow per operation context.
pub fn register_all_flows(registry: &FlowRegistry<MarketError>) {
  info!("Registering settlement flows...");
  orders::register_order_flows(registry);
  delivery::register_delivery_flows(registry);
  payouts::register_payout_flows(registry);
  wallet::register_wallet_flows(registry);
  info!("All settlement flows registered.");
}

/// Pulls an output field out of a finished flow context.
fn take_output<C, T>(ctx_data: &ContextData<C>, what: &str, f: impl FnOnce(&mut C) -> Option<T>) -> MarketResult<T>
where
  C: Send + Sync + 'static,
{
  let mut guard = ctx_data.write();
  f(&mut guard).ok_or_else(|| MarketError::Internal(format!("flow finished without producing {}", what)))
}

impl Settlement {
  pub fn new(store: Arc<dyn MarketStore>, provider: Arc<dyn PayoutProvider>, config: SettlementConfig) -> Self {
    let flows = FlowRegistry::new();
    register_all_flows(&flows);
    Self {
      deps: SettlementDeps {
        store,
        provider,
        config: Arc::new(config),
      },
      flows,
    }
  }

  pub fn deps(&self) -> &SettlementDeps {
    &self.deps
  }

  pub fn config(&self) -> &SettlementConfig {
    &self.deps.config
  }

  pub async fn ping(&self) -> MarketResult<()> {
    self.deps.store.ping().await
  }

  // --- Orders ---

  #[instrument(name = "settlement::confirm_order", skip(self), fields(actor_id = %actor.id, role = %actor.role))]
  pub async fn confirm_order(&self, actor: Actor, order_id: Uuid) -> MarketResult<Order> {
    let ctx = ContextData::new(ConfirmOrderCtx {
      deps: self.deps.clone(),
      actor,
      order_id,
      order: None,
      created_job: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "order", |c| c.order.take())
  }

  #[instrument(name = "settlement::cancel_order", skip(self, reason), fields(actor_id = %actor.id, role = %actor.role))]
  pub async fn cancel_order(&self, actor: Actor, order_id: Uuid, reason: Option<String>) -> MarketResult<Order> {
    let ctx = ContextData::new(CancelOrderCtx {
      deps: self.deps.clone(),
      actor,
      order_id,
      reason,
      order: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "order", |c| c.order.take())
  }

  #[instrument(name = "settlement::update_order_status", skip(self, note), fields(actor_id = %actor.id, role = %actor.role))]
  pub async fn update_order_status(
    &self,
    actor: Actor,
    order_id: Uuid,
    target: OrderStatus,
    note: Option<String>,
  ) -> MarketResult<Order> {
    let ctx = ContextData::new(OrderStatusCtx {
      deps: self.deps.clone(),
      actor,
      order_id,
      target,
      note,
      order: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "order", |c| c.order.take())
  }

  /// Customer confirms receipt: DELIVERED to COMPLETED.
  pub async fn confirm_received(&self, actor: Actor, order_id: Uuid) -> MarketResult<Order> {
    self
      .update_order_status(actor, order_id, OrderStatus::Completed, Some("Received by customer".to_string()))
      .await
  }

  // --- Delivery jobs ---

  #[instrument(name = "settlement::accept_job", skip(self), fields(actor_id = %actor.id))]
  pub async fn accept_job(&self, actor: Actor, job_id: Uuid) -> MarketResult<DeliveryJob> {
    let ctx = ContextData::new(AcceptJobCtx {
      deps: self.deps.clone(),
      actor,
      job_id,
      job: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "delivery job", |c| c.job.take())
  }

  pub async fn pick_up_job(&self, actor: Actor, job_id: Uuid) -> MarketResult<DeliveryJob> {
    self.report_job_progress(actor, job_id, JobProgress::PickedUp).await
  }

  pub async fn deliver_job(&self, actor: Actor, job_id: Uuid) -> MarketResult<DeliveryJob> {
    self.report_job_progress(actor, job_id, JobProgress::Delivered).await
  }

  #[instrument(name = "settlement::report_job_progress", skip(self), fields(actor_id = %actor.id))]
  async fn report_job_progress(&self, actor: Actor, job_id: Uuid, progress: JobProgress) -> MarketResult<DeliveryJob> {
    let ctx = ContextData::new(JobProgressCtx {
      deps: self.deps.clone(),
      actor,
      job_id,
      progress,
      job: None,
      order: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "delivery job", |c| c.job.take())
  }

  #[instrument(name = "settlement::cancel_job", skip(self, reason), fields(actor_id = %actor.id, role = %actor.role))]
  pub async fn cancel_job(&self, actor: Actor, job_id: Uuid, reason: Option<String>) -> MarketResult<DeliveryJob> {
    let ctx = ContextData::new(CancelJobCtx {
      deps: self.deps.clone(),
      actor,
      job_id,
      reason,
      job: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "delivery job", |c| c.job.take())
  }

  pub async fn open_jobs_for_agency(&self, actor: Actor) -> MarketResult<Vec<DeliveryJob>> {
    let ctx = ContextData::new(OpenJobsCtx {
      deps: self.deps.clone(),
      actor,
      jobs: Vec::new(),
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "job list", |c| Some(std::mem::take(&mut c.jobs)))
  }

  // --- Payouts ---

  #[instrument(name = "settlement::request_withdrawal", skip(self), fields(actor_id = %actor.id))]
  pub async fn request_withdrawal(&self, actor: Actor, amount: i64) -> MarketResult<Payout> {
    let ctx = ContextData::new(WithdrawalCtx {
      deps: self.deps.clone(),
      actor,
      amount,
      disbursement: Disbursement::default(),
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "payout", |c| c.disbursement.payout.take())
  }

  #[instrument(name = "settlement::retry_payout", skip(self), fields(actor_id = %actor.id))]
  pub async fn retry_payout(&self, actor: Actor, payout_id: Uuid) -> MarketResult<Payout> {
    let ctx = ContextData::new(RetryPayoutCtx {
      deps: self.deps.clone(),
      actor,
      payout_id,
      disbursement: Disbursement::default(),
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "payout", |c| c.disbursement.payout.take())
  }

  /// Reconciles a PROCESSING payout with the provider. `reported` carries the
  /// state from a provider callback; without it the provider is queried.
  #[instrument(name = "settlement::sync_payout", skip(self), fields(actor_id = %actor.id, role = %actor.role))]
  pub async fn sync_payout(
    &self,
    actor: Actor,
    lookup: PayoutLookup,
    reported: Option<TransferState>,
  ) -> MarketResult<Payout> {
    let ctx = ContextData::new(SyncPayoutCtx {
      deps: self.deps.clone(),
      actor,
      lookup,
      reported,
      state: None,
      reply: None,
      payout: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "payout", |c| c.payout.take())
  }

  // --- Wallets ---

  #[instrument(name = "settlement::lock_withdrawals", skip(self, reason), fields(actor_id = %actor.id))]
  pub async fn lock_withdrawals(&self, actor: Actor, vendor_id: Uuid, reason: String) -> MarketResult<VendorWallet> {
    self.change_withdrawal_lock(actor, vendor_id, LockAction::Lock, Some(reason)).await
  }

  #[instrument(name = "settlement::unlock_withdrawals", skip(self), fields(actor_id = %actor.id))]
  pub async fn unlock_withdrawals(&self, actor: Actor, vendor_id: Uuid) -> MarketResult<VendorWallet> {
    self.change_withdrawal_lock(actor, vendor_id, LockAction::Unlock, None).await
  }

  async fn change_withdrawal_lock(
    &self,
    actor: Actor,
    vendor_id: Uuid,
    action: LockAction,
    reason: Option<String>,
  ) -> MarketResult<VendorWallet> {
    let ctx = ContextData::new(WithdrawalLockCtx {
      deps: self.deps.clone(),
      actor,
      vendor_id,
      action,
      reason,
      wallet: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "wallet", |c| c.wallet.take())
  }

  pub async fn wallet(&self, actor: Actor, vendor_id: Uuid) -> MarketResult<VendorWallet> {
    let ctx = ContextData::new(WalletViewCtx {
      deps: self.deps.clone(),
      actor,
      vendor_id,
      wallet: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "wallet", |c| c.wallet.take())
  }

  #[instrument(name = "settlement::save_payout_profile", skip(self, phone, legal_name), fields(actor_id = %actor.id))]
  pub async fn save_payout_profile(
    &self,
    actor: Actor,
    method: PayoutMethod,
    phone: String,
    legal_name: String,
  ) -> MarketResult<VendorPayoutProfile> {
    let ctx = ContextData::new(PayoutProfileCtx {
      deps: self.deps.clone(),
      actor,
      method,
      phone,
      legal_name,
      profile: None,
    });
    self.flows.run(ctx.clone()).await?;
    take_output(&ctx, "payout profile", |c| c.profile.take())
  }
}
