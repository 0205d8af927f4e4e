// core/src/settlement/orders.rs

//! Order status changes and their side effects.

use super::common_steps::ensure_actor_access;
use super::contexts::{CancelOrderCtx, ConfirmOrderCtx, OrderStatusCtx};
use super::SettlementConfig;
use crate::error::{MarketError, MarketResult};
use crate::flow::{ContextData, Flow, FlowRegistry, StepControl};
use crate::model::{
  Actor, ActorRole, DeliveryJob, DeliveryJobLog, DeliveryJobStatus, DeliveryMethod, JobLogAction, Order, OrderStatus,
  WalletTransaction, WalletTxStatus, WalletTxType,
};
use crate::rules::transitions::assert_order_transition;
use crate::store::StoreTx;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// A requested order status change.
pub(crate) struct OrderChange<'a> {
  pub actor: &'a Actor,
  pub order_id: Uuid,
  pub target: OrderStatus,
  /// Cancellation reason or free-form note.
  pub note: Option<String>,
  pub now: DateTime<Utc>,
}

/// Outcome of `apply_order_change`, for callers that need the job too.
pub(crate) struct AppliedChange {
  pub order: Order,
  pub created_job: Option<DeliveryJob>,
}

/// Loads the order, checks ownership and the role's transition table, then
/// applies the status change and its side effects inside `tx`. Nothing is
/// committed here.
pub(crate) async fn apply_order_change(
  tx: &mut dyn StoreTx,
  config: &SettlementConfig,
  change: OrderChange<'_>,
) -> MarketResult<AppliedChange> {
  let OrderChange {
    actor,
    order_id,
    target,
    note,
    now,
  } = change;

  let mut order = tx
    .load_order(order_id)
    .await?
    .ok_or_else(|| MarketError::not_found("order", order_id))?;

  ensure_order_owner(tx, actor, &order).await?;
  assert_order_transition(actor.role, &order, target)?;

  let previous = order.status;
  order.stamp(target, now);
  let mut created_job = None;

  match target {
    OrderStatus::Confirmed => {
      if order.delivery_method == DeliveryMethod::JemoRider {
        created_job = open_delivery_job(tx, actor, &order, now).await?;
      }
    }
    OrderStatus::Cancelled => {
      order.cancelled_by = Some(actor.id);
      order.cancel_reason = note.clone();
      cancel_open_job(tx, actor, &order, note.clone(), now).await?;
      for item in &order.items {
        tx.restock_product(item.product_id, item.quantity).await?;
      }
    }
    OrderStatus::Delivered => credit_pending_earning(tx, config, &order, now).await?,
    OrderStatus::Completed => settle_earning(tx, config, &order, now).await?,
    OrderStatus::Pending | OrderStatus::InTransit => {}
  }

  tx.save_order(&order).await?;
  info!(
    order_id = %order.id,
    from = %previous,
    to = %target,
    actor_id = %actor.id,
    role = %actor.role,
    "Order status changed."
  );
  Ok(AppliedChange { order, created_job })
}

async fn ensure_order_owner(tx: &mut dyn StoreTx, actor: &Actor, order: &Order) -> MarketResult<()> {
  let owns = match actor.role {
    ActorRole::Admin | ActorRole::System => true,
    ActorRole::Vendor => order.vendor_id == actor.id,
    ActorRole::Customer => order.customer_id == actor.id,
    ActorRole::Agency => match tx.job_for_order(order.id).await? {
      Some(job) => job.agency_id == Some(actor.id) && job.status == DeliveryJobStatus::Accepted,
      None => false,
    },
  };
  if owns {
    Ok(())
  } else {
    Err(MarketError::Forbidden(format!("order {} is not yours to update", order.id)))
  }
}

/// Creates the OPEN job for a rider-delivered order unless one already exists.
async fn open_delivery_job(
  tx: &mut dyn StoreTx,
  actor: &Actor,
  order: &Order,
  now: DateTime<Utc>,
) -> MarketResult<Option<DeliveryJob>> {
  if let Some(existing) = tx.job_for_order(order.id).await? {
    info!(order_id = %order.id, job_id = %existing.id, "Delivery job already exists, reusing it.");
    return Ok(None);
  }
  let job = DeliveryJob::open_for(order, now);
  tx.insert_job(&job).await?;
  tx.append_job_log(&DeliveryJobLog::record(&job, JobLogAction::Created, Some(actor), None, None, now))
    .await?;
  info!(order_id = %order.id, job_id = %job.id, pickup_city = %job.pickup_city, "Delivery job opened.");
  Ok(Some(job))
}

async fn cancel_open_job(
  tx: &mut dyn StoreTx,
  actor: &Actor,
  order: &Order,
  reason: Option<String>,
  now: DateTime<Utc>,
) -> MarketResult<()> {
  let Some(mut job) = tx.job_for_order(order.id).await? else {
    return Ok(());
  };
  if !matches!(job.status, DeliveryJobStatus::Open | DeliveryJobStatus::Accepted) {
    return Ok(());
  }
  let previous = job.status;
  job.cancel(now, reason.clone());
  tx.save_job(&job).await?;
  tx.append_job_log(&DeliveryJobLog::record(
    &job,
    JobLogAction::Cancelled,
    Some(actor),
    Some(previous),
    reason,
    now,
  ))
  .await?;
  info!(order_id = %order.id, job_id = %job.id, "Delivery job cancelled with its order.");
  Ok(())
}

async fn credit_pending_earning(
  tx: &mut dyn StoreTx,
  config: &SettlementConfig,
  order: &Order,
  now: DateTime<Utc>,
) -> MarketResult<()> {
  let amount = config.vendor_earnings(order);
  if amount <= 0 {
    return Ok(());
  }
  if tx.pending_earning_for_order(order.id).await?.is_some() {
    return Ok(());
  }
  let mut wallet = tx.ensure_wallet(order.vendor_id, now).await?;
  wallet.pending_balance += amount;
  wallet.updated_at = now;
  tx.save_wallet(&wallet).await?;
  let entry = WalletTransaction::new(
    &wallet,
    WalletTxType::OrderEarning,
    WalletTxStatus::Pending,
    amount,
    format!("Order {} delivered", order.id),
    now,
  )
  .for_order(order.id);
  tx.insert_wallet_tx(&entry).await?;
  info!(order_id = %order.id, vendor_id = %order.vendor_id, amount, "Earning credited to pending balance.");
  Ok(())
}

async fn settle_earning(
  tx: &mut dyn StoreTx,
  config: &SettlementConfig,
  order: &Order,
  now: DateTime<Utc>,
) -> MarketResult<()> {
  let mut wallet = tx.ensure_wallet(order.vendor_id, now).await?;
  match tx.pending_earning_for_order(order.id).await? {
    Some(mut entry) => {
      wallet.pending_balance -= entry.amount;
      wallet.available_balance += entry.amount;
      if wallet.pending_balance < 0 {
        warn!(vendor_id = %wallet.vendor_id, pending = wallet.pending_balance, "Pending balance went negative.");
      }
      entry.status = WalletTxStatus::Posted;
      entry.updated_at = now;
      tx.save_wallet_tx(&entry).await?;
      info!(order_id = %order.id, amount = entry.amount, "Pending earning released.");
    }
    None => {
      let amount = config.vendor_earnings(order);
      if amount <= 0 {
        return Ok(());
      }
      wallet.available_balance += amount;
      let entry = WalletTransaction::new(
        &wallet,
        WalletTxType::OrderEarning,
        WalletTxStatus::Posted,
        amount,
        format!("Order {} completed", order.id),
        now,
      )
      .for_order(order.id);
      tx.insert_wallet_tx(&entry).await?;
      info!(order_id = %order.id, amount, "Earning credited to available balance.");
    }
  }
  wallet.updated_at = now;
  tx.save_wallet(&wallet).await
}

/// Runs one order change in its own transaction.
async fn run_order_change(
  ctx_config: &SettlementConfig,
  store: &dyn crate::store::MarketStore,
  change: OrderChange<'_>,
) -> MarketResult<AppliedChange> {
  let mut tx = store.begin().await?;
  let applied = apply_order_change(tx.as_mut(), ctx_config, change).await?;
  tx.commit().await?;
  Ok(applied)
}

pub fn register_order_flows(registry: &FlowRegistry<MarketError>) {
  register_confirm_order_flow(registry);
  register_cancel_order_flow(registry);
  register_order_status_flow(registry);
}

fn register_confirm_order_flow(registry: &FlowRegistry<MarketError>) {
  let mut flow = Flow::<ConfirmOrderCtx, MarketError>::new(&[("ensure_access", false, None), ("confirm", false, None)]);
  flow.on_step("ensure_access", ensure_actor_access::<ConfirmOrderCtx>);
  flow.on_step("confirm", |ctx_data: ContextData<ConfirmOrderCtx>| async move {
    let (deps, actor, order_id) = {
      let guard = ctx_data.read();
      (guard.deps.clone(), guard.actor, guard.order_id)
    };
    let applied = run_order_change(
      &deps.config,
      deps.store.as_ref(),
      OrderChange {
        actor: &actor,
        order_id,
        target: OrderStatus::Confirmed,
        note: None,
        now: Utc::now(),
      },
    )
    .await?;
    {
      let mut guard = ctx_data.write();
      guard.order = Some(applied.order);
      guard.created_job = applied.created_job;
    }
    Ok::<_, MarketError>(StepControl::Continue)
  });
  registry.register_flow(flow);
}

fn register_cancel_order_flow(registry: &FlowRegistry<MarketError>) {
  let mut flow = Flow::<CancelOrderCtx, MarketError>::new(&[("ensure_access", false, None), ("cancel", false, None)]);
  flow.on_step("ensure_access", ensure_actor_access::<CancelOrderCtx>);
  flow.on_step("cancel", |ctx_data: ContextData<CancelOrderCtx>| async move {
    let (deps, actor, order_id, reason) = {
      let guard = ctx_data.read();
      let reason = guard
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
      (guard.deps.clone(), guard.actor, guard.order_id, reason)
    };
    let applied = run_order_change(
      &deps.config,
      deps.store.as_ref(),
      OrderChange {
        actor: &actor,
        order_id,
        target: OrderStatus::Cancelled,
        note: reason,
        now: Utc::now(),
      },
    )
    .await?;
    ctx_data.write().order = Some(applied.order);
    Ok::<_, MarketError>(StepControl::Continue)
  });
  registry.register_flow(flow);
}

fn register_order_status_flow(registry: &FlowRegistry<MarketError>) {
  let mut flow =
    Flow::<OrderStatusCtx, MarketError>::new(&[("ensure_access", false, None), ("apply_status", false, None)]);
  flow.on_step("ensure_access", ensure_actor_access::<OrderStatusCtx>);
  flow.on_step("apply_status", |ctx_data: ContextData<OrderStatusCtx>| async move {
    let (deps, actor, order_id, target, note) = {
      let guard = ctx_data.read();
      (guard.deps.clone(), guard.actor, guard.order_id, guard.target, guard.note.clone())
    };
    let applied = run_order_change(
      &deps.config,
      deps.store.as_ref(),
      OrderChange {
        actor: &actor,
        order_id,
        target,
        note,
        now: Utc::now(),
      },
    )
    .await?;
    ctx_data.write().order = Some(applied.order);
    Ok::<_, MarketError>(StepControl::Continue)
  });
  registry.register_flow(flow);
}
