// core/src/settlement/delivery.rs

//! Delivery job flows driven by agencies, plus job cancellation.

use super::common_steps::ensure_actor_access;
use super::contexts::{AcceptJobCtx, CancelJobCtx, JobProgress, JobProgressCtx, OpenJobsCtx};
use super::orders::{apply_order_change, OrderChange};
use crate::error::{MarketError, MarketResult};
use crate::flow::{ContextData, Flow, FlowRegistry, StepControl};
use crate::model::{Actor, ActorRole, DeliveryJob, DeliveryJobLog, DeliveryJobStatus, JobLogAction, OrderStatus};
use crate::rules::city::covers_city;
use crate::rules::delivery::{assert_job_acceptable, assert_job_transition};
use crate::store::StoreTx;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

async fn load_job(tx: &mut dyn StoreTx, job_id: Uuid) -> MarketResult<DeliveryJob> {
  tx.load_job(job_id)
    .await?
    .ok_or_else(|| MarketError::not_found("delivery job", job_id))
}

/// The job must be held by this agency.
fn ensure_assigned_to(job: &DeliveryJob, actor: &Actor) -> MarketResult<()> {
  if job.agency_id == Some(actor.id) {
    Ok(())
  } else {
    Err(MarketError::Forbidden(format!("delivery job {} is not assigned to your agency", job.id)))
  }
}

async fn accept_step(ctx_data: ContextData<AcceptJobCtx>) -> MarketResult<StepControl> {
  let (store, actor, job_id) = {
    let guard = ctx_data.read();
    (guard.deps.store.clone(), guard.actor, guard.job_id)
  };
  let now = Utc::now();
  let mut tx = store.begin().await?;

  let job = load_job(tx.as_mut(), job_id).await?;
  let agency = tx
    .agency_account(actor.id)
    .await?
    .ok_or_else(|| MarketError::not_found("agency", actor.id))?;
  if !covers_city(&agency.cities_covered, &job.pickup_city) {
    return Err(MarketError::Forbidden(format!(
      "agency {} does not cover {}",
      agency.name, job.pickup_city
    )));
  }
  if let Err(e) = assert_job_acceptable(&job, actor.id) {
    if matches!(e, MarketError::JobAlreadyAssigned) {
      warn!(job_id = %job_id, agency_id = %actor.id, holder = ?job.agency_id, "Lost the race for a delivery job.");
    }
    return Err(e);
  }

  if !tx.claim_job(job_id, actor.id, now).await? {
    warn!(job_id = %job_id, agency_id = %actor.id, "Lost the race for a delivery job.");
    return Err(MarketError::JobAlreadyAssigned);
  }
  let claimed = load_job(tx.as_mut(), job_id).await?;
  tx.append_job_log(&DeliveryJobLog::record(
    &claimed,
    JobLogAction::Accepted,
    Some(&actor),
    Some(DeliveryJobStatus::Open),
    None,
    now,
  ))
  .await?;
  tx.commit().await?;

  info!(job_id = %job_id, agency_id = %actor.id, "Delivery job accepted.");
  ctx_data.write().job = Some(claimed);
  Ok(StepControl::Continue)
}

async fn progress_step(ctx_data: ContextData<JobProgressCtx>) -> MarketResult<StepControl> {
  let (deps, actor, job_id, progress) = {
    let guard = ctx_data.read();
    (guard.deps.clone(), guard.actor, guard.job_id, guard.progress)
  };
  let now = Utc::now();
  let mut tx = deps.store.begin().await?;

  let mut job = load_job(tx.as_mut(), job_id).await?;
  ensure_assigned_to(&job, &actor)?;

  let (order_target, action) = match progress {
    JobProgress::PickedUp => {
      if job.status != DeliveryJobStatus::Accepted || job.picked_up_at.is_some() {
        return Err(MarketError::InvalidJobTransition {
          current: job.status.to_string(),
          target: JobLogAction::PickedUp.to_string(),
        });
      }
      (OrderStatus::InTransit, JobLogAction::PickedUp)
    }
    JobProgress::Delivered => {
      assert_job_transition(&job, DeliveryJobStatus::Delivered)?;
      (OrderStatus::Delivered, JobLogAction::Delivered)
    }
  };

  // Order first: ownership is checked against the job while it is still ACCEPTED.
  let applied = apply_order_change(
    tx.as_mut(),
    &deps.config,
    OrderChange {
      actor: &actor,
      order_id: job.order_id,
      target: order_target,
      note: None,
      now,
    },
  )
  .await?;

  let previous = job.status;
  match progress {
    JobProgress::PickedUp => job.picked_up_at = Some(now),
    JobProgress::Delivered => {
      job.status = DeliveryJobStatus::Delivered;
      job.delivered_at = Some(now);
    }
  }
  tx.save_job(&job).await?;
  tx.append_job_log(&DeliveryJobLog::record(&job, action, Some(&actor), Some(previous), None, now))
    .await?;
  tx.commit().await?;

  info!(job_id = %job_id, order_id = %job.order_id, action = %action, "Delivery progress recorded.");
  {
    let mut guard = ctx_data.write();
    guard.job = Some(job);
    guard.order = Some(applied.order);
  }
  Ok(StepControl::Continue)
}

async fn cancel_step(ctx_data: ContextData<CancelJobCtx>) -> MarketResult<StepControl> {
  let (store, actor, job_id, reason) = {
    let guard = ctx_data.read();
    let reason = guard
      .reason
      .as_deref()
      .map(str::trim)
      .filter(|r| !r.is_empty())
      .map(str::to_string);
    (guard.deps.store.clone(), guard.actor, guard.job_id, reason)
  };
  let now = Utc::now();
  let mut tx = store.begin().await?;

  let mut job = load_job(tx.as_mut(), job_id).await?;
  if actor.role == ActorRole::Vendor {
    let order = tx
      .load_order(job.order_id)
      .await?
      .ok_or_else(|| MarketError::not_found("order", job.order_id))?;
    if order.vendor_id != actor.id {
      return Err(MarketError::Forbidden(format!("delivery job {} is not for one of your orders", job.id)));
    }
  }
  assert_job_transition(&job, DeliveryJobStatus::Cancelled)?;

  let previous = job.status;
  job.cancel(now, reason.clone());
  tx.save_job(&job).await?;
  tx.append_job_log(&DeliveryJobLog::record(
    &job,
    JobLogAction::Cancelled,
    Some(&actor),
    Some(previous),
    reason,
    now,
  ))
  .await?;
  tx.commit().await?;

  info!(job_id = %job_id, actor_id = %actor.id, role = %actor.role, "Delivery job cancelled.");
  ctx_data.write().job = Some(job);
  Ok(StepControl::Continue)
}

async fn list_open_step(ctx_data: ContextData<OpenJobsCtx>) -> MarketResult<StepControl> {
  let (store, actor) = {
    let guard = ctx_data.read();
    (guard.deps.store.clone(), guard.actor)
  };
  let mut tx = store.begin().await?;
  let agency = tx
    .agency_account(actor.id)
    .await?
    .ok_or_else(|| MarketError::not_found("agency", actor.id))?;
  let jobs: Vec<DeliveryJob> = tx
    .open_jobs()
    .await?
    .into_iter()
    .filter(|job| covers_city(&agency.cities_covered, &job.pickup_city))
    .collect();
  ctx_data.write().jobs = jobs;
  Ok(StepControl::Continue)
}

pub fn register_delivery_flows(registry: &FlowRegistry<MarketError>) {
  let mut accept = Flow::<AcceptJobCtx, MarketError>::new(&[("ensure_access", false, None), ("accept", false, None)]);
  accept.on_step("ensure_access", ensure_actor_access::<AcceptJobCtx>);
  accept.on_step("accept", accept_step);
  registry.register_flow(accept);

  let mut progress =
    Flow::<JobProgressCtx, MarketError>::new(&[("ensure_access", false, None), ("record_progress", false, None)]);
  progress.on_step("ensure_access", ensure_actor_access::<JobProgressCtx>);
  progress.on_step("record_progress", progress_step);
  registry.register_flow(progress);

  let mut cancel = Flow::<CancelJobCtx, MarketError>::new(&[("ensure_access", false, None), ("cancel", false, None)]);
  cancel.on_step("ensure_access", ensure_actor_access::<CancelJobCtx>);
  cancel.on_step("cancel", cancel_step);
  registry.register_flow(cancel);

  let mut open = Flow::<OpenJobsCtx, MarketError>::new(&[("ensure_access", false, None), ("list_open", false, None)]);
  open.on_step("ensure_access", ensure_actor_access::<OpenJobsCtx>);
  open.on_step("list_open", list_open_step);
  registry.register_flow(open);
}
