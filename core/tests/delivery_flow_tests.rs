// tests/delivery_flow_tests.rs
mod common;

use common::*;
use jemo_core::model::{DeliveryJob, DeliveryJobStatus, DeliveryMethod, JobLogAction, OrderStatus};
use jemo_core::{ErrorKind, MarketError};
use serial_test::serial;
use std::sync::Arc;

async fn confirmed_job(m: &Market) -> DeliveryJob {
  let order = m.seed_order(DeliveryMethod::JemoRider, OrderStatus::Pending).await;
  m.settlement.confirm_order(m.vendor, order.id).await.unwrap();
  let state = m.store.snapshot().await;
  state.jobs.values().find(|j| j.order_id == order.id).cloned().unwrap()
}

#[tokio::test]
#[serial]
async fn test_accept_assigns_job_to_agency() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;

  let accepted = m.settlement.accept_job(m.agency, job.id).await.unwrap();

  assert_eq!(accepted.status, DeliveryJobStatus::Accepted);
  assert_eq!(accepted.agency_id, Some(m.agency.id));
  assert!(accepted.accepted_at.is_some());
  let state = m.store.snapshot().await;
  let logs = state.logs_for_job(job.id);
  assert_eq!(logs.last().unwrap().action, JobLogAction::Accepted);
  assert_eq!(logs.last().unwrap().previous_status, Some(DeliveryJobStatus::Open));
}

#[tokio::test]
#[serial]
async fn test_accept_outside_covered_city_is_forbidden() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;
  let bamenda_agency = m.add_agency(&["Bamenda"]).await;

  let err = m.settlement.accept_job(bamenda_agency, job.id).await.unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Forbidden);
  assert_eq!(m.store.snapshot().await.jobs[&job.id].status, DeliveryJobStatus::Open);
}

#[tokio::test]
#[serial]
async fn test_accept_distinguishes_not_open_from_assigned() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;

  m.store
    .with_state(|s| s.jobs.get_mut(&job.id).unwrap().agency_id = Some(uuid::Uuid::new_v4()))
    .await;
  let err = m.settlement.accept_job(m.agency, job.id).await.unwrap_err();
  assert!(matches!(err, MarketError::JobAlreadyAssigned));
  assert_eq!(err.kind(), ErrorKind::Conflict);

  m.store
    .with_state(|s| {
      let stored = s.jobs.get_mut(&job.id).unwrap();
      stored.agency_id = None;
      stored.status = DeliveryJobStatus::Cancelled;
    })
    .await;
  let err = m.settlement.accept_job(m.agency, job.id).await.unwrap_err();
  assert!(matches!(err, MarketError::JobNotOpen));
  assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_concurrent_accept_has_one_winner() {
  let m = Arc::new(Market::new().await);
  let job = confirmed_job(&m).await;
  let rival = m.add_agency(&["Douala"]).await;

  let (a, b) = {
    let m1 = Arc::clone(&m);
    let m2 = Arc::clone(&m);
    let job_id = job.id;
    let first = tokio::spawn(async move { m1.settlement.accept_job(m1.agency, job_id).await });
    let second = tokio::spawn(async move { m2.settlement.accept_job(rival, job_id).await });
    (first.await.unwrap(), second.await.unwrap())
  };

  let results = [a, b];
  let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
  assert_eq!(winners.len(), 1);
  let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
  assert!(matches!(loser, MarketError::JobAlreadyAssigned), "loser got {:?}", loser);
  assert_eq!(loser.kind(), ErrorKind::Conflict);

  let state = m.store.snapshot().await;
  assert_eq!(state.jobs[&job.id].agency_id, winners[0].agency_id);
  let accepts = state
    .logs_for_job(job.id)
    .iter()
    .filter(|l| l.action == JobLogAction::Accepted)
    .count();
  assert_eq!(accepts, 1);
}

#[tokio::test]
#[serial]
async fn test_accept_after_rival_won_is_a_conflict() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;
  let rival = m.add_agency(&["Douala"]).await;
  m.settlement.accept_job(rival, job.id).await.unwrap();

  let err = m.settlement.accept_job(m.agency, job.id).await.unwrap_err();
  assert!(matches!(err, MarketError::JobAlreadyAssigned));
  assert_eq!(err.code(), "JOB_ALREADY_ASSIGNED");

  // The holder accepting again is a plain state error.
  let err = m.settlement.accept_job(rival, job.id).await.unwrap_err();
  assert!(matches!(err, MarketError::JobNotOpen));
  assert_eq!(m.store.snapshot().await.jobs[&job.id].agency_id, Some(rival.id));
}

#[tokio::test]
#[serial]
async fn test_inactive_agency_is_rejected() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;
  m.store
    .with_state(|s| s.agencies.get_mut(&m.agency.id).unwrap().is_active = false)
    .await;

  let err = m.settlement.accept_job(m.agency, job.id).await.unwrap_err();
  assert_eq!(err.code(), "AGENCY_INACTIVE");
  let err = m.settlement.open_jobs_for_agency(m.agency).await.unwrap_err();
  assert_eq!(err.code(), "AGENCY_INACTIVE");
}

#[tokio::test]
#[serial]
async fn test_pickup_and_deliver_move_the_order() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;
  m.settlement.accept_job(m.agency, job.id).await.unwrap();

  let picked = m.settlement.pick_up_job(m.agency, job.id).await.unwrap();
  assert!(picked.picked_up_at.is_some());
  assert_eq!(picked.status, DeliveryJobStatus::Accepted);
  assert_eq!(m.order(job.order_id).await.status, OrderStatus::InTransit);

  let err = m.settlement.pick_up_job(m.agency, job.id).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_JOB_TRANSITION");

  let delivered = m.settlement.deliver_job(m.agency, job.id).await.unwrap();
  assert_eq!(delivered.status, DeliveryJobStatus::Delivered);
  assert!(delivered.delivered_at.is_some());
  assert_eq!(m.order(job.order_id).await.status, OrderStatus::Delivered);

  // Rider orders earn the subtotal only.
  assert_eq!(m.wallet().await.pending_balance, 12_500);

  let state = m.store.snapshot().await;
  let actions: Vec<_> = state.logs_for_job(job.id).iter().map(|l| l.action).collect();
  assert_eq!(
    actions,
    vec![
      JobLogAction::Created,
      JobLogAction::Accepted,
      JobLogAction::PickedUp,
      JobLogAction::Delivered
    ]
  );
}

#[tokio::test]
#[serial]
async fn test_deliver_before_pickup_leaves_job_untouched() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;
  m.settlement.accept_job(m.agency, job.id).await.unwrap();

  // The order is still CONFIRMED, so the agency cannot mark it delivered.
  let err = m.settlement.deliver_job(m.agency, job.id).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_ORDER_TRANSITION");
  assert_eq!(m.store.snapshot().await.jobs[&job.id].status, DeliveryJobStatus::Accepted);
}

#[tokio::test]
#[serial]
async fn test_other_agency_cannot_progress_job() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;
  m.settlement.accept_job(m.agency, job.id).await.unwrap();
  let rival = m.add_agency(&["Douala"]).await;

  let err = m.settlement.pick_up_job(rival, job.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  let err = m
    .settlement
    .update_order_status(rival, job.order_id, OrderStatus::InTransit, None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[serial]
async fn test_cancel_job_by_vendor_and_terminal_guard() {
  let m = Market::new().await;
  let job = confirmed_job(&m).await;

  let cancelled = m
    .settlement
    .cancel_job(m.vendor, job.id, Some("Customer unreachable".into()))
    .await
    .unwrap();
  assert_eq!(cancelled.status, DeliveryJobStatus::Cancelled);
  assert_eq!(cancelled.cancel_reason.as_deref(), Some("Customer unreachable"));
  // The order itself is left alone.
  assert_eq!(m.order(job.order_id).await.status, OrderStatus::Confirmed);

  let err = m.settlement.cancel_job(m.admin, job.id, None).await.unwrap_err();
  assert_eq!(err.code(), "INVALID_JOB_TRANSITION");
  let err = m.settlement.cancel_job(m.agency, job.id, None).await.unwrap_err();
  assert_eq!(err.code(), "FORBIDDEN");
}

#[tokio::test]
#[serial]
async fn test_open_jobs_are_filtered_by_coverage() {
  let m = Market::new().await;
  let douala_job = confirmed_job(&m).await;
  let taken_job = confirmed_job(&m).await;
  m.settlement.accept_job(m.agency, taken_job.id).await.unwrap();
  let bamenda_agency = m.add_agency(&["Bamenda"]).await;

  let jobs = m.settlement.open_jobs_for_agency(m.agency).await.unwrap();
  assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![douala_job.id]);

  let jobs = m.settlement.open_jobs_for_agency(bamenda_agency).await.unwrap();
  assert!(jobs.is_empty());
}
