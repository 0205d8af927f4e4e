// core/src/rules/delivery.rs

use crate::error::{MarketError, MarketResult};
use crate::model::{DeliveryJob, DeliveryJobStatus};
use uuid::Uuid;

use DeliveryJobStatus::*;

pub fn allowed_job_transitions(current: DeliveryJobStatus) -> &'static [DeliveryJobStatus] {
  match current {
    Open => &[Accepted, Cancelled],
    Accepted => &[Delivered, Cancelled],
    Delivered | Cancelled => &[],
  }
}

pub fn assert_job_transition(job: &DeliveryJob, target: DeliveryJobStatus) -> MarketResult<()> {
  if allowed_job_transitions(job.status).contains(&target) {
    Ok(())
  } else {
    Err(MarketError::InvalidJobTransition {
      current: job.status.to_string(),
      target: target.to_string(),
    })
  }
}

/// First agency wins: the job must be OPEN and unassigned. A job held by
/// another agency means `agency_id` lost the race and is a conflict; any other
/// non-OPEN job (including one this agency already holds) is `JOB_NOT_OPEN`.
pub fn assert_job_acceptable(job: &DeliveryJob, agency_id: Uuid) -> MarketResult<()> {
  match (job.status, job.agency_id) {
    (Open, None) => Ok(()),
    (Open, Some(_)) => Err(MarketError::JobAlreadyAssigned),
    (Accepted, Some(holder)) if holder != agency_id => Err(MarketError::JobAlreadyAssigned),
    _ => Err(MarketError::JobNotOpen),
  }
}
