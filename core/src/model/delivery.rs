// core/src/model/delivery.rs

use super::text_enum;
use super::{Actor, ActorRole, Order};
use crate::rules::city::normalize_city;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryJobStatus {
  Open,
  Accepted,
  Delivered,
  Cancelled,
}

text_enum!(DeliveryJobStatus {
  Open => "OPEN",
  Accepted => "ACCEPTED",
  Delivered => "DELIVERED",
  Cancelled => "CANCELLED",
});

/// The assignment offered to delivery agencies for a `JEMO_RIDER` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryJob {
  pub id: Uuid,
  pub order_id: Uuid,
  pub status: DeliveryJobStatus,
  pub pickup_city: String,
  pub pickup_address: String,
  pub dropoff_city: String,
  pub dropoff_address: String,
  pub fee: i64,
  pub agency_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub accepted_at: Option<DateTime<Utc>>,
  pub picked_up_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub cancelled_at: Option<DateTime<Utc>>,
  pub cancel_reason: Option<String>,
}

impl DeliveryJob {
  /// Builds the OPEN job for a freshly confirmed order. City names are
  /// normalised so they compare equal to an agency's `cities_covered`.
  pub fn open_for(order: &Order, at: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      order_id: order.id,
      status: DeliveryJobStatus::Open,
      pickup_city: normalize_city(&order.pickup_city),
      pickup_address: order.pickup_address.trim().to_string(),
      dropoff_city: normalize_city(&order.dropoff_city),
      dropoff_address: order.dropoff_address.trim().to_string(),
      fee: order.delivery_fee,
      agency_id: None,
      created_at: at,
      accepted_at: None,
      picked_up_at: None,
      delivered_at: None,
      cancelled_at: None,
      cancel_reason: None,
    }
  }

  pub fn cancel(&mut self, at: DateTime<Utc>, reason: Option<String>) {
    self.status = DeliveryJobStatus::Cancelled;
    self.cancelled_at = Some(at);
    self.cancel_reason = reason;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLogAction {
  Created,
  Accepted,
  PickedUp,
  Delivered,
  Cancelled,
}

text_enum!(JobLogAction {
  Created => "CREATED",
  Accepted => "ACCEPTED",
  PickedUp => "PICKED_UP",
  Delivered => "DELIVERED",
  Cancelled => "CANCELLED",
});

/// Append-only audit entry. Rows are written once and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryJobLog {
  pub id: Uuid,
  pub job_id: Uuid,
  pub action: JobLogAction,
  pub actor_id: Option<Uuid>,
  pub actor_role: Option<ActorRole>,
  pub previous_status: Option<DeliveryJobStatus>,
  pub new_status: DeliveryJobStatus,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl DeliveryJobLog {
  pub fn record(
    job: &DeliveryJob,
    action: JobLogAction,
    actor: Option<&Actor>,
    previous_status: Option<DeliveryJobStatus>,
    note: Option<String>,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      job_id: job.id,
      action,
      actor_id: actor.map(|a| a.id),
      actor_role: actor.map(|a| a.role),
      previous_status,
      new_status: job.status,
      note,
      created_at: at,
    }
  }
}
