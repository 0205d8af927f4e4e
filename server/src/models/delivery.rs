// server/src/models/delivery.rs

use super::parse_column;
use chrono::{DateTime, Utc};
use jemo_core::model::DeliveryJob;
use jemo_core::MarketError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct DeliveryJobRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub status: String,
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

impl TryFrom<DeliveryJobRow> for DeliveryJob {
  type Error = MarketError;

  fn try_from(row: DeliveryJobRow) -> Result<Self, Self::Error> {
    Ok(DeliveryJob {
      id: row.id,
      order_id: row.order_id,
      status: parse_column("delivery_jobs.status", &row.status)?,
      pickup_city: row.pickup_city,
      pickup_address: row.pickup_address,
      dropoff_city: row.dropoff_city,
      dropoff_address: row.dropoff_address,
      fee: row.fee,
      agency_id: row.agency_id,
      created_at: row.created_at,
      accepted_at: row.accepted_at,
      picked_up_at: row.picked_up_at,
      delivered_at: row.delivered_at,
      cancelled_at: row.cancelled_at,
      cancel_reason: row.cancel_reason,
    })
  }
}
