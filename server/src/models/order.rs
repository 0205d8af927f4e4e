// server/src/models/order.rs

use super::parse_column;
use chrono::{DateTime, Utc};
use jemo_core::model::{Order, OrderItem};
use jemo_core::MarketError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub customer_id: Uuid,
  pub vendor_id: Uuid,
  pub status: String,
  pub delivery_method: String,
  pub delivery_fee: i64,
  pub pickup_city: String,
  pub pickup_address: String,
  pub dropoff_city: String,
  pub dropoff_address: String,
  pub created_at: DateTime<Utc>,
  pub confirmed_at: Option<DateTime<Utc>>,
  pub in_transit_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub cancelled_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub cancel_reason: Option<String>,
  pub cancelled_by: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: i64,
}

impl From<OrderItemRow> for OrderItem {
  fn from(row: OrderItemRow) -> Self {
    OrderItem {
      id: row.id,
      order_id: row.order_id,
      product_id: row.product_id,
      quantity: row.quantity,
      unit_price: row.unit_price,
    }
  }
}

impl OrderRow {
  pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, MarketError> {
    Ok(Order {
      id: self.id,
      customer_id: self.customer_id,
      vendor_id: self.vendor_id,
      status: parse_column("orders.status", &self.status)?,
      delivery_method: parse_column("orders.delivery_method", &self.delivery_method)?,
      delivery_fee: self.delivery_fee,
      pickup_city: self.pickup_city,
      pickup_address: self.pickup_address,
      dropoff_city: self.dropoff_city,
      dropoff_address: self.dropoff_address,
      items: items.into_iter().map(OrderItem::from).collect(),
      created_at: self.created_at,
      confirmed_at: self.confirmed_at,
      in_transit_at: self.in_transit_at,
      delivered_at: self.delivered_at,
      cancelled_at: self.cancelled_at,
      completed_at: self.completed_at,
      cancel_reason: self.cancel_reason,
      cancelled_by: self.cancelled_by,
    })
  }
}
