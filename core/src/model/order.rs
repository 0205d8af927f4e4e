// core/src/model/order.rs

use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  InTransit,
  Delivered,
  Completed,
  Cancelled,
}

text_enum!(OrderStatus {
  Pending => "PENDING",
  Confirmed => "CONFIRMED",
  InTransit => "IN_TRANSIT",
  Delivered => "DELIVERED",
  Completed => "COMPLETED",
  Cancelled => "CANCELLED",
});

/// `JemoRider` orders are carried by a delivery agency through a `DeliveryJob`;
/// `VendorDelivery` orders are carried by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
  VendorDelivery,
  JemoRider,
}

text_enum!(DeliveryMethod {
  VendorDelivery => "VENDOR_DELIVERY",
  JemoRider => "JEMO_RIDER",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: i64,
}

impl OrderItem {
  pub fn line_total(&self) -> i64 {
    self.unit_price * i64::from(self.quantity)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub vendor_id: Uuid,
  pub name: String,
  pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub customer_id: Uuid,
  pub vendor_id: Uuid,
  pub status: OrderStatus,
  pub delivery_method: DeliveryMethod,
  pub delivery_fee: i64,
  pub pickup_city: String,
  pub pickup_address: String,
  pub dropoff_city: String,
  pub dropoff_address: String,
  pub items: Vec<OrderItem>,
  pub created_at: DateTime<Utc>,
  pub confirmed_at: Option<DateTime<Utc>>,
  pub in_transit_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub cancelled_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub cancel_reason: Option<String>,
  pub cancelled_by: Option<Uuid>,
}

impl Order {
  /// Sum of the item lines, delivery fee excluded.
  pub fn subtotal(&self) -> i64 {
    self.items.iter().map(OrderItem::line_total).sum()
  }

  /// Moves the order to `status` and stamps the matching timestamp.
  pub fn stamp(&mut self, status: OrderStatus, at: DateTime<Utc>) {
    self.status = status;
    match status {
      OrderStatus::Pending => {}
      OrderStatus::Confirmed => self.confirmed_at = Some(at),
      OrderStatus::InTransit => self.in_transit_at = Some(at),
      OrderStatus::Delivered => self.delivered_at = Some(at),
      OrderStatus::Completed => self.completed_at = Some(at),
      OrderStatus::Cancelled => self.cancelled_at = Some(at),
    }
  }
}
