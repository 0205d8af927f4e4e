// core/src/rules/transitions.rs

//! Role-scoped order state machine.

use crate::error::{MarketError, MarketResult};
use crate::model::{ActorRole, DeliveryMethod, Order, OrderStatus};

use OrderStatus::*;

/// Statuses `role` may move an order to from `current`. Empty when none.
pub fn allowed_order_transitions(role: ActorRole, current: OrderStatus) -> &'static [OrderStatus] {
  match (role, current) {
    (ActorRole::Vendor | ActorRole::Admin, Pending) => &[Confirmed, Cancelled],
    (ActorRole::Vendor | ActorRole::Admin, Confirmed) => &[InTransit, Cancelled],
    (ActorRole::Vendor | ActorRole::Admin, InTransit) => &[Delivered],
    (ActorRole::Admin, Delivered) => &[Completed],
    (ActorRole::Customer, Delivered) => &[Completed],
    (ActorRole::Agency, Confirmed) => &[InTransit],
    (ActorRole::Agency, InTransit) => &[Delivered],
    _ => &[],
  }
}

/// Only orders nobody has started carrying can be cancelled, whoever asks.
pub fn can_cancel_order(status: OrderStatus) -> bool {
  matches!(status, Pending | Confirmed)
}

/// Checks that `role` may move `order` to `target`. The order is not modified.
pub fn assert_order_transition(role: ActorRole, order: &Order, target: OrderStatus) -> MarketResult<()> {
  let current = order.status;

  if target == Cancelled && !can_cancel_order(current) {
    return Err(MarketError::OrderNotCancellable { current });
  }

  if role == ActorRole::Customer && target == Completed && current != Delivered {
    let message = match order.delivery_method {
      DeliveryMethod::VendorDelivery => {
        "You can only confirm receipt once the vendor has marked the order as delivered."
      }
      DeliveryMethod::JemoRider => "You can only confirm receipt once the rider has delivered the order.",
    };
    return Err(MarketError::InvalidReceivedTransition {
      current,
      message: message.to_string(),
    });
  }

  if role == ActorRole::Vendor
    && order.delivery_method == DeliveryMethod::JemoRider
    && matches!(target, InTransit | Delivered)
  {
    return Err(MarketError::DeliveryManagedByAgency { target });
  }

  let allowed = allowed_order_transitions(role, current);
  if !allowed.contains(&target) {
    return Err(MarketError::InvalidOrderTransition {
      actor: role,
      current,
      target,
      allowed: allowed.to_vec(),
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use uuid::Uuid;

  fn order(status: OrderStatus, method: DeliveryMethod) -> Order {
    Order {
      id: Uuid::new_v4(),
      customer_id: Uuid::new_v4(),
      vendor_id: Uuid::new_v4(),
      status,
      delivery_method: method,
      delivery_fee: 1500,
      pickup_city: "Douala".into(),
      pickup_address: "Akwa".into(),
      dropoff_city: "Douala".into(),
      dropoff_address: "Bonapriso".into(),
      items: vec![],
      created_at: Utc::now(),
      confirmed_at: None,
      in_transit_at: None,
      delivered_at: None,
      cancelled_at: None,
      completed_at: None,
      cancel_reason: None,
      cancelled_by: None,
    }
  }

  #[test]
  fn tables_per_role() {
    assert_eq!(allowed_order_transitions(ActorRole::Vendor, Pending), &[Confirmed, Cancelled]);
    assert_eq!(allowed_order_transitions(ActorRole::Vendor, Delivered), &[] as &[OrderStatus]);
    assert_eq!(allowed_order_transitions(ActorRole::Admin, Delivered), &[Completed]);
    assert_eq!(allowed_order_transitions(ActorRole::Customer, Delivered), &[Completed]);
    assert_eq!(allowed_order_transitions(ActorRole::Customer, Pending), &[] as &[OrderStatus]);
    assert_eq!(allowed_order_transitions(ActorRole::Agency, Confirmed), &[InTransit]);
    assert!(allowed_order_transitions(ActorRole::System, Pending).is_empty());
  }

  #[test]
  fn every_miss_is_rejected_with_allowed_set() {
    for role in [ActorRole::Vendor, ActorRole::Customer, ActorRole::Agency, ActorRole::Admin] {
      for current in OrderStatus::ALL {
        for target in OrderStatus::ALL {
          let o = order(*current, DeliveryMethod::VendorDelivery);
          let result = assert_order_transition(role, &o, *target);
          if allowed_order_transitions(role, *current).contains(target) {
            assert!(result.is_ok(), "{role} {current}->{target} should pass");
          } else {
            assert!(result.is_err(), "{role} {current}->{target} should fail");
          }
        }
      }
    }

    let err = assert_order_transition(ActorRole::Vendor, &order(InTransit, DeliveryMethod::VendorDelivery), Pending)
      .unwrap_err();
    assert_eq!(err.code(), "INVALID_ORDER_TRANSITION");
    assert_eq!(err.details()["allowed"], serde_json::json!(["DELIVERED"]));
    assert_eq!(err.details()["actor"], "vendor");
  }

  #[test]
  fn cancellation_is_checked_before_the_table() {
    for current in [InTransit, Delivered, Completed, Cancelled] {
      let err = assert_order_transition(ActorRole::Admin, &order(current, DeliveryMethod::JemoRider), Cancelled)
        .unwrap_err();
      assert_eq!(err.code(), "ORDER_NOT_CANCELLABLE");
    }
    let err = assert_order_transition(ActorRole::Customer, &order(Pending, DeliveryMethod::JemoRider), Cancelled)
      .unwrap_err();
    assert_eq!(err.code(), "INVALID_ORDER_TRANSITION");
  }

  #[test]
  fn premature_receipt_message_depends_on_delivery_method() {
    let vendor = assert_order_transition(ActorRole::Customer, &order(InTransit, DeliveryMethod::VendorDelivery), Completed)
      .unwrap_err();
    let rider = assert_order_transition(ActorRole::Customer, &order(Confirmed, DeliveryMethod::JemoRider), Completed)
      .unwrap_err();
    assert_eq!(vendor.code(), "INVALID_RECEIVED_TRANSITION");
    assert_eq!(rider.code(), "INVALID_RECEIVED_TRANSITION");
    assert!(vendor.to_string().contains("vendor"));
    assert!(rider.to_string().contains("rider"));
  }

  #[test]
  fn vendor_cannot_drive_agency_delivery() {
    let err = assert_order_transition(ActorRole::Vendor, &order(Confirmed, DeliveryMethod::JemoRider), InTransit)
      .unwrap_err();
    assert_eq!(err.code(), "DELIVERY_MANAGED_BY_AGENCY");
    assert!(assert_order_transition(ActorRole::Admin, &order(Confirmed, DeliveryMethod::JemoRider), InTransit).is_ok());
  }
}
