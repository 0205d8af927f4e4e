// core/src/model/actor.rs

use super::text_enum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is asking. Maps onto the `/customer`, `/vendor`, `/agency` and
/// `/admin` API prefixes; `System` is reserved for provider callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
  Customer,
  Vendor,
  Agency,
  Admin,
  System,
}

text_enum!(ActorRole {
  Customer => "customer",
  Vendor => "vendor",
  Agency => "agency",
  Admin => "admin",
  System => "system",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id: Uuid,
  pub role: ActorRole,
}

impl Actor {
  pub fn new(id: Uuid, role: ActorRole) -> Self {
    Self { id, role }
  }

  pub fn admin(id: Uuid) -> Self {
    Self::new(id, ActorRole::Admin)
  }

  pub fn vendor(id: Uuid) -> Self {
    Self::new(id, ActorRole::Vendor)
  }

  pub fn customer(id: Uuid) -> Self {
    Self::new(id, ActorRole::Customer)
  }

  /// Agencies act under their agency record id.
  pub fn agency(id: Uuid) -> Self {
    Self::new(id, ActorRole::Agency)
  }

  pub fn system() -> Self {
    Self::new(Uuid::nil(), ActorRole::System)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
  Pending,
  Approved,
  Rejected,
}

text_enum!(KycStatus {
  Pending => "PENDING",
  Approved => "APPROVED",
  Rejected => "REJECTED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorAccount {
  pub id: Uuid,
  pub kyc_status: KycStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyAccount {
  pub id: Uuid,
  pub name: String,
  pub is_active: bool,
  pub cities_covered: Vec<String>,
}
