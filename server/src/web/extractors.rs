// server/src/web/extractors.rs

//! Caller identity from the `X-Actor-Id` / `X-Actor-Role` headers.
//!
//! Sessions and tokens are handled upstream of this service; by the time a
//! request reaches us the gateway has already stamped who is calling.

use crate::errors::AppError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use jemo_core::model::{Actor, ActorRole};
use jemo_core::MarketError;
use tracing::warn;
use uuid::Uuid;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Reads the caller from the headers. `system` cannot be claimed over HTTP.
pub fn actor_from_request(req: &HttpRequest) -> Result<Actor, AppError> {
  let id = header(req, ACTOR_ID_HEADER)
    .and_then(|v| Uuid::parse_str(v).ok())
    .ok_or_else(|| {
      warn!("Missing or invalid {} header.", ACTOR_ID_HEADER);
      AppError::Auth(format!("Missing or invalid {} header", ACTOR_ID_HEADER))
    })?;
  let role = match header(req, ACTOR_ROLE_HEADER).map(str::to_ascii_lowercase).as_deref() {
    Some("customer") => ActorRole::Customer,
    Some("vendor") => ActorRole::Vendor,
    Some("agency") => ActorRole::Agency,
    Some("admin") => ActorRole::Admin,
    _ => {
      warn!("Missing or invalid {} header.", ACTOR_ROLE_HEADER);
      return Err(AppError::Auth(format!("Missing or invalid {} header", ACTOR_ROLE_HEADER)));
    }
  };
  Ok(Actor::new(id, role))
}

fn require_role(req: &HttpRequest, role: ActorRole) -> Result<Actor, AppError> {
  let actor = actor_from_request(req)?;
  if actor.role != role {
    warn!(actor_id = %actor.id, actual = %actor.role, expected = %role, "Role does not match route scope.");
    return Err(AppError::Market(MarketError::Forbidden(format!(
      "this endpoint is reserved for {} accounts",
      role
    ))));
  }
  Ok(actor)
}

macro_rules! role_extractor {
  ($(#[$doc:meta])* $name:ident, $role:ident) => {
    $(#[$doc])*
    #[derive(Debug, Clone, Copy)]
    pub struct $name(pub Actor);

    impl FromRequest for $name {
      type Error = AppError;
      type Future = Ready<Result<Self, Self::Error>>;

      fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(require_role(req, ActorRole::$role).map($name))
      }
    }
  };
}

role_extractor!(CustomerActor, Customer);
role_extractor!(
  /// A vendor acting on its own orders, wallet and payout profile.
  VendorActor,
  Vendor
);
role_extractor!(AgencyActor, Agency);
role_extractor!(AdminActor, Admin);
