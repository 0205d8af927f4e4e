// core/src/settlement/common_steps.rs

use super::contexts::FlowCtx;
use crate::error::{MarketError, MarketResult};
use crate::flow::{ContextData, StepControl};
use crate::model::ActorRole;
use crate::rules::access::assert_account_access;
use tracing::{instrument, warn};

/// First step of every flow: the actor's role must be allowed to run the
/// operation and its vendor/agency account must pass the access gate.
#[instrument(name = "common_step::ensure_actor_access", skip(ctx_data), err(Display))]
pub async fn ensure_actor_access<C: FlowCtx>(ctx_data: ContextData<C>) -> MarketResult<StepControl> {
  let (actor, operation, permitted, store) = {
    let guard = ctx_data.read();
    (
      guard.actor(),
      guard.operation(),
      guard.permitted_roles(),
      guard.deps().store.clone(),
    )
  };

  if !permitted.contains(&actor.role) {
    warn!(actor_id = %actor.id, role = %actor.role, operation, "Role not permitted.");
    return Err(MarketError::Forbidden(format!("{} accounts cannot {}", actor.role, operation)));
  }

  if matches!(actor.role, ActorRole::Vendor | ActorRole::Agency) {
    let mut tx = store.begin().await?;
    let vendor = match actor.role {
      ActorRole::Vendor => tx.vendor_account(actor.id).await?,
      _ => None,
    };
    let agency = match actor.role {
      ActorRole::Agency => tx.agency_account(actor.id).await?,
      _ => None,
    };
    assert_account_access(&actor, vendor.as_ref(), agency.as_ref())?;
  }
  Ok(StepControl::Continue)
}
