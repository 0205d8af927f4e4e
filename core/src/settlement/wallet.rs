// core/src/settlement/wallet.rs

//! Wallet administration: withdrawal lock, wallet view and payout profiles.

use super::common_steps::ensure_actor_access;
use super::contexts::{LockAction, PayoutProfileCtx, WalletViewCtx, WithdrawalLockCtx};
use crate::error::{MarketError, MarketResult};
use crate::flow::{ContextData, Flow, FlowRegistry, StepControl};
use crate::model::{ActorRole, VendorPayoutProfile, VendorWallet};
use crate::rules::phone::normalize_phone;
use chrono::Utc;
use tracing::info;

const MAX_LEGAL_NAME_CHARS: usize = 120;

async fn change_lock(ctx_data: ContextData<WithdrawalLockCtx>) -> MarketResult<StepControl> {
  let (store, admin_id, vendor_id, action, reason) = {
    let guard = ctx_data.read();
    (
      guard.deps.store.clone(),
      guard.actor.id,
      guard.vendor_id,
      guard.action,
      guard.reason.as_deref().map(str::trim).unwrap_or_default().to_string(),
    )
  };
  if action == LockAction::Lock && reason.is_empty() {
    return Err(MarketError::Validation("a reason is required to lock withdrawals".to_string()));
  }

  let now = Utc::now();
  let mut tx = store.begin().await?;
  let mut wallet = tx.ensure_wallet(vendor_id, now).await?;
  match action {
    LockAction::Lock => {
      if wallet.withdrawals_locked {
        return Err(MarketError::WalletAlreadyLocked);
      }
      wallet.withdrawals_locked = true;
      wallet.lock_reason = Some(reason);
      wallet.locked_at = Some(now);
      wallet.locked_by_id = Some(admin_id);
    }
    LockAction::Unlock => {
      if !wallet.withdrawals_locked {
        return Err(MarketError::WalletNotLocked);
      }
      wallet.withdrawals_locked = false;
      wallet.lock_reason = None;
      wallet.locked_at = None;
      wallet.locked_by_id = None;
    }
  }
  wallet.updated_at = now;
  tx.save_wallet(&wallet).await?;
  tx.commit().await?;

  info!(vendor_id = %vendor_id, admin_id = %admin_id, ?action, "Withdrawal lock changed.");
  ctx_data.write().wallet = Some(wallet);
  Ok(StepControl::Continue)
}

async fn read_wallet(ctx_data: ContextData<WalletViewCtx>) -> MarketResult<StepControl> {
  let (store, actor, vendor_id) = {
    let guard = ctx_data.read();
    (guard.deps.store.clone(), guard.actor, guard.vendor_id)
  };
  if actor.role == ActorRole::Vendor && actor.id != vendor_id {
    return Err(MarketError::Forbidden("vendors can only view their own wallet".to_string()));
  }
  let mut tx = store.begin().await?;
  let wallet = tx
    .load_wallet(vendor_id)
    .await?
    .unwrap_or_else(|| VendorWallet::open(vendor_id, Utc::now()));
  ctx_data.write().wallet = Some(wallet);
  Ok(StepControl::Continue)
}

async fn save_profile(ctx_data: ContextData<PayoutProfileCtx>) -> MarketResult<StepControl> {
  let (store, vendor_id, method, phone, legal_name) = {
    let guard = ctx_data.read();
    (
      guard.deps.store.clone(),
      guard.actor.id,
      guard.method,
      guard.phone.clone(),
      guard.legal_name.trim().to_string(),
    )
  };
  if legal_name.is_empty() {
    return Err(MarketError::Validation("legal name is required".to_string()));
  }
  if legal_name.chars().count() > MAX_LEGAL_NAME_CHARS {
    return Err(MarketError::Validation(format!(
      "legal name must be at most {} characters",
      MAX_LEGAL_NAME_CHARS
    )));
  }
  let phone = normalize_phone(&phone, method)?;

  let profile = VendorPayoutProfile {
    vendor_id,
    method,
    phone,
    legal_name,
    updated_at: Utc::now(),
  };
  let mut tx = store.begin().await?;
  tx.save_payout_profile(&profile).await?;
  tx.commit().await?;

  info!(vendor_id = %vendor_id, method = %method, "Payout profile saved.");
  ctx_data.write().profile = Some(profile);
  Ok(StepControl::Continue)
}

pub fn register_wallet_flows(registry: &FlowRegistry<MarketError>) {
  let mut lock =
    Flow::<WithdrawalLockCtx, MarketError>::new(&[("ensure_access", false, None), ("change_lock", false, None)]);
  lock.on_step("ensure_access", ensure_actor_access::<WithdrawalLockCtx>);
  lock.on_step("change_lock", change_lock);
  registry.register_flow(lock);

  let mut view = Flow::<WalletViewCtx, MarketError>::new(&[("ensure_access", false, None), ("read", false, None)]);
  view.on_step("ensure_access", ensure_actor_access::<WalletViewCtx>);
  view.on_step("read", read_wallet);
  registry.register_flow(view);

  let mut profile =
    Flow::<PayoutProfileCtx, MarketError>::new(&[("ensure_access", false, None), ("save_profile", false, None)]);
  profile.on_step("ensure_access", ensure_actor_access::<PayoutProfileCtx>);
  profile.on_step("save_profile", save_profile);
  registry.register_flow(profile);
}
