// core/src/settlement/payouts.rs

//! Payout sagas.
//!
//! Withdrawal and admin retry share the same shape:
//!
//! 1. `validate`: read-only precondition checks, nothing is written.
//! 2. `reserve`: first transaction. The payout is REQUESTED and a PENDING debit
//!    is recorded; the balance is not touched yet.
//! 3. `initiate`: the provider call, outside any transaction. Pivot step.
//! 4. `confirm`: second transaction. The payout goes PROCESSING, the debit is
//!    POSTED and the available balance is decremented.
//!
//! If `initiate` fails, the compensation registered on `reserve` marks the
//! payout FAILED and the debit CANCELLED, leaving the wallet as it was.

use super::common_steps::ensure_actor_access;
use super::contexts::{DisbursementCtx, PayoutLookup, RetryPayoutCtx, SyncPayoutCtx, WithdrawalCtx};
use super::SettlementConfig;
use crate::error::{MarketError, MarketResult};
use crate::flow::{ContextData, Flow, FlowRegistry, SkipCondition, StepControl};
use crate::model::{
  Payout, PayoutStatus, VendorPayoutProfile, VendorWallet, WalletTransaction, WalletTxStatus, WalletTxType,
};
use crate::provider::{PayoutInstruction, TransferState};
use crate::store::StoreTx;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Balance and lock checks shared by withdrawals and retries.
fn ensure_withdrawable(wallet: &VendorWallet, amount: i64) -> MarketResult<()> {
  if wallet.available_balance < amount {
    return Err(MarketError::InsufficientBalance {
      available: wallet.available_balance,
      requested: amount,
    });
  }
  if wallet.withdrawals_locked {
    return Err(MarketError::WithdrawalsLocked {
      reason: wallet.lock_reason.clone(),
    });
  }
  Ok(())
}

async fn check_withdrawal(
  tx: &mut dyn StoreTx,
  config: &SettlementConfig,
  vendor_id: Uuid,
  amount: i64,
) -> MarketResult<(VendorPayoutProfile, VendorWallet)> {
  if amount <= 0 {
    return Err(MarketError::Validation("withdrawal amount must be positive".to_string()));
  }
  let profile = tx
    .payout_profile(vendor_id)
    .await?
    .ok_or_else(|| MarketError::Validation("set up a payout profile before requesting a withdrawal".to_string()))?;
  if amount < config.min_withdrawal {
    return Err(MarketError::Validation(format!(
      "minimum withdrawal is {} {}",
      config.min_withdrawal, config.currency
    )));
  }
  // Wallet row first: it is the lock that serialises concurrent withdrawals.
  let wallet = tx.ensure_wallet(vendor_id, Utc::now()).await?;
  if let Some(in_flight) = tx.in_flight_payout(vendor_id).await? {
    return Err(MarketError::PayoutInFlight { payout_id: in_flight.id });
  }
  ensure_withdrawable(&wallet, amount)?;
  Ok((profile, wallet))
}

async fn check_retry(tx: &mut dyn StoreTx, payout_id: Uuid) -> MarketResult<(Payout, VendorWallet)> {
  let payout = tx
    .load_payout(payout_id)
    .await?
    .ok_or_else(|| MarketError::not_found("payout", payout_id))?;
  if payout.status != PayoutStatus::Failed {
    return Err(MarketError::PayoutNotRetryable {
      current: payout.status.to_string(),
    });
  }
  let wallet = tx.ensure_wallet(payout.vendor_id, Utc::now()).await?;
  ensure_withdrawable(&wallet, payout.amount)?;
  Ok((payout, wallet))
}

// --- Withdrawal ---

async fn validate_withdrawal(ctx_data: ContextData<WithdrawalCtx>) -> MarketResult<StepControl> {
  let (deps, vendor_id, amount) = {
    let guard = ctx_data.read();
    (guard.deps.clone(), guard.actor.id, guard.amount)
  };
  let mut tx = deps.store.begin().await?;
  check_withdrawal(tx.as_mut(), &deps.config, vendor_id, amount).await?;
  Ok(StepControl::Continue)
}

async fn reserve_withdrawal(ctx_data: ContextData<WithdrawalCtx>) -> MarketResult<StepControl> {
  let (deps, vendor_id, amount) = {
    let guard = ctx_data.read();
    (guard.deps.clone(), guard.actor.id, guard.amount)
  };
  let now = Utc::now();
  let mut tx = deps.store.begin().await?;
  let (profile, wallet) = check_withdrawal(tx.as_mut(), &deps.config, vendor_id, amount).await?;

  let payout = Payout {
    id: Uuid::new_v4(),
    vendor_id,
    wallet_id: wallet.id,
    amount,
    method: profile.method,
    destination_phone: profile.phone,
    beneficiary_name: profile.legal_name,
    app_transaction_ref: Payout::new_app_reference(),
    provider_ref: None,
    provider_raw: None,
    failure_reason: None,
    status: PayoutStatus::Requested,
    requested_at: now,
    processed_at: None,
    completed_at: None,
    failed_at: None,
    updated_at: now,
  };
  tx.insert_payout(&payout).await?;
  let debit = WalletTransaction::new(
    &wallet,
    WalletTxType::PayoutDebit,
    WalletTxStatus::Pending,
    amount,
    "Withdrawal request",
    now,
  )
  .for_payout(payout.id);
  tx.insert_wallet_tx(&debit).await?;
  tx.commit().await?;

  info!(payout_id = %payout.id, reference = %payout.app_transaction_ref, amount, "Withdrawal reserved.");
  {
    let mut guard = ctx_data.write();
    guard.disbursement.payout = Some(payout);
    guard.disbursement.debit_tx_id = Some(debit.id);
  }
  Ok(StepControl::Continue)
}

// --- Retry ---

async fn validate_retry(ctx_data: ContextData<RetryPayoutCtx>) -> MarketResult<StepControl> {
  let (store, payout_id) = {
    let guard = ctx_data.read();
    (guard.deps.store.clone(), guard.payout_id)
  };
  let mut tx = store.begin().await?;
  check_retry(tx.as_mut(), payout_id).await?;
  Ok(StepControl::Continue)
}

async fn reserve_retry(ctx_data: ContextData<RetryPayoutCtx>) -> MarketResult<StepControl> {
  let (store, admin_id, payout_id) = {
    let guard = ctx_data.read();
    (guard.deps.store.clone(), guard.actor.id, guard.payout_id)
  };
  let now = Utc::now();
  let mut tx = store.begin().await?;
  let (mut payout, wallet) = check_retry(tx.as_mut(), payout_id).await?;

  let previous_ref = payout.app_transaction_ref.clone();
  payout.reset_for_retry(now);
  tx.save_payout(&payout).await?;
  let debit = WalletTransaction::new(
    &wallet,
    WalletTxType::PayoutDebit,
    WalletTxStatus::Pending,
    payout.amount,
    format!("Retry: Admin {}", admin_id),
    now,
  )
  .for_payout(payout.id);
  tx.insert_wallet_tx(&debit).await?;
  tx.commit().await?;

  info!(
    payout_id = %payout.id,
    previous_reference = %previous_ref,
    reference = %payout.app_transaction_ref,
    "Payout retry reserved."
  );
  {
    let mut guard = ctx_data.write();
    guard.disbursement.payout = Some(payout);
    guard.disbursement.debit_tx_id = Some(debit.id);
  }
  Ok(StepControl::Continue)
}

// --- Shared saga steps ---

fn reserved_payout<C: DisbursementCtx>(ctx: &C) -> MarketResult<Payout> {
  ctx
    .disbursement()
    .payout
    .clone()
    .ok_or_else(|| MarketError::Internal("payout step ran before reservation".to_string()))
}

#[instrument(name = "payout_step::initiate", skip(ctx_data), err(Display))]
async fn initiate_payout<C: DisbursementCtx>(ctx_data: ContextData<C>) -> MarketResult<StepControl> {
  let (provider, currency, payout) = {
    let guard = ctx_data.read();
    (
      guard.deps().provider.clone(),
      guard.deps().config.currency.clone(),
      reserved_payout(&*guard)?,
    )
  };
  let instruction = PayoutInstruction::for_payout(&payout, &currency);

  match provider.initiate_payout(&instruction).await {
    Ok(reply) if reply.parsed.is_accepted() => {
      info!(payout_id = %payout.id, provider_ref = ?reply.parsed.transaction_id(), "Provider accepted payout.");
      ctx_data.write().disbursement_mut().reply = Some(reply);
      Ok(StepControl::Continue)
    }
    Ok(reply) => {
      let description = reply.parsed.describe();
      warn!(payout_id = %payout.id, %description, "Provider rejected payout.");
      let err = MarketError::ProviderRejected {
        message: description.clone(),
        raw: Some(reply.raw.clone()),
      };
      {
        let mut guard = ctx_data.write();
        let disbursement = guard.disbursement_mut();
        disbursement.failure_reason = Some(format!("Provider rejected payout: {}", description));
        disbursement.reply = Some(reply);
      }
      Err(err)
    }
    Err(e) => {
      warn!(payout_id = %payout.id, error = %e, "Provider call failed.");
      ctx_data.write().disbursement_mut().failure_reason = Some(format!("Provider call failed: {}", e));
      Err(e)
    }
  }
}

/// Undo of `reserve`: payout back to FAILED, pending debit CANCELLED.
async fn release_reservation<C: DisbursementCtx>(ctx_data: ContextData<C>) -> MarketResult<()> {
  let (store, payout_id, debit_tx_id, reason, raw) = {
    let guard = ctx_data.read();
    let disbursement = guard.disbursement();
    (
      guard.deps().store.clone(),
      disbursement.payout.as_ref().map(|p| p.id),
      disbursement.debit_tx_id,
      disbursement.failure_reason.clone(),
      disbursement.reply.as_ref().map(|r| r.raw.clone()),
    )
  };
  let Some(payout_id) = payout_id else {
    return Ok(());
  };
  let now = Utc::now();
  let mut tx = store.begin().await?;

  let mut payout = tx
    .load_payout(payout_id)
    .await?
    .ok_or_else(|| MarketError::not_found("payout", payout_id))?;
  payout.mark_failed(reason.unwrap_or_else(|| "Payout initiation failed".to_string()), now);
  if raw.is_some() {
    payout.provider_raw = raw;
  }
  tx.save_payout(&payout).await?;

  if let Some(debit_tx_id) = debit_tx_id {
    if let Some(mut debit) = tx.load_wallet_tx(debit_tx_id).await? {
      debit.status = WalletTxStatus::Cancelled;
      debit.updated_at = now;
      tx.save_wallet_tx(&debit).await?;
    }
  }
  tx.commit().await?;

  info!(payout_id = %payout_id, "Payout reservation released.");
  ctx_data.write().disbursement_mut().payout = Some(payout);
  Ok(())
}

async fn confirm_payout<C: DisbursementCtx>(ctx_data: ContextData<C>) -> MarketResult<StepControl> {
  let (store, payout_id, debit_tx_id, reply) = {
    let guard = ctx_data.read();
    let disbursement = guard.disbursement();
    (
      guard.deps().store.clone(),
      reserved_payout(&*guard)?.id,
      disbursement.debit_tx_id,
      disbursement.reply.clone(),
    )
  };
  let reply = reply.ok_or_else(|| MarketError::Internal("confirm ran without a provider reply".to_string()))?;
  let now = Utc::now();
  let mut tx = store.begin().await?;

  let mut payout = tx
    .load_payout(payout_id)
    .await?
    .ok_or_else(|| MarketError::not_found("payout", payout_id))?;
  payout.status = PayoutStatus::Processing;
  payout.processed_at = Some(now);
  payout.provider_ref = reply.parsed.transaction_id().map(str::to_string);
  payout.provider_raw = Some(reply.raw);
  payout.updated_at = now;
  tx.save_payout(&payout).await?;

  if let Some(debit_tx_id) = debit_tx_id {
    let mut debit = tx
      .load_wallet_tx(debit_tx_id)
      .await?
      .ok_or_else(|| MarketError::not_found("wallet transaction", debit_tx_id))?;
    debit.status = WalletTxStatus::Posted;
    debit.updated_at = now;
    tx.save_wallet_tx(&debit).await?;
  }

  let mut wallet = tx.ensure_wallet(payout.vendor_id, now).await?;
  wallet.available_balance -= payout.amount;
  wallet.updated_at = now;
  if wallet.available_balance < 0 {
    warn!(vendor_id = %wallet.vendor_id, available = wallet.available_balance, "Available balance went negative.");
  }
  tx.save_wallet(&wallet).await?;
  tx.commit().await?;

  info!(payout_id = %payout.id, amount = payout.amount, "Payout processing, wallet debited.");
  ctx_data.write().disbursement_mut().payout = Some(payout);
  Ok(StepControl::Continue)
}

const SAGA_STEPS: [&str; 5] = ["ensure_access", "validate", "reserve", "initiate", "confirm"];

fn saga_flow<C: DisbursementCtx>() -> Flow<C, MarketError> {
  let defs: Vec<(&str, bool, Option<SkipCondition<C>>)> = SAGA_STEPS.iter().map(|name| (*name, false, None)).collect();
  let mut flow = Flow::<C, MarketError>::new(&defs);
  flow.on_step("ensure_access", ensure_actor_access::<C>);
  flow.on_step("initiate", initiate_payout::<C>);
  flow.on_step("confirm", confirm_payout::<C>);
  flow.compensate_with("reserve", release_reservation::<C>);
  flow.mark_pivot("initiate");
  flow
}

// --- Reconciliation ---

async fn load_for_sync(ctx_data: ContextData<SyncPayoutCtx>) -> MarketResult<StepControl> {
  let (store, lookup) = {
    let guard = ctx_data.read();
    (guard.deps.store.clone(), guard.lookup.clone())
  };
  let mut tx = store.begin().await?;
  let payout = match &lookup {
    PayoutLookup::Id(id) => tx.load_payout(*id).await?,
    PayoutLookup::Reference(reference) => tx.payout_by_reference(reference).await?,
  };
  let payout = payout.ok_or_else(|| match lookup {
    PayoutLookup::Id(id) => MarketError::not_found("payout", id),
    PayoutLookup::Reference(reference) => MarketError::not_found("payout", reference),
  })?;

  let processing = payout.status == PayoutStatus::Processing;
  if !processing {
    info!(payout_id = %payout.id, status = %payout.status, "Payout not processing, nothing to reconcile.");
  }
  ctx_data.write().payout = Some(payout);
  Ok(if processing {
    StepControl::Continue
  } else {
    StepControl::Stop
  })
}

async fn verify_with_provider(ctx_data: ContextData<SyncPayoutCtx>) -> MarketResult<StepControl> {
  let (provider, reference) = {
    let guard = ctx_data.read();
    let reference = guard.payout.as_ref().map(|p| p.app_transaction_ref.clone());
    (guard.deps.provider.clone(), reference)
  };
  let reference = reference.ok_or_else(|| MarketError::Internal("verify ran before load".to_string()))?;
  let reply = provider.verify_payout(&reference).await?;
  let state = reply.parsed.transfer_state();
  info!(reference = %reference, ?state, "Provider reported transfer state.");
  {
    let mut guard = ctx_data.write();
    guard.state = Some(state);
    guard.reply = Some(reply);
  }
  Ok(StepControl::Continue)
}

async fn apply_transfer_state(ctx_data: ContextData<SyncPayoutCtx>) -> MarketResult<StepControl> {
  let (store, payout_id, state, reply) = {
    let guard = ctx_data.read();
    (
      guard.deps.store.clone(),
      guard.payout.as_ref().map(|p| p.id),
      guard.state.or(guard.reported),
      guard.reply.clone(),
    )
  };
  let payout_id = payout_id.ok_or_else(|| MarketError::Internal("apply ran before load".to_string()))?;
  let state = state.unwrap_or(TransferState::Pending);
  if state == TransferState::Pending {
    return Ok(StepControl::Continue);
  }

  let now = Utc::now();
  let mut tx = store.begin().await?;
  let mut payout = tx
    .load_payout(payout_id)
    .await?
    .ok_or_else(|| MarketError::not_found("payout", payout_id))?;
  if payout.status != PayoutStatus::Processing {
    ctx_data.write().payout = Some(payout);
    return Ok(StepControl::Continue);
  }
  if let Some(reply) = &reply {
    payout.provider_raw = Some(reply.raw.clone());
  }

  match state {
    TransferState::Successful => {
      payout.status = PayoutStatus::Success;
      payout.completed_at = Some(now);
      payout.updated_at = now;
      tx.save_payout(&payout).await?;
      info!(payout_id = %payout.id, "Payout settled.");
    }
    TransferState::Failed => {
      let reason = match &reply {
        Some(reply) => format!("Provider reported failure: {}", reply.parsed.describe()),
        None => "Provider reported failure".to_string(),
      };
      payout.mark_failed(reason, now);
      tx.save_payout(&payout).await?;

      let mut wallet = tx.ensure_wallet(payout.vendor_id, now).await?;
      wallet.available_balance += payout.amount;
      wallet.updated_at = now;
      tx.save_wallet(&wallet).await?;
      let reversal = WalletTransaction::new(
        &wallet,
        WalletTxType::PayoutReversal,
        WalletTxStatus::Posted,
        payout.amount,
        format!("Reversal of payout {}", payout.app_transaction_ref),
        now,
      )
      .for_payout(payout.id);
      tx.insert_wallet_tx(&reversal).await?;
      warn!(payout_id = %payout.id, amount = payout.amount, "Payout failed at provider, amount returned to wallet.");
    }
    TransferState::Pending => {}
  }
  tx.commit().await?;
  ctx_data.write().payout = Some(payout);
  Ok(StepControl::Continue)
}

pub fn register_payout_flows(registry: &FlowRegistry<MarketError>) {
  let mut withdrawal = saga_flow::<WithdrawalCtx>();
  withdrawal.on_step("validate", validate_withdrawal);
  withdrawal.on_step("reserve", reserve_withdrawal);
  registry.register_flow(withdrawal);

  let mut retry = saga_flow::<RetryPayoutCtx>();
  retry.on_step("validate", validate_retry);
  retry.on_step("reserve", reserve_retry);
  registry.register_flow(retry);

  let provider_state_known: SkipCondition<SyncPayoutCtx> =
    Arc::new(|ctx_data: ContextData<SyncPayoutCtx>| ctx_data.read().reported.is_some());
  let mut sync = Flow::<SyncPayoutCtx, MarketError>::new(&[
    ("ensure_access", false, None),
    ("load", false, None),
    ("verify", false, Some(provider_state_known)),
    ("apply", false, None),
  ]);
  sync.on_step("ensure_access", ensure_actor_access::<SyncPayoutCtx>);
  sync.on_step("load", load_for_sync);
  sync.on_step("verify", verify_with_provider);
  sync.on_step("apply", apply_transfer_state);
  registry.register_flow(sync);
}
