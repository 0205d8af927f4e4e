// core/src/settlement/contexts.rs

//! Context data for every settlement flow. Handlers receive these wrapped in
//! `ContextData`.

use super::SettlementDeps;
use crate::model::{
  Actor, ActorRole, DeliveryJob, Order, OrderStatus, Payout, PayoutMethod, VendorPayoutProfile, VendorWallet,
};
use crate::provider::{ProviderReply, TransferState};
use uuid::Uuid;

/// What every flow context exposes to the shared steps.
pub trait FlowCtx: Send + Sync + 'static {
  fn deps(&self) -> &SettlementDeps;
  fn actor(&self) -> Actor;
  fn operation(&self) -> &'static str;
  fn permitted_roles(&self) -> &'static [ActorRole];
}

macro_rules! flow_ctx {
  ($ctx:ty, $operation:literal, [$($role:ident),+]) => {
    impl FlowCtx for $ctx {
      fn deps(&self) -> &SettlementDeps {
        &self.deps
      }

      fn actor(&self) -> Actor {
        self.actor
      }

      fn operation(&self) -> &'static str {
        $operation
      }

      fn permitted_roles(&self) -> &'static [ActorRole] {
        &[$(ActorRole::$role),+]
      }
    }
  };
}

// --- Orders ---

pub struct ConfirmOrderCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub order_id: Uuid,
  pub order: Option<Order>,
  pub created_job: Option<DeliveryJob>,
}

pub struct CancelOrderCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub order_id: Uuid,
  pub reason: Option<String>,
  pub order: Option<Order>,
}

pub struct OrderStatusCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub order_id: Uuid,
  pub target: OrderStatus,
  pub note: Option<String>,
  pub order: Option<Order>,
}

flow_ctx!(ConfirmOrderCtx, "confirm orders", [Vendor, Admin]);
flow_ctx!(CancelOrderCtx, "cancel orders", [Vendor, Admin]);
flow_ctx!(OrderStatusCtx, "change order status", [Vendor, Customer, Agency, Admin]);

// --- Delivery jobs ---

pub struct AcceptJobCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub job_id: Uuid,
  pub job: Option<DeliveryJob>,
}

/// Which leg of the delivery an agency is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobProgress {
  PickedUp,
  Delivered,
}

pub struct JobProgressCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub job_id: Uuid,
  pub progress: JobProgress,
  pub job: Option<DeliveryJob>,
  pub order: Option<Order>,
}

pub struct CancelJobCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub job_id: Uuid,
  pub reason: Option<String>,
  pub job: Option<DeliveryJob>,
}

pub struct OpenJobsCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub jobs: Vec<DeliveryJob>,
}

flow_ctx!(AcceptJobCtx, "accept delivery jobs", [Agency]);
flow_ctx!(JobProgressCtx, "report delivery progress", [Agency]);
flow_ctx!(CancelJobCtx, "cancel delivery jobs", [Vendor, Admin]);
flow_ctx!(OpenJobsCtx, "list delivery jobs", [Agency]);

// --- Payouts ---

/// Saga state shared by the withdrawal and retry flows.
#[derive(Debug, Default)]
pub struct Disbursement {
  pub payout: Option<Payout>,
  pub debit_tx_id: Option<Uuid>,
  pub reply: Option<ProviderReply>,
  pub failure_reason: Option<String>,
}

pub trait DisbursementCtx: FlowCtx {
  fn disbursement(&self) -> &Disbursement;
  fn disbursement_mut(&mut self) -> &mut Disbursement;
}

pub struct WithdrawalCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub amount: i64,
  pub disbursement: Disbursement,
}

pub struct RetryPayoutCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub payout_id: Uuid,
  pub disbursement: Disbursement,
}

impl DisbursementCtx for WithdrawalCtx {
  fn disbursement(&self) -> &Disbursement {
    &self.disbursement
  }

  fn disbursement_mut(&mut self) -> &mut Disbursement {
    &mut self.disbursement
  }
}

impl DisbursementCtx for RetryPayoutCtx {
  fn disbursement(&self) -> &Disbursement {
    &self.disbursement
  }

  fn disbursement_mut(&mut self) -> &mut Disbursement {
    &mut self.disbursement
  }
}

/// How a payout to reconcile is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutLookup {
  Id(Uuid),
  Reference(String),
}

pub struct SyncPayoutCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub lookup: PayoutLookup,
  /// State pushed by a provider callback. When absent the provider is asked.
  pub reported: Option<TransferState>,
  pub state: Option<TransferState>,
  pub reply: Option<ProviderReply>,
  pub payout: Option<Payout>,
}

flow_ctx!(WithdrawalCtx, "request withdrawals", [Vendor]);
flow_ctx!(RetryPayoutCtx, "retry payouts", [Admin]);
flow_ctx!(SyncPayoutCtx, "reconcile payouts", [Admin, System]);

// --- Wallets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
  Lock,
  Unlock,
}

pub struct WithdrawalLockCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub vendor_id: Uuid,
  pub action: LockAction,
  pub reason: Option<String>,
  pub wallet: Option<VendorWallet>,
}

pub struct WalletViewCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub vendor_id: Uuid,
  pub wallet: Option<VendorWallet>,
}

pub struct PayoutProfileCtx {
  pub deps: SettlementDeps,
  pub actor: Actor,
  pub method: PayoutMethod,
  pub phone: String,
  pub legal_name: String,
  pub profile: Option<VendorPayoutProfile>,
}

flow_ctx!(WithdrawalLockCtx, "lock withdrawals", [Admin]);
flow_ctx!(WalletViewCtx, "view wallets", [Vendor, Admin]);
flow_ctx!(PayoutProfileCtx, "manage payout profiles", [Vendor]);
