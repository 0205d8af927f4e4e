// core/src/provider/mock.rs

//! Scripted provider for tests and `PAYOUT_PROVIDER=mock` runs.

use super::{PayoutInstruction, PayoutProvider, ProviderReply};
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tracing::info;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
  Body(Value),
  Unavailable(String),
}

/// Pops scripted replies in order; when a script is empty it answers with a
/// generic success.
#[derive(Debug, Default)]
pub struct ScriptedPayoutProvider {
  initiate_script: Mutex<VecDeque<ScriptedReply>>,
  verify_script: Mutex<VecDeque<ScriptedReply>>,
  initiated: Mutex<Vec<PayoutInstruction>>,
  verified: Mutex<Vec<String>>,
}

impl ScriptedPayoutProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_initiate(&self, reply: ScriptedReply) -> &Self {
    self.initiate_script.lock().push_back(reply);
    self
  }

  pub fn push_verify(&self, reply: ScriptedReply) -> &Self {
    self.verify_script.lock().push_back(reply);
    self
  }

  pub fn accept_next(&self) -> &Self {
    self.push_initiate(ScriptedReply::Body(json!({
      "status": "success",
      "code": 200,
      "message": "Transfer queued",
      "data": { "transaction_id": format!("MOCK-{}", uuid::Uuid::new_v4().simple()) }
    })))
  }

  pub fn reject_next(&self, message: &str) -> &Self {
    self.push_initiate(ScriptedReply::Body(json!({
      "status": "failed",
      "code": 400,
      "message": message,
    })))
  }

  pub fn fail_next(&self, message: &str) -> &Self {
    self.push_initiate(ScriptedReply::Unavailable(message.to_string()))
  }

  pub fn initiated(&self) -> Vec<PayoutInstruction> {
    self.initiated.lock().clone()
  }

  pub fn verified(&self) -> Vec<String> {
    self.verified.lock().clone()
  }

  fn answer(reply: Option<ScriptedReply>, default: Value) -> MarketResult<ProviderReply> {
    match reply {
      Some(ScriptedReply::Body(body)) => ProviderReply::from_raw(body),
      Some(ScriptedReply::Unavailable(message)) => Err(MarketError::ProviderUnavailable(message)),
      None => ProviderReply::from_raw(default),
    }
  }
}

#[async_trait]
impl PayoutProvider for ScriptedPayoutProvider {
  async fn initiate_payout(&self, instruction: &PayoutInstruction) -> MarketResult<ProviderReply> {
    info!(reference = %instruction.app_transaction_ref, amount = instruction.amount, "Mock payout initiated.");
    self.initiated.lock().push(instruction.clone());
    let next = self.initiate_script.lock().pop_front();
    Self::answer(
      next,
      json!({
        "status": "success",
        "code": 200,
        "data": { "transaction_id": format!("MOCK-{}", instruction.app_transaction_ref) }
      }),
    )
  }

  async fn verify_payout(&self, app_transaction_ref: &str) -> MarketResult<ProviderReply> {
    self.verified.lock().push(app_transaction_ref.to_string());
    let next = self.verify_script.lock().pop_front();
    Self::answer(next, json!({ "status": "PENDING", "code": 200 }))
  }
}
