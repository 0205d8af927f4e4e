// server/src/services/payout_gateway.rs

//! HTTP client for the mobile-money disbursement provider.
//!
//! `POST {base}/payouts` starts a transfer, `GET {base}/payouts/{reference}`
//! reports on it. Both answer with the `{status, code, message, data}`
//! envelope. Any JSON body is handed back as a reply, rejections included;
//! transport failures, timeouts, 5xx answers and non-JSON bodies count as the
//! provider being unavailable.

use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use jemo_core::{MarketError, MarketResult, PayoutInstruction, PayoutProvider, ProviderReply};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct HttpPayoutProvider {
  http: Client,
  base_url: String,
  api_key: String,
}

impl HttpPayoutProvider {
  pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> AppResult<Self> {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build payout provider client: {}", e)))?;
    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn exchange(&self, request: RequestBuilder, what: &str) -> MarketResult<ProviderReply> {
    let response = request.bearer_auth(&self.api_key).send().await.map_err(|e| {
      let message = if e.is_timeout() {
        format!("{} timed out", what)
      } else {
        format!("{} failed: {}", what, e)
      };
      warn!(error = %e, "{}", message);
      MarketError::ProviderUnavailable(message)
    })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
      warn!(error = %e, http_status = status.as_u16(), "Could not read payout provider response body.");
      MarketError::ProviderUnavailable(format!("{}: unreadable response body", what))
    })?;

    if status.is_server_error() {
      warn!(http_status = status.as_u16(), "Payout provider answered with a server error.");
      return Err(MarketError::ProviderUnavailable(format!(
        "{}: provider answered HTTP {}",
        what,
        status.as_u16()
      )));
    }

    let raw: Value = serde_json::from_slice(&body).map_err(|_| {
      warn!(http_status = status.as_u16(), body_len = body.len(), "Payout provider answered with non-JSON body.");
      MarketError::ProviderUnavailable(format!("{}: non-JSON response (HTTP {})", what, status.as_u16()))
    })?;
    info!(http_status = status.as_u16(), "Payout provider replied.");
    ProviderReply::from_raw(raw)
  }
}

#[async_trait]
impl PayoutProvider for HttpPayoutProvider {
  #[instrument(name = "payout_gateway::initiate", skip(self, instruction), fields(app_ref = %instruction.app_transaction_ref, amount = instruction.amount))]
  async fn initiate_payout(&self, instruction: &PayoutInstruction) -> MarketResult<ProviderReply> {
    let request = self.http.post(self.url("/payouts")).json(instruction);
    self.exchange(request, "payout initiation").await
  }

  #[instrument(name = "payout_gateway::verify", skip(self))]
  async fn verify_payout(&self, app_transaction_ref: &str) -> MarketResult<ProviderReply> {
    let request = self.http.get(self.url(&format!("/payouts/{}", app_transaction_ref)));
    self.exchange(request, "payout verification").await
  }
}
