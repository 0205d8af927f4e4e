// server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use jemo_core::model::Actor;
use jemo_core::{PayoutLookup, TransferState};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Transfer status pushed by the provider.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutCallback {
  #[serde(alias = "reference", alias = "app_transaction_ref")]
  pub app_transaction_ref: String,
  pub status: String,
}

fn check_secret(app_state: &AppState, req: &HttpRequest) -> Result<(), AppError> {
  let Some(expected) = app_state.config.payout_webhook_secret.as_deref() else {
    return Ok(());
  };
  let presented = req.headers().get(WEBHOOK_SECRET_HEADER).and_then(|v| v.to_str().ok());
  if presented != Some(expected) {
    warn!("Payout callback rejected: missing or wrong {} header.", WEBHOOK_SECRET_HEADER);
    return Err(AppError::Auth("invalid webhook secret".to_string()));
  }
  Ok(())
}

#[instrument(
  name = "handler::payout_callback",
  skip(app_state, req, payload),
  fields(app_ref = %payload.app_transaction_ref, reported = %payload.status)
)]
pub async fn payout_callback(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Json<PayoutCallback>,
) -> Result<HttpResponse, AppError> {
  check_secret(&app_state, &req)?;
  let PayoutCallback {
    app_transaction_ref,
    status,
  } = payload.into_inner();
  let reported = TransferState::from_provider_status(&status);

  let payout = app_state
    .settlement
    .sync_payout(Actor::system(), PayoutLookup::Reference(app_transaction_ref), Some(reported))
    .await?;
  info!(payout_id = %payout.id, status = %payout.status, "Payout callback applied.");
  Ok(HttpResponse::Ok().json(json!({ "payoutId": payout.id, "status": payout.status })))
}
