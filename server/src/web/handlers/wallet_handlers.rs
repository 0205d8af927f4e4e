// server/src/web/handlers/wallet_handlers.rs

use actix_web::{web, HttpResponse};
use jemo_core::model::PayoutMethod;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminActor, VendorActor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutProfilePayload {
  pub method: PayoutMethod,
  pub phone: String,
  pub legal_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalPayload {
  pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockPayload {
  pub reason: String,
}

#[instrument(name = "handler::vendor_wallet", skip(app_state, vendor), fields(actor_id = %vendor.0.id))]
pub async fn vendor_wallet(app_state: web::Data<AppState>, vendor: VendorActor) -> Result<HttpResponse, AppError> {
  let wallet = app_state.settlement.wallet(vendor.0, vendor.0.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "wallet": wallet, "currency": app_state.config.settlement_currency })))
}

#[instrument(name = "handler::save_payout_profile", skip(app_state, vendor, payload), fields(actor_id = %vendor.0.id, method = %payload.method))]
pub async fn save_payout_profile(
  app_state: web::Data<AppState>,
  vendor: VendorActor,
  payload: web::Json<PayoutProfilePayload>,
) -> Result<HttpResponse, AppError> {
  let PayoutProfilePayload {
    method,
    phone,
    legal_name,
  } = payload.into_inner();
  let profile = app_state
    .settlement
    .save_payout_profile(vendor.0, method, phone, legal_name)
    .await?;
  info!("Payout profile saved.");
  Ok(HttpResponse::Ok().json(json!({ "profile": profile })))
}

#[instrument(name = "handler::request_withdrawal", skip(app_state, vendor, payload), fields(actor_id = %vendor.0.id, amount = payload.amount))]
pub async fn request_withdrawal(
  app_state: web::Data<AppState>,
  vendor: VendorActor,
  payload: web::Json<WithdrawalPayload>,
) -> Result<HttpResponse, AppError> {
  let payout = app_state
    .settlement
    .request_withdrawal(vendor.0, payload.amount)
    .await?;
  info!(payout_id = %payout.id, status = %payout.status, "Withdrawal submitted to provider.");
  Ok(HttpResponse::Created().json(json!({ "payout": payout })))
}

#[instrument(name = "handler::lock_wallet", skip(app_state, admin, payload), fields(actor_id = %admin.0.id, vendor_id = %*path))]
pub async fn lock_wallet(
  app_state: web::Data<AppState>,
  admin: AdminActor,
  path: web::Path<Uuid>,
  payload: web::Json<LockPayload>,
) -> Result<HttpResponse, AppError> {
  let wallet = app_state
    .settlement
    .lock_withdrawals(admin.0, path.into_inner(), payload.into_inner().reason)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "wallet": wallet })))
}

#[instrument(name = "handler::unlock_wallet", skip(app_state, admin), fields(actor_id = %admin.0.id, vendor_id = %*path))]
pub async fn unlock_wallet(
  app_state: web::Data<AppState>,
  admin: AdminActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let wallet = app_state
    .settlement
    .unlock_withdrawals(admin.0, path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "wallet": wallet })))
}
