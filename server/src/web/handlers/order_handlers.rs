// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use jemo_core::model::{Actor, OrderStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminActor, CustomerActor, VendorActor};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonPayload {
  pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
  pub status: OrderStatus,
  pub note: Option<String>,
}

#[instrument(name = "handler::vendor_confirm_order", skip(app_state, vendor), fields(actor_id = %vendor.0.id, order_id = %*path))]
pub async fn vendor_confirm_order(
  app_state: web::Data<AppState>,
  vendor: VendorActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.settlement.confirm_order(vendor.0, path.into_inner()).await?;
  info!(status = %order.status, "Order confirmed.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::vendor_cancel_order", skip(app_state, vendor, payload), fields(actor_id = %vendor.0.id, order_id = %*path))]
pub async fn vendor_cancel_order(
  app_state: web::Data<AppState>,
  vendor: VendorActor,
  path: web::Path<Uuid>,
  payload: Option<web::Json<ReasonPayload>>,
) -> Result<HttpResponse, AppError> {
  let reason = payload.and_then(|p| p.into_inner().reason);
  let order = app_state
    .settlement
    .cancel_order(vendor.0, path.into_inner(), reason)
    .await?;
  info!("Order cancelled by vendor.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

async fn update_status(
  app_state: &AppState,
  actor: Actor,
  order_id: Uuid,
  payload: StatusPayload,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .settlement
    .update_order_status(actor, order_id, payload.status, payload.note)
    .await?;
  info!(status = %order.status, "Order status updated.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::vendor_update_status", skip(app_state, vendor, payload), fields(actor_id = %vendor.0.id, order_id = %*path, target = %payload.status))]
pub async fn vendor_update_status(
  app_state: web::Data<AppState>,
  vendor: VendorActor,
  path: web::Path<Uuid>,
  payload: web::Json<StatusPayload>,
) -> Result<HttpResponse, AppError> {
  update_status(&app_state, vendor.0, path.into_inner(), payload.into_inner()).await
}

#[instrument(name = "handler::admin_update_status", skip(app_state, admin, payload), fields(actor_id = %admin.0.id, order_id = %*path, target = %payload.status))]
pub async fn admin_update_status(
  app_state: web::Data<AppState>,
  admin: AdminActor,
  path: web::Path<Uuid>,
  payload: web::Json<StatusPayload>,
) -> Result<HttpResponse, AppError> {
  update_status(&app_state, admin.0, path.into_inner(), payload.into_inner()).await
}

#[instrument(name = "handler::confirm_received", skip(app_state, customer), fields(actor_id = %customer.0.id, order_id = %*path))]
pub async fn confirm_received(
  app_state: web::Data<AppState>,
  customer: CustomerActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .settlement
    .confirm_received(customer.0, path.into_inner())
    .await?;
  info!("Customer confirmed receipt.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}
