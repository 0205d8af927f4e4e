// server/src/web/handlers/payout_handlers.rs

use actix_web::{web, HttpResponse};
use jemo_core::PayoutLookup;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminActor;

#[instrument(name = "handler::retry_payout", skip(app_state, admin), fields(actor_id = %admin.0.id, payout_id = %*path))]
pub async fn retry_payout(
  app_state: web::Data<AppState>,
  admin: AdminActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let payout = app_state.settlement.retry_payout(admin.0, path.into_inner()).await?;
  info!(status = %payout.status, app_ref = %payout.app_transaction_ref, "Payout retried.");
  Ok(HttpResponse::Ok().json(json!({ "payout": payout })))
}

/// Asks the provider where a PROCESSING payout stands and applies the answer.
#[instrument(name = "handler::sync_payout", skip(app_state, admin), fields(actor_id = %admin.0.id, payout_id = %*path))]
pub async fn sync_payout(
  app_state: web::Data<AppState>,
  admin: AdminActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let payout = app_state
    .settlement
    .sync_payout(admin.0, PayoutLookup::Id(path.into_inner()), None)
    .await?;
  info!(status = %payout.status, "Payout synchronised with provider.");
  Ok(HttpResponse::Ok().json(json!({ "payout": payout })))
}

#[cfg(test)]
mod tests {
  use super::super::test_support::*;
  use actix_web::test;
  use jemo_core::model::PayoutStatus;
  use jemo_core::provider::mock::ScriptedReply;
  use serde_json::{json, Value};

  #[actix_rt::test]
  async fn test_retry_failed_payout() {
    let fx = Fixture::new().await;
    let wallet = fx.seed_wallet(10_000).await;
    let payout = fx.seed_payout(&wallet, PayoutStatus::Failed, 3_000).await;
    let app = test_app!(fx);

    let req = fx
      .as_admin(test::TestRequest::post().uri(&format!("/api/v1/admin/payouts/{}/retry", payout.id)))
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["payout"]["status"], "PROCESSING");
    assert_ne!(body["payout"]["appTransactionRef"], payout.app_transaction_ref.as_str());
    assert_eq!(fx.vendor_wallet().await.available_balance, 7_000);
    assert_eq!(fx.provider.initiated().len(), 1);
  }

  #[actix_rt::test]
  async fn test_retry_of_processing_payout_is_rejected() {
    let fx = Fixture::new().await;
    let wallet = fx.seed_wallet(10_000).await;
    let payout = fx.seed_payout(&wallet, PayoutStatus::Processing, 3_000).await;
    let app = test_app!(fx);

    let req = fx
      .as_admin(test::TestRequest::post().uri(&format!("/api/v1/admin/payouts/{}/retry", payout.id)))
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "PAYOUT_NOT_RETRYABLE");
    assert!(fx.provider.initiated().is_empty());
  }

  #[actix_rt::test]
  async fn test_sync_applies_provider_failure() {
    let fx = Fixture::new().await;
    let wallet = fx.seed_wallet(1_000).await;
    let payout = fx.seed_payout(&wallet, PayoutStatus::Processing, 3_000).await;
    fx.provider
      .push_verify(ScriptedReply::Body(json!({ "status": "FAILED", "code": 200, "message": "Wallet closed" })));
    let app = test_app!(fx);

    let req = fx
      .as_admin(test::TestRequest::post().uri(&format!("/api/v1/admin/payouts/{}/sync", payout.id)))
      .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["payout"]["status"], "FAILED");
    assert_eq!(fx.vendor_wallet().await.available_balance, 4_000);
    assert_eq!(fx.provider.verified(), vec![payout.app_transaction_ref]);
  }

  #[actix_rt::test]
  async fn test_unknown_payout_is_not_found() {
    let fx = Fixture::new().await;
    let app = test_app!(fx);

    let req = fx
      .as_admin(test::TestRequest::post().uri(&format!("/api/v1/admin/payouts/{}/sync", uuid::Uuid::new_v4())))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
  }
}
