// server/src/web/routes.rs

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{delivery_handlers, order_handlers, payout_handlers, wallet_handlers, webhook_handlers};
use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use serde_json::json;

async fn health_check_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  app_state.settlement.ping().await?;
  Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

/// Malformed bodies come back in the same error shape as everything else.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request body: {}", err)).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler));
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/vendor")
          .route("/orders/{id}/confirm", web::post().to(order_handlers::vendor_confirm_order))
          .route("/orders/{id}/cancel", web::post().to(order_handlers::vendor_cancel_order))
          .route("/orders/{id}/status", web::patch().to(order_handlers::vendor_update_status))
          .route("/jobs/{id}/cancel", web::post().to(delivery_handlers::vendor_cancel_job))
          .route("/wallet", web::get().to(wallet_handlers::vendor_wallet))
          .route("/payout-profile", web::put().to(wallet_handlers::save_payout_profile))
          .route("/withdrawals", web::post().to(wallet_handlers::request_withdrawal)),
      )
      .service(
        web::scope("/customer").route("/orders/{id}/received", web::post().to(order_handlers::confirm_received)),
      )
      .service(
        web::scope("/agency")
          .route("/jobs", web::get().to(delivery_handlers::list_open_jobs))
          .route("/jobs/{id}/accept", web::post().to(delivery_handlers::accept_job))
          .route("/jobs/{id}/pickup", web::post().to(delivery_handlers::pick_up_job))
          .route("/jobs/{id}/deliver", web::post().to(delivery_handlers::deliver_job)),
      )
      .service(
        web::scope("/admin")
          .route("/orders/{id}/status", web::patch().to(order_handlers::admin_update_status))
          .route("/jobs/{id}/cancel", web::post().to(delivery_handlers::admin_cancel_job))
          .route("/payouts/{id}/retry", web::post().to(payout_handlers::retry_payout))
          .route("/payouts/{id}/sync", web::post().to(payout_handlers::sync_payout))
          .route("/vendors/{vendor_id}/wallet/lock", web::post().to(wallet_handlers::lock_wallet))
          .route("/vendors/{vendor_id}/wallet/unlock", web::post().to(wallet_handlers::unlock_wallet)),
      )
      .service(web::scope("/webhooks").route("/payouts", web::post().to(webhook_handlers::payout_callback))),
  );
}

#[cfg(test)]
mod tests {
  use crate::web::handlers::test_support::Fixture;
  use actix_web::{test, web, App};
  use serde_json::Value;

  #[actix_rt::test]
  async fn test_health_reports_ok() {
    let fx = Fixture::new().await;
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(fx.state.clone()))
        .configure(super::configure_app_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
  }
}
