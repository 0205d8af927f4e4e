// server/src/web/handlers/delivery_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminActor, AgencyActor, VendorActor};
use crate::web::handlers::order_handlers::ReasonPayload;

#[instrument(name = "handler::list_open_jobs", skip(app_state, agency), fields(actor_id = %agency.0.id))]
pub async fn list_open_jobs(app_state: web::Data<AppState>, agency: AgencyActor) -> Result<HttpResponse, AppError> {
  let jobs = app_state.settlement.open_jobs_for_agency(agency.0).await?;
  info!(count = jobs.len(), "Listed open delivery jobs.");
  Ok(HttpResponse::Ok().json(json!({ "jobs": jobs })))
}

#[instrument(name = "handler::accept_job", skip(app_state, agency), fields(actor_id = %agency.0.id, job_id = %*path))]
pub async fn accept_job(
  app_state: web::Data<AppState>,
  agency: AgencyActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let job = app_state.settlement.accept_job(agency.0, path.into_inner()).await?;
  info!("Delivery job accepted.");
  Ok(HttpResponse::Ok().json(json!({ "job": job })))
}

#[instrument(name = "handler::pick_up_job", skip(app_state, agency), fields(actor_id = %agency.0.id, job_id = %*path))]
pub async fn pick_up_job(
  app_state: web::Data<AppState>,
  agency: AgencyActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let job = app_state.settlement.pick_up_job(agency.0, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "job": job })))
}

#[instrument(name = "handler::deliver_job", skip(app_state, agency), fields(actor_id = %agency.0.id, job_id = %*path))]
pub async fn deliver_job(
  app_state: web::Data<AppState>,
  agency: AgencyActor,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let job = app_state.settlement.deliver_job(agency.0, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "job": job })))
}

#[instrument(name = "handler::vendor_cancel_job", skip(app_state, vendor, payload), fields(actor_id = %vendor.0.id, job_id = %*path))]
pub async fn vendor_cancel_job(
  app_state: web::Data<AppState>,
  vendor: VendorActor,
  path: web::Path<Uuid>,
  payload: Option<web::Json<ReasonPayload>>,
) -> Result<HttpResponse, AppError> {
  let reason = payload.and_then(|p| p.into_inner().reason);
  let job = app_state.settlement.cancel_job(vendor.0, path.into_inner(), reason).await?;
  Ok(HttpResponse::Ok().json(json!({ "job": job })))
}

#[instrument(name = "handler::admin_cancel_job", skip(app_state, admin, payload), fields(actor_id = %admin.0.id, job_id = %*path))]
pub async fn admin_cancel_job(
  app_state: web::Data<AppState>,
  admin: AdminActor,
  path: web::Path<Uuid>,
  payload: Option<web::Json<ReasonPayload>>,
) -> Result<HttpResponse, AppError> {
  let reason = payload.and_then(|p| p.into_inner().reason);
  let job = app_state.settlement.cancel_job(admin.0, path.into_inner(), reason).await?;
  Ok(HttpResponse::Ok().json(json!({ "job": job })))
}

#[cfg(test)]
mod tests {
  use super::super::test_support::*;
  use crate::web::extractors::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
  use actix_web::test;
  use jemo_core::model::{Actor, AgencyAccount, DeliveryMethod, OrderStatus};
  use serde_json::{json, Value};
  use uuid::Uuid;

  async fn open_job(fx: &Fixture) -> Uuid {
    let order_id = fx.seed_order(DeliveryMethod::JemoRider, OrderStatus::Pending).await;
    fx.state.settlement.confirm_order(fx.vendor, order_id).await.unwrap();
    let state = fx.store.snapshot().await;
    state.jobs.values().find(|j| j.order_id == order_id).unwrap().id
  }

  #[actix_rt::test]
  async fn test_agency_runs_a_job_end_to_end() {
    let fx = Fixture::new().await;
    let job_id = open_job(&fx).await;
    let app = test_app!(fx);

    let req = fx.as_agency(test::TestRequest::get().uri("/api/v1/agency/jobs")).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["jobs"][0]["id"], job_id.to_string());
    assert_eq!(body["jobs"][0]["pickupCity"], "Douala");

    for (step, expected) in [("accept", "ACCEPTED"), ("pickup", "ACCEPTED"), ("deliver", "DELIVERED")] {
      let req = fx
        .as_agency(test::TestRequest::post().uri(&format!("/api/v1/agency/jobs/{}/{}", job_id, step)))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert_eq!(resp.status(), 200, "step {}", step);
      let body: Value = test::read_body_json(resp).await;
      assert_eq!(body["job"]["status"], expected);
    }

    assert_eq!(fx.vendor_wallet().await.pending_balance, 12_500);
  }

  #[actix_rt::test]
  async fn test_second_accept_is_rejected() {
    let fx = Fixture::new().await;
    let job_id = open_job(&fx).await;
    let app = test_app!(fx);
    let uri = format!("/api/v1/agency/jobs/{}/accept", job_id);

    let first = test::call_service(&app, fx.as_agency(test::TestRequest::post().uri(&uri)).to_request()).await;
    assert_eq!(first.status(), 200);

    let second = test::call_service(&app, fx.as_agency(test::TestRequest::post().uri(&uri)).to_request()).await;
    assert_eq!(second.status(), 400);
    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["error"], "JOB_NOT_OPEN");
  }

  #[actix_rt::test]
  async fn test_rival_agency_gets_conflict() {
    let fx = Fixture::new().await;
    let job_id = open_job(&fx).await;
    let rival = Actor::agency(Uuid::new_v4());
    fx.store
      .with_state(|s| {
        s.agencies.insert(
          rival.id,
          AgencyAccount {
            id: rival.id,
            name: "Wouri Couriers".to_string(),
            is_active: true,
            cities_covered: vec!["Douala".to_string()],
          },
        );
      })
      .await;
    let app = test_app!(fx);
    let uri = format!("/api/v1/agency/jobs/{}/accept", job_id);

    let first = test::call_service(&app, fx.as_agency(test::TestRequest::post().uri(&uri)).to_request()).await;
    assert_eq!(first.status(), 200);

    let req = test::TestRequest::post()
      .uri(&uri)
      .insert_header((ACTOR_ID_HEADER, rival.id.to_string()))
      .insert_header((ACTOR_ROLE_HEADER, "agency"))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "JOB_ALREADY_ASSIGNED");
  }

  #[actix_rt::test]
  async fn test_vendor_and_admin_cancel_jobs() {
    let fx = Fixture::new().await;
    let first = open_job(&fx).await;
    let second = open_job(&fx).await;
    let app = test_app!(fx);

    let req = fx
      .as_vendor(test::TestRequest::post().uri(&format!("/api/v1/vendor/jobs/{}/cancel", first)))
      .set_json(json!({ "reason": "Customer unreachable" }))
      .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["job"]["status"], "CANCELLED");
    assert_eq!(body["job"]["cancelReason"], "Customer unreachable");

    let req = fx
      .as_admin(test::TestRequest::post().uri(&format!("/api/v1/admin/jobs/{}/cancel", second)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // Agencies cannot reach the cancel routes at all.
    let req = fx
      .as_agency(test::TestRequest::post().uri(&format!("/api/v1/admin/jobs/{}/cancel", second)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
  }
}
