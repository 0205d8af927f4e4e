// server/src/main.rs

mod config;
mod db;
mod errors;
mod models;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, ProviderMode};
use crate::db::PgStore;
use crate::errors::{AppError, Result as AppResult};
use crate::services::HttpPayoutProvider;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use jemo_core::provider::ScriptedPayoutProvider;
use jemo_core::{MarketStore, MemoryStore, PayoutProvider, Settlement};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

async fn build_store(config: &AppConfig) -> AppResult<Arc<dyn MarketStore>> {
  match config.database_url.as_deref() {
    Some(url) => {
      let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await?;
      tracing::info!("Successfully connected to the database.");
      Ok(Arc::new(PgStore::new(pool)))
    }
    None => {
      tracing::warn!("No DATABASE_URL in mock mode; using the in-memory store. Nothing will be persisted.");
      Ok(Arc::new(MemoryStore::default()))
    }
  }
}

fn build_provider(config: &AppConfig) -> AppResult<Arc<dyn PayoutProvider>> {
  match config.payout_provider {
    ProviderMode::Http => {
      let (Some(url), Some(key)) = (
        config.payout_provider_url.as_deref(),
        config.payout_provider_api_key.as_deref(),
      ) else {
        return Err(AppError::Config("HTTP payout provider needs a URL and an API key".to_string()));
      };
      tracing::info!(base_url = %url, "Using HTTP payout provider.");
      Ok(Arc::new(HttpPayoutProvider::new(url, key, config.payout_provider_timeout)?))
    }
    ProviderMode::Mock => {
      tracing::warn!("Using the scripted mock payout provider. No money will move.");
      Ok(Arc::new(ScriptedPayoutProvider::new()))
    }
  }
}

async fn build_state() -> AppResult<AppState> {
  let config = Arc::new(AppConfig::from_env()?);
  let store = build_store(&config).await?;
  let provider = build_provider(&config)?;
  let settlement = Settlement::new(store, provider, config.settlement_config());
  Ok(AppState {
    settlement: Arc::new(settlement),
    config,
  })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Jemo settlement API server...");

  let app_state = build_state().await.map_err(|e| {
    tracing::error!(error = %e, "Failed to initialise application state.");
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
  })?;

  let server_address = format!("{}:{}", app_state.config.server_host, app_state.config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
