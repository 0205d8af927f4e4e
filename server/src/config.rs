// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use jemo_core::SettlementConfig;
use std::env;
use std::time::Duration;

/// Which payout provider the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
  Http,
  /// Scripted in-process provider; every transfer is accepted.
  Mock,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Absent only in mock mode, where the server falls back to the in-memory store.
  pub database_url: Option<String>,
  pub database_max_connections: u32,

  pub payout_provider: ProviderMode,
  pub payout_provider_url: Option<String>,
  pub payout_provider_api_key: Option<String>,
  pub payout_provider_timeout: Duration,
  pub payout_webhook_secret: Option<String>,

  pub settlement_currency: String,
  pub min_withdrawal_amount: i64,
  pub platform_commission_bps: u32,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let payout_provider = match get_env("PAYOUT_PROVIDER")
      .unwrap_or_else(|_| "http".to_string())
      .to_ascii_lowercase()
      .as_str()
    {
      "http" => ProviderMode::Http,
      "mock" => ProviderMode::Mock,
      other => {
        return Err(AppError::Config(format!(
          "Invalid PAYOUT_PROVIDER '{}': expected 'http' or 'mock'",
          other
        )))
      }
    };

    let database_url = match payout_provider {
      ProviderMode::Http => Some(get_env("DATABASE_URL")?),
      ProviderMode::Mock => get_env("DATABASE_URL").ok(),
    };
    let database_max_connections = get_env("DATABASE_MAX_CONNECTIONS")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;

    let (payout_provider_url, payout_provider_api_key) = match payout_provider {
      ProviderMode::Http => (
        Some(get_env("PAYOUT_PROVIDER_URL")?.trim_end_matches('/').to_string()),
        Some(get_env("PAYOUT_PROVIDER_API_KEY")?),
      ),
      ProviderMode::Mock => (None, None),
    };
    let timeout_secs = get_env("PAYOUT_PROVIDER_TIMEOUT_SECS")
      .unwrap_or_else(|_| "30".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid PAYOUT_PROVIDER_TIMEOUT_SECS: {}", e)))?;
    if timeout_secs == 0 {
      return Err(AppError::Config("PAYOUT_PROVIDER_TIMEOUT_SECS must be positive".to_string()));
    }
    let payout_webhook_secret = get_env("PAYOUT_WEBHOOK_SECRET").ok();

    let settlement_currency = get_env("SETTLEMENT_CURRENCY").unwrap_or_else(|_| "XAF".to_string());
    let min_withdrawal_amount = get_env("MIN_WITHDRAWAL_AMOUNT")
      .unwrap_or_else(|_| "500".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid MIN_WITHDRAWAL_AMOUNT: {}", e)))?;
    if min_withdrawal_amount <= 0 {
      return Err(AppError::Config("MIN_WITHDRAWAL_AMOUNT must be positive".to_string()));
    }
    let platform_commission_bps = get_env("PLATFORM_COMMISSION_BPS")
      .unwrap_or_else(|_| "0".to_string())
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid PLATFORM_COMMISSION_BPS: {}", e)))?;
    if platform_commission_bps > 10_000 {
      return Err(AppError::Config(format!(
        "PLATFORM_COMMISSION_BPS must be at most 10000, got {}",
        platform_commission_bps
      )));
    }

    tracing::info!(provider = ?payout_provider, "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      payout_provider,
      payout_provider_url,
      payout_provider_api_key,
      payout_provider_timeout: Duration::from_secs(timeout_secs),
      payout_webhook_secret,
      settlement_currency,
      min_withdrawal_amount,
      platform_commission_bps,
    })
  }

  pub fn settlement_config(&self) -> SettlementConfig {
    SettlementConfig {
      currency: self.settlement_currency.clone(),
      min_withdrawal: self.min_withdrawal_amount,
      platform_commission_bps: self.platform_commission_bps,
    }
  }
}
