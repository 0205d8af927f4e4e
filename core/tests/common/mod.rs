// tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use jemo_core::model::{
  Actor, AgencyAccount, DeliveryMethod, KycStatus, Order, OrderItem, OrderStatus, Payout, PayoutMethod, PayoutStatus,
  Product, VendorAccount, VendorPayoutProfile, VendorWallet,
};
use jemo_core::provider::ScriptedPayoutProvider;
use jemo_core::{ContextData, FlowError, MemoryStore, Settlement, SettlementConfig, StepControl};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Flow engine test context ---

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub steps_executed: Vec<String>,
  pub compensated: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow framework error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn recording_handler(
  step_name: &'static str,
) -> impl Fn(ContextData<TestContext>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StepControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(StepControl::Stop);
      }
      Ok(StepControl::Continue)
    })
  }
}

pub fn failing_handler(
  step_name: &'static str,
  message: &'static str,
) -> impl Fn(ContextData<TestContext>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StepControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  }
}

pub fn recording_compensation(
  step_name: &'static str,
) -> impl Fn(ContextData<TestContext>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().compensated.push(step_name.to_string());
      Ok(())
    })
  }
}

// --- Tracing ---

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Marketplace fixture ---

pub struct Market {
  pub store: MemoryStore,
  pub provider: Arc<ScriptedPayoutProvider>,
  pub settlement: Settlement,
  pub vendor: Actor,
  pub customer: Actor,
  pub agency: Actor,
  pub admin: Actor,
}

impl Market {
  /// Approved vendor, active agency covering Douala and Yaounde, no orders.
  pub async fn new() -> Self {
    Self::with_config(SettlementConfig::default()).await
  }

  pub async fn with_config(config: SettlementConfig) -> Self {
    setup_tracing();
    let store = MemoryStore::default();
    let provider = Arc::new(ScriptedPayoutProvider::new());
    let settlement = Settlement::new(Arc::new(store.clone()), provider.clone(), config);
    let vendor = Actor::vendor(Uuid::new_v4());
    let agency = Actor::agency(Uuid::new_v4());
    store
      .with_state(|s| {
        s.vendors.insert(
          vendor.id,
          VendorAccount {
            id: vendor.id,
            kyc_status: KycStatus::Approved,
          },
        );
        s.agencies.insert(
          agency.id,
          AgencyAccount {
            id: agency.id,
            name: "Moto Express".into(),
            is_active: true,
            cities_covered: vec!["Douala".into(), "Yaounde".into()],
          },
        );
      })
      .await;
    Self {
      store,
      provider,
      settlement,
      vendor,
      customer: Actor::customer(Uuid::new_v4()),
      agency,
      admin: Actor::admin(Uuid::new_v4()),
    }
  }

  /// Another active agency covering `cities`.
  pub async fn add_agency(&self, cities: &[&str]) -> Actor {
    let agency = Actor::agency(Uuid::new_v4());
    self
      .store
      .with_state(|s| {
        s.agencies.insert(
          agency.id,
          AgencyAccount {
            id: agency.id,
            name: "Second Agency".into(),
            is_active: true,
            cities_covered: cities.iter().map(|c| c.to_string()).collect(),
          },
        );
      })
      .await;
    agency
  }

  /// Order with two items (2 x 5 000 and 1 x 2 500, subtotal 12 500) and a
  /// delivery fee of 1 500. Products start with 10 units of stock.
  pub async fn seed_order(&self, method: DeliveryMethod, status: OrderStatus) -> Order {
    let order_id = Uuid::new_v4();
    let products: Vec<Product> = (0..2)
      .map(|i| Product {
        id: Uuid::new_v4(),
        vendor_id: self.vendor.id,
        name: format!("Product {}", i),
        stock: 10,
      })
      .collect();
    let items = vec![
      OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id: products[0].id,
        quantity: 2,
        unit_price: 5_000,
      },
      OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id: products[1].id,
        quantity: 1,
        unit_price: 2_500,
      },
    ];
    let order = Order {
      id: order_id,
      customer_id: self.customer.id,
      vendor_id: self.vendor.id,
      status,
      delivery_method: method,
      delivery_fee: 1_500,
      pickup_city: "  douala ".into(),
      pickup_address: "Rue Joss, Akwa".into(),
      dropoff_city: "DOUALA".into(),
      dropoff_address: "Bonapriso".into(),
      items,
      created_at: Utc::now(),
      confirmed_at: None,
      in_transit_at: None,
      delivered_at: None,
      cancelled_at: None,
      completed_at: None,
      cancel_reason: None,
      cancelled_by: None,
    };
    let stored = order.clone();
    self
      .store
      .with_state(move |s| {
        for p in products {
          s.products.insert(p.id, p);
        }
        s.orders.insert(stored.id, stored);
      })
      .await;
    order
  }

  pub async fn seed_wallet(&self, available: i64, locked_reason: Option<&str>) -> VendorWallet {
    let mut wallet = VendorWallet::open(self.vendor.id, Utc::now());
    wallet.available_balance = available;
    if let Some(reason) = locked_reason {
      wallet.withdrawals_locked = true;
      wallet.lock_reason = Some(reason.to_string());
      wallet.locked_at = Some(Utc::now());
      wallet.locked_by_id = Some(self.admin.id);
    }
    let stored = wallet.clone();
    self.store.with_state(move |s| s.wallets.insert(stored.vendor_id, stored)).await;
    wallet
  }

  pub async fn seed_profile(&self) -> VendorPayoutProfile {
    let profile = VendorPayoutProfile {
      vendor_id: self.vendor.id,
      method: PayoutMethod::MtnMomo,
      phone: "237677123456".into(),
      legal_name: "Ngono Boutique".into(),
      updated_at: Utc::now(),
    };
    let stored = profile.clone();
    self
      .store
      .with_state(move |s| s.payout_profiles.insert(stored.vendor_id, stored))
      .await;
    profile
  }

  pub async fn seed_payout(&self, wallet: &VendorWallet, status: PayoutStatus, amount: i64) -> Payout {
    let now = Utc::now();
    let mut payout = Payout {
      id: Uuid::new_v4(),
      vendor_id: self.vendor.id,
      wallet_id: wallet.id,
      amount,
      method: PayoutMethod::MtnMomo,
      destination_phone: "237677123456".into(),
      beneficiary_name: "Ngono Boutique".into(),
      app_transaction_ref: Payout::new_app_reference(),
      provider_ref: None,
      provider_raw: None,
      failure_reason: None,
      status,
      requested_at: now,
      processed_at: None,
      completed_at: None,
      failed_at: None,
      updated_at: now,
    };
    if status == PayoutStatus::Failed {
      payout.failure_reason = Some("Provider call failed: timeout".into());
      payout.failed_at = Some(now);
      payout.provider_ref = Some("OLD-PROVIDER-REF".into());
      payout.provider_raw = Some(serde_json::json!({"status": "failed"}));
    }
    if status == PayoutStatus::Processing {
      payout.processed_at = Some(now);
      payout.provider_ref = Some("PRV-1".into());
    }
    let stored = payout.clone();
    self.store.with_state(move |s| s.payouts.insert(stored.id, stored)).await;
    payout
  }

  pub async fn wallet(&self) -> VendorWallet {
    self.settlement.wallet(self.admin, self.vendor.id).await.unwrap()
  }

  pub async fn order(&self, order_id: Uuid) -> Order {
    self.store.snapshot().await.orders[&order_id].clone()
  }
}
