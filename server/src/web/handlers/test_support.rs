// server/src/web/handlers/test_support.rs

//! In-memory application for route tests.

use crate::config::AppConfig;
use crate::state::AppState;
use crate::web::extractors::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use actix_web::test::TestRequest;
use chrono::Utc;
use jemo_core::model::{
  Actor, AgencyAccount, DeliveryMethod, KycStatus, Order, OrderItem, OrderStatus, Payout, PayoutMethod,
  PayoutStatus, Product, VendorAccount, VendorPayoutProfile, VendorWallet,
};
use jemo_core::provider::ScriptedPayoutProvider;
use jemo_core::{MemoryStore, Settlement};
use std::sync::Arc;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "hook-secret";

/// Builds the service under test from a `Fixture`.
macro_rules! test_app {
  ($fx:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($fx.state.clone()))
        .configure(crate::web::configure_app_routes),
    )
    .await
  };
}

pub struct Fixture {
  pub store: MemoryStore,
  pub provider: Arc<ScriptedPayoutProvider>,
  pub state: AppState,
  pub vendor: Actor,
  pub customer: Actor,
  pub agency: Actor,
  pub admin: Actor,
}

impl Fixture {
  pub async fn new() -> Self {
    let config = AppConfig::from_lookup(|name| match name {
      "PAYOUT_PROVIDER" => Some("mock".to_string()),
      "PAYOUT_WEBHOOK_SECRET" => Some(WEBHOOK_SECRET.to_string()),
      _ => None,
    })
    .unwrap();
    let store = MemoryStore::default();
    let provider = Arc::new(ScriptedPayoutProvider::new());
    let settlement = Settlement::new(Arc::new(store.clone()), provider.clone(), config.settlement_config());

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
            name: "Douala Express".to_string(),
            is_active: true,
            cities_covered: vec!["Douala".to_string()],
          },
        );
      })
      .await;

    Self {
      store,
      provider,
      state: AppState {
        settlement: Arc::new(settlement),
        config: Arc::new(config),
      },
      vendor,
      customer: Actor::customer(Uuid::new_v4()),
      agency,
      admin: Actor::admin(Uuid::new_v4()),
    }
  }

  fn with_actor(req: TestRequest, actor: Actor) -> TestRequest {
    req
      .insert_header((ACTOR_ID_HEADER, actor.id.to_string()))
      .insert_header((ACTOR_ROLE_HEADER, actor.role.as_str()))
  }

  pub fn as_vendor(&self, req: TestRequest) -> TestRequest {
    Self::with_actor(req, self.vendor)
  }

  pub fn as_customer(&self, req: TestRequest) -> TestRequest {
    Self::with_actor(req, self.customer)
  }

  pub fn as_agency(&self, req: TestRequest) -> TestRequest {
    Self::with_actor(req, self.agency)
  }

  pub fn as_admin(&self, req: TestRequest) -> TestRequest {
    Self::with_actor(req, self.admin)
  }

  /// Two lines (2 x 5000 and 1 x 2500), delivery fee 1500, in Douala.
  pub async fn seed_order(&self, method: DeliveryMethod, status: OrderStatus) -> Uuid {
    let order_id = Uuid::new_v4();
    let vendor_id = self.vendor.id;
    let products: Vec<Product> = ["Wax print", "Raffia bag"]
      .iter()
      .map(|name| Product {
        id: Uuid::new_v4(),
        vendor_id,
        name: name.to_string(),
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
      vendor_id,
      status,
      delivery_method: method,
      delivery_fee: 1_500,
      pickup_city: "douala".to_string(),
      pickup_address: "Marché Central".to_string(),
      dropoff_city: "Douala".to_string(),
      dropoff_address: "Bonamoussadi".to_string(),
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
    self
      .store
      .with_state(move |s| {
        for p in products {
          s.products.insert(p.id, p);
        }
        s.orders.insert(order.id, order);
      })
      .await;
    order_id
  }

  pub async fn seed_wallet(&self, available: i64) -> VendorWallet {
    let mut wallet = VendorWallet::open(self.vendor.id, Utc::now());
    wallet.available_balance = available;
    let stored = wallet.clone();
    self.store.with_state(move |s| s.wallets.insert(stored.vendor_id, stored)).await;
    wallet
  }

  pub async fn seed_profile(&self) {
    let profile = VendorPayoutProfile {
      vendor_id: self.vendor.id,
      method: PayoutMethod::MtnMomo,
      phone: "237677123456".to_string(),
      legal_name: "Ngono Boutique".to_string(),
      updated_at: Utc::now(),
    };
    self
      .store
      .with_state(move |s| s.payout_profiles.insert(profile.vendor_id, profile))
      .await;
  }

  pub async fn seed_payout(&self, wallet: &VendorWallet, status: PayoutStatus, amount: i64) -> Payout {
    let now = Utc::now();
    let payout = Payout {
      id: Uuid::new_v4(),
      vendor_id: self.vendor.id,
      wallet_id: wallet.id,
      amount,
      method: PayoutMethod::MtnMomo,
      destination_phone: "237677123456".to_string(),
      beneficiary_name: "Ngono Boutique".to_string(),
      app_transaction_ref: Payout::new_app_reference(),
      provider_ref: (status == PayoutStatus::Processing).then(|| "PRV-1".to_string()),
      provider_raw: None,
      failure_reason: (status == PayoutStatus::Failed).then(|| "Provider call failed: timeout".to_string()),
      status,
      requested_at: now,
      processed_at: (status == PayoutStatus::Processing).then_some(now),
      completed_at: None,
      failed_at: (status == PayoutStatus::Failed).then_some(now),
      updated_at: now,
    };
    let stored = payout.clone();
    self.store.with_state(move |s| s.payouts.insert(stored.id, stored)).await;
    payout
  }

  pub async fn vendor_wallet(&self) -> VendorWallet {
    self
      .store
      .snapshot()
      .await
      .wallets
      .get(&self.vendor.id)
      .cloned()
      .unwrap_or_else(|| VendorWallet::open(self.vendor.id, Utc::now()))
  }
}
