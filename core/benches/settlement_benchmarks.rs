use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jemo_core::flow::SkipCondition;
use jemo_core::model::{
  Actor, ActorRole, DeliveryMethod, KycStatus, Order, OrderItem, OrderStatus, Product, VendorAccount,
};
use jemo_core::provider::ScriptedPayoutProvider;
use jemo_core::rules::transitions::assert_order_transition;
use jemo_core::store::MemoryState;
use jemo_core::{ContextData, Flow, FlowError, MemoryStore, Settlement, SettlementConfig, StepControl};
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
struct BenchContext {
  counter: u64,
  undone: u64,
}

fn sample_order(vendor_id: Uuid, status: OrderStatus, method: DeliveryMethod) -> (Order, Vec<Product>) {
  let order_id = Uuid::new_v4();
  let products: Vec<Product> = (0..3)
    .map(|i| Product {
      id: Uuid::new_v4(),
      vendor_id,
      name: format!("Product {}", i),
      stock: 100,
    })
    .collect();
  let items = products
    .iter()
    .map(|p| OrderItem {
      id: Uuid::new_v4(),
      order_id,
      product_id: p.id,
      quantity: 2,
      unit_price: 3_000,
    })
    .collect();
  let order = Order {
    id: order_id,
    customer_id: Uuid::new_v4(),
    vendor_id,
    status,
    delivery_method: method,
    delivery_fee: 1_000,
    pickup_city: "douala".into(),
    pickup_address: "Akwa".into(),
    dropoff_city: "douala".into(),
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
  (order, products)
}

// --- Benchmark Functions ---

fn bench_transition_lookup(c: &mut Criterion) {
  let mut group = c.benchmark_group("OrderTransitionLookup");
  let roles = [ActorRole::Customer, ActorRole::Vendor, ActorRole::Agency, ActorRole::Admin];
  let orders: Vec<Order> = OrderStatus::ALL
    .iter()
    .map(|status| sample_order(Uuid::new_v4(), *status, DeliveryMethod::JemoRider).0)
    .collect();

  let checks = (roles.len() * orders.len() * OrderStatus::ALL.len()) as u64;
  group.throughput(Throughput::Elements(checks));
  group.bench_function("all_roles_all_pairs", |b| {
    b.iter(|| {
      let mut allowed = 0u32;
      for role in roles {
        for order in &orders {
          for target in OrderStatus::ALL {
            if assert_order_transition(role, order, *target).is_ok() {
              allowed += 1;
            }
          }
        }
      }
      allowed
    })
  });
  group.finish();
}

fn bench_flow_unwind(c: &mut Criterion) {
  let mut group = c.benchmark_group("FlowUnwind");
  let rt = Runtime::new().unwrap();

  for num_steps in [2usize, 5, 10].iter() {
    let step_defs: Vec<(&str, bool, Option<SkipCondition<BenchContext>>)> = (0..*num_steps)
      .map(|i| (Box::leak(format!("step_{}", i).into_boxed_str()) as &'static str, false, None))
      .collect();
    let mut flow = Flow::<BenchContext, FlowError>::new(&step_defs);
    for i in 0..*num_steps {
      let step_name = format!("step_{}", i);
      let last = i + 1 == *num_steps;
      flow.on_step(&step_name, move |ctx: ContextData<BenchContext>| async move {
        if last {
          return Err(FlowError::ConfigurationError {
            step_name: "bench".to_string(),
            message: "forced failure".to_string(),
          });
        }
        ctx.write().counter += 1;
        Ok::<_, FlowError>(StepControl::Continue)
      });
      flow.compensate_with(&step_name, |ctx: ContextData<BenchContext>| async move {
        ctx.write().undone += 1;
        Ok::<_, FlowError>(())
      });
    }
    let flow = Arc::new(flow);

    group.throughput(Throughput::Elements(*num_steps as u64));
    group.bench_with_input(BenchmarkId::new("steps", num_steps), num_steps, |b, _| {
      b.to_async(&rt).iter_batched(
        || ContextData::new(BenchContext::default()),
        |ctx| {
          let flow = flow.clone();
          async move { flow.run(ctx).await.unwrap_err() }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_confirm_order(c: &mut Criterion) {
  let mut group = c.benchmark_group("ConfirmOrder");
  let rt = Runtime::new().unwrap();
  let vendor = Actor::vendor(Uuid::new_v4());

  for method in [DeliveryMethod::VendorDelivery, DeliveryMethod::JemoRider] {
    group.bench_function(method.as_str(), |b| {
      b.to_async(&rt).iter_batched(
        || {
          let (order, products) = sample_order(vendor.id, OrderStatus::Pending, method);
          let mut state = MemoryState::default();
          state.vendors.insert(
            vendor.id,
            VendorAccount {
              id: vendor.id,
              kyc_status: KycStatus::Approved,
            },
          );
          for p in products {
            state.products.insert(p.id, p);
          }
          let order_id = order.id;
          state.orders.insert(order.id, order);
          let settlement = Settlement::new(
            Arc::new(MemoryStore::new(state)),
            Arc::new(ScriptedPayoutProvider::new()),
            SettlementConfig::default(),
          );
          (settlement, order_id)
        },
        |(settlement, order_id)| async move { settlement.confirm_order(vendor, order_id).await.unwrap() },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

criterion_group!(benches, bench_transition_lookup, bench_flow_unwind, bench_confirm_order);
criterion_main!(benches);
