// core/src/lib.rs

//! Jemo settlement core.
//!
//! Order, delivery-job and payout state machines for the Jemo marketplace,
//! with the money movements that go with them:
//!  - Role-gated order transitions with their side effects (delivery job
//!    creation, stock restoration, vendor earnings).
//!  - A delivery job lifecycle where the first agency to accept wins.
//!  - Withdrawal and payout-retry sagas around an external mobile-money
//!    provider: reserve, call, then confirm or compensate.
//!  - Withdrawal lock/unlock and the KYC / agency access gate.
//!
//! Operations run as step flows (`flow`) over a transactional storage seam
//! (`store`) and a provider seam (`provider`). The HTTP server and the
//! PostgreSQL store live in the `jemo_api` crate.

pub mod error;
pub mod flow;
pub mod model;
pub mod provider;
pub mod rules;
pub mod settlement;
pub mod store;

pub use crate::error::{ErrorKind, FlowError, MarketError, MarketResult};
pub use crate::flow::{ContextData, Flow, FlowOutcome, FlowRegistry, StepControl};
pub use crate::provider::{PayoutInstruction, PayoutProvider, ProviderReply, ProviderResponse, TransferState};
pub use crate::settlement::contexts::PayoutLookup;
pub use crate::settlement::{Settlement, SettlementConfig, SettlementDeps};
pub use crate::store::{MarketStore, MemoryStore, StoreTx};
