// server/src/services/mod.rs

pub mod payout_gateway;

pub use payout_gateway::HttpPayoutProvider;
