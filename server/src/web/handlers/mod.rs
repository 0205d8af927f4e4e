// server/src/web/handlers/mod.rs

#[cfg(test)]
#[macro_use]
pub(crate) mod test_support;

pub mod delivery_handlers;
pub mod order_handlers;
pub mod payout_handlers;
pub mod wallet_handlers;
pub mod webhook_handlers;
