// server/src/models/mod.rs

//! Database rows. Enum columns are stored as TEXT and parsed into the
//! `jemo_core::model` types on the way out.

pub mod account;
pub mod delivery;
pub mod order;
pub mod payout;
pub mod wallet;

pub use account::{AgencyRow, VendorAccountRow};
pub use delivery::DeliveryJobRow;
pub use order::{OrderItemRow, OrderRow};
pub use payout::{PayoutProfileRow, PayoutRow};
pub use wallet::{WalletRow, WalletTxRow};

use jemo_core::{MarketError, MarketResult};
use std::str::FromStr;

/// Parses a TEXT enum column. An unknown value means the row was written by
/// something else, so it is reported as a storage fault.
pub(crate) fn parse_column<T>(column: &'static str, value: &str) -> MarketResult<T>
where
  T: FromStr<Err = MarketError>,
{
  value
    .parse()
    .map_err(|_| MarketError::Storage(format!("unexpected value '{}' in column {}", value, column)))
}
