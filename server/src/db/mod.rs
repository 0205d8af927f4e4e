// server/src/db/mod.rs

//! PostgreSQL implementation of the settlement storage seam.
//!
//! One `PgTx` wraps one `sqlx::Transaction`. Every `load_*` read of a row the
//! flows go on to mutate uses `FOR UPDATE`, so concurrent flows on the same
//! order, job, wallet or payout queue behind each other until commit.

mod pg_store;

pub use pg_store::{PgStore, PgTx};

use jemo_core::MarketError;

pub(crate) fn storage_error(context: &str, err: sqlx::Error) -> MarketError {
  tracing::error!(error = %err, "Database error while {}", context);
  MarketError::Storage(format!("{}: {}", context, err))
}
