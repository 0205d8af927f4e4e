// core/src/model/mod.rs

//! Settlement entities: orders, delivery jobs, wallets, payouts and the
//! accounts that act on them. Amounts are whole XAF in `i64`.

/// Gives a fieldless enum its stored text form: `as_str`, `Display` and a
/// `FromStr` that rejects unknown values with a validation error.
macro_rules! text_enum {
  ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl std::str::FromStr for $name {
      type Err = crate::error::MarketError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($text => Ok($name::$variant),)+
          other => Err(crate::error::MarketError::Validation(format!(
            "unknown {} value '{}'",
            stringify!($name),
            other
          ))),
        }
      }
    }
  };
}

pub(crate) use text_enum;

pub mod actor;
pub mod delivery;
pub mod order;
pub mod payout;
pub mod wallet;

pub use actor::{Actor, ActorRole, AgencyAccount, KycStatus, VendorAccount};
pub use delivery::{DeliveryJob, DeliveryJobLog, DeliveryJobStatus, JobLogAction};
pub use order::{DeliveryMethod, Order, OrderItem, OrderStatus, Product};
pub use payout::{Payout, PayoutMethod, PayoutStatus, VendorPayoutProfile};
pub use wallet::{VendorWallet, WalletTransaction, WalletTxStatus, WalletTxType};
