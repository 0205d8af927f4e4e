// server/src/models/account.rs

use super::parse_column;
use jemo_core::model::{AgencyAccount, VendorAccount};
use jemo_core::MarketError;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct VendorAccountRow {
  pub id: Uuid,
  pub kyc_status: String,
}

impl TryFrom<VendorAccountRow> for VendorAccount {
  type Error = MarketError;

  fn try_from(row: VendorAccountRow) -> Result<Self, Self::Error> {
    Ok(VendorAccount {
      id: row.id,
      kyc_status: parse_column("vendors.kyc_status", &row.kyc_status)?,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct AgencyRow {
  pub id: Uuid,
  pub name: String,
  pub is_active: bool,
  pub cities_covered: Vec<String>,
}

impl From<AgencyRow> for AgencyAccount {
  fn from(row: AgencyRow) -> Self {
    AgencyAccount {
      id: row.id,
      name: row.name,
      is_active: row.is_active,
      cities_covered: row.cities_covered,
    }
  }
}
