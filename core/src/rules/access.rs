// core/src/rules/access.rs

use crate::error::{MarketError, MarketResult};
use crate::model::{Actor, ActorRole, AgencyAccount, KycStatus, VendorAccount};

/// Read-time gate on vendor and agency accounts. A missing account counts as
/// not approved / not active.
pub fn assert_account_access(
  actor: &Actor,
  vendor: Option<&VendorAccount>,
  agency: Option<&AgencyAccount>,
) -> MarketResult<()> {
  match actor.role {
    ActorRole::Customer | ActorRole::Admin | ActorRole::System => Ok(()),
    ActorRole::Vendor => match vendor {
      Some(v) if v.kyc_status == KycStatus::Approved => Ok(()),
      _ => Err(MarketError::KycNotApproved),
    },
    ActorRole::Agency => match agency {
      Some(a) if a.is_active => Ok(()),
      _ => Err(MarketError::AgencyInactive),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn vendor_needs_approved_kyc() {
    let id = Uuid::new_v4();
    let actor = Actor::vendor(id);
    for (status, ok) in [(KycStatus::Approved, true), (KycStatus::Pending, false), (KycStatus::Rejected, false)] {
      let account = VendorAccount { id, kyc_status: status };
      assert_eq!(assert_account_access(&actor, Some(&account), None).is_ok(), ok);
    }
    assert_eq!(assert_account_access(&actor, None, None).unwrap_err().code(), "KYC_NOT_APPROVED");
  }

  #[test]
  fn agency_needs_active_record() {
    let id = Uuid::new_v4();
    let actor = Actor::agency(id);
    let mut account = AgencyAccount {
      id,
      name: "Moto Express".into(),
      is_active: true,
      cities_covered: vec!["Douala".into()],
    };
    assert!(assert_account_access(&actor, None, Some(&account)).is_ok());
    account.is_active = false;
    assert_eq!(assert_account_access(&actor, None, Some(&account)).unwrap_err().code(), "AGENCY_INACTIVE");
  }

  #[test]
  fn customers_admins_and_system_bypass() {
    assert!(assert_account_access(&Actor::customer(Uuid::new_v4()), None, None).is_ok());
    assert!(assert_account_access(&Actor::admin(Uuid::new_v4()), None, None).is_ok());
    assert!(assert_account_access(&Actor::system(), None, None).is_ok());
  }
}
