// core/src/rules/phone.rs

//! Cameroon mobile-money number validation.

use crate::error::{MarketError, MarketResult};
use crate::model::PayoutMethod;

const COUNTRY_CODE: &str = "237";

/// Operator that owns a mobile number prefix.
pub fn operator_for(national: &str) -> Option<PayoutMethod> {
  let bytes = national.as_bytes();
  if bytes.len() != 9 || bytes[0] != b'6' || !bytes.iter().all(u8::is_ascii_digit) {
    return None;
  }
  let second = bytes[1] - b'0';
  let third = bytes[2] - b'0';
  match (second, third) {
    (7, _) => Some(PayoutMethod::MtnMomo),
    (9, _) => Some(PayoutMethod::OrangeMoney),
    (5, 0..=4) | (8, 0..=4) => Some(PayoutMethod::MtnMomo),
    (5, 5..=9) | (8, 5..=9) => Some(PayoutMethod::OrangeMoney),
    _ => None,
  }
}

/// Validates `raw` for `method` and returns the `237XXXXXXXXX` form.
pub fn normalize_phone(raw: &str, method: PayoutMethod) -> MarketResult<String> {
  let mut digits: String = raw
    .trim()
    .chars()
    .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
    .collect();
  if let Some(rest) = digits.strip_prefix('+') {
    digits = rest.to_string();
  } else if let Some(rest) = digits.strip_prefix("00") {
    digits = rest.to_string();
  }

  if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
    return Err(MarketError::InvalidPhone(format!("'{}' is not a phone number", raw.trim())));
  }

  let national = match digits.len() {
    12 if digits.starts_with(COUNTRY_CODE) => &digits[3..],
    9 if digits.starts_with('6') => digits.as_str(),
    _ => {
      return Err(MarketError::InvalidPhone(format!(
        "'{}' is not a Cameroon mobile number",
        raw.trim()
      )))
    }
  };

  match operator_for(national) {
    Some(op) if op == method => Ok(format!("{}{}", COUNTRY_CODE, national)),
    Some(op) => Err(MarketError::InvalidPhone(format!(
      "number belongs to {} but the payout method is {}",
      op, method
    ))),
    None => Err(MarketError::InvalidPhone(format!(
      "'{}' does not match a supported mobile money operator",
      raw.trim()
    ))),
  }
}
