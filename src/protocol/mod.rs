//! Protocol Validators (C6), spec.md §4.6. Each validator is a pure-ish
//! async function returning `Result<Outcome<Record>, Error>`: upstream/store
//! failures propagate as `Err`, rule violations come back as
//! `Outcome::Invalid` — never conflated, per §4.6.5 and the teacher's
//! `process_deploy`/`process_mint` split between `Err(Error<L>)` (call
//! failed) and a typed negative `BRC20Event` variant (rule failed).

pub mod bitmap;
pub mod brc420;
pub mod parcel;

use crate::error::Reason;
use bigdecimal::{num_bigint::BigInt, BigDecimal, ToPrimitive};
use std::str::FromStr;

/// Parses a JSON number or numeric string as a positive decimal and
/// converts it to an integer satoshi count (`floor(price * 1e8)`), per §3's
/// resolution of Open Question 1. Returns `None` if the value is not a
/// positive decimal. Works from the decimal's exact `(digits, exponent)`
/// pair rather than `BigDecimal`'s own rescaling, so the rounding is
/// unambiguously a floor regardless of the crate's default rounding mode.
pub fn decimal_to_sats(value: &serde_json::Value) -> Option<u64> {
  let text = match value {
    serde_json::Value::Number(n) => n.to_string(),
    serde_json::Value::String(s) => s.clone(),
    _ => return None,
  };
  let decimal = BigDecimal::from_str(&text).ok()?;
  if decimal <= BigDecimal::from(0) {
    return None;
  }
  let (digits, exponent) = decimal.as_bigint_and_exponent();
  let scaled = if exponent <= 8 {
    digits * pow10((8 - exponent) as u32)
  } else {
    digits / pow10((exponent - 8) as u32)
  };
  scaled.to_u64()
}

fn pow10(exponent: u32) -> BigInt {
  let mut result = BigInt::from(1);
  for _ in 0..exponent {
    result *= 10;
  }
  result
}

/// Parses a JSON number or numeric string as a positive integer, for
/// payload fields like `max` (§4.6.1 step 4).
pub fn positive_int(value: &serde_json::Value) -> Option<u64> {
  match value {
    serde_json::Value::Number(n) => n.as_u64().filter(|v| *v > 0),
    serde_json::Value::String(s) => s.parse::<u64>().ok().filter(|v| *v > 0),
    _ => None,
  }
}

pub(crate) fn invalid<T>(reason: impl Into<String>) -> crate::error::Outcome<T> {
  crate::error::Outcome::Invalid(Reason::new(reason))
}

#[cfg(test)]
mod test {
  use super::*;
  use serde_json::json;

  #[test]
  fn decimal_to_sats_handles_fractional_btc() {
    assert_eq!(decimal_to_sats(&json!(0.001)), Some(100_000));
    assert_eq!(decimal_to_sats(&json!("0.001")), Some(100_000));
  }

  #[test]
  fn decimal_to_sats_rejects_non_positive() {
    assert_eq!(decimal_to_sats(&json!(0)), None);
    assert_eq!(decimal_to_sats(&json!(-1.0)), None);
  }

  #[test]
  fn positive_int_rejects_zero_and_strings_that_are_not_integers() {
    assert_eq!(positive_int(&json!(100)), Some(100));
    assert_eq!(positive_int(&json!(0)), None);
    assert_eq!(positive_int(&json!("abc")), None);
  }
}
