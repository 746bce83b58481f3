//! Fixed-point money amounts in øre (NOK minor units).
//!
//! All money math in the domain happens on integer øre. Decimal input only
//! exists at the boundary (JSON numbers, user-entered strings) and is
//! converted here, once.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// A non-negative NOK amount, stored as whole øre.
///
/// Serialized as a bare integer (øre). Formatting for display (locale,
/// "kr" suffix) is a presentation concern and lives outside the domain.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_ore(ore: u64) -> Self {
        Self(ore)
    }

    /// Whole kroner, no øre part.
    pub const fn from_nok(kroner: u64) -> Self {
        Self(kroner * 100)
    }

    pub const fn as_ore(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// Multiply by a unit count (e.g. line quantity).
    pub fn times(self, quantity: u64) -> Money {
        Money(self.0.saturating_mul(quantity))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a user-entered decimal NOK amount ("250.50", "250,5", "100").
    ///
    /// Accepts at most two decimals; both '.' and ',' separate the øre part.
    pub fn parse_nok(input: &str) -> Result<Self, DomainError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(DomainError::validation("amount must not be empty"));
        }

        let (kroner_part, ore_part) = match s.split_once(['.', ',']) {
            Some((k, o)) => (k, Some(o)),
            None => (s, None),
        };

        if kroner_part.is_empty() || !kroner_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "malformed amount: {input:?}"
            )));
        }

        let kroner: u64 = kroner_part
            .parse()
            .map_err(|_| DomainError::validation(format!("amount out of range: {input:?}")))?;

        let ore = match ore_part {
            None => 0,
            Some(frac) => {
                if frac.is_empty()
                    || frac.len() > 2
                    || !frac.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(DomainError::validation(format!(
                        "malformed amount: {input:?}"
                    )));
                }
                let digits: u64 = frac
                    .parse()
                    .map_err(|_| DomainError::validation(format!("malformed amount: {input:?}")))?;
                if frac.len() == 1 { digits * 10 } else { digits }
            }
        };

        kroner
            .checked_mul(100)
            .and_then(|k| k.checked_add(ore))
            .map(Money)
            .ok_or_else(|| DomainError::validation(format!("amount out of range: {input:?}")))
    }

    /// Convert a JSON number (decimal kroner) to øre, rounding half-up.
    ///
    /// The remote store serves unit prices as plain decimals; this is the
    /// single conversion point into fixed-point math.
    pub fn from_nok_f64(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::validation(format!(
                "amount must be a non-negative number, got {value}"
            )));
        }
        let ore = (value * 100.0).round();
        if ore > u64::MAX as f64 {
            return Err(DomainError::validation(format!(
                "amount out of range: {value}"
            )));
        }
        Ok(Money(ore as u64))
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nok_accepts_whole_and_decimal_amounts() {
        assert_eq!(Money::parse_nok("100").unwrap(), Money::from_ore(10_000));
        assert_eq!(Money::parse_nok("250.50").unwrap(), Money::from_ore(25_050));
        assert_eq!(Money::parse_nok("250,5").unwrap(), Money::from_ore(25_050));
        assert_eq!(Money::parse_nok("0.05").unwrap(), Money::from_ore(5));
        assert_eq!(Money::parse_nok(" 7 ").unwrap(), Money::from_ore(700));
    }

    #[test]
    fn parse_nok_rejects_malformed_input() {
        for bad in ["", "abc", "1.234", "1..2", "-5", "5.", ".5", "1,2,3"] {
            assert!(Money::parse_nok(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn from_nok_f64_rounds_half_up_to_ore() {
        assert_eq!(Money::from_nok_f64(50.5).unwrap(), Money::from_ore(5_050));
        assert_eq!(Money::from_nok_f64(0.005).unwrap(), Money::from_ore(1));
        assert_eq!(Money::from_nok_f64(0.004).unwrap(), Money::from_ore(0));
    }

    #[test]
    fn from_nok_f64_rejects_negative_and_non_finite() {
        assert!(Money::from_nok_f64(-1.0).is_err());
        assert!(Money::from_nok_f64(f64::NAN).is_err());
        assert!(Money::from_nok_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn times_and_add_stay_in_ore() {
        let unit = Money::parse_nok("50.50").unwrap();
        let total = unit.times(3).saturating_add(Money::from_nok(1));
        assert_eq!(total, Money::from_ore(15_250));
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_ore(25_050).to_string(), "250.50");
        assert_eq!(Money::from_ore(5).to_string(), "0.05");
    }
}
