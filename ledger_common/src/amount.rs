use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of decimal places carried by an [`Amount`].
pub const AMOUNT_SCALE: u32 = 6;
const MICRO_UNITS: i64 = 1_000_000;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A fixed-point monetary value with six decimal places, stored as an integer number of micro-units.
///
/// The same type is used for crypto asset amounts (USDT) and fiat amounts (BRL). Conversions to and from
/// [`Decimal`] are provided for parsing provider payloads and for computing derived values such as exchange rates and
/// commissions.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Mul<i64> for Amount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from_micro(self.value() * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountConversionError;

    /// Converts a decimal value to an amount, rounding half away from zero at the sixth decimal place.
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        value
            .checked_mul(Decimal::from(MICRO_UNITS))
            .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|v| v.to_i64())
            .map(Self)
            .ok_or_else(|| AmountConversionError(format!("{value} is out of range")))
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| AmountConversionError(format!("{s}: {e}")))?;
        Self::try_from(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

impl Amount {
    pub const fn from_micro(value: i64) -> Self {
        Self(value)
    }

    /// Creates an amount from a whole number of units, e.g. `Amount::from_units(50)` is 50.000000.
    pub const fn from_units(units: i64) -> Self {
        Self(units * MICRO_UNITS)
    }

    /// The raw value, in micro-units
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, AMOUNT_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `self / other` as a decimal, or `None` if `other` is zero.
    pub fn ratio(&self, other: Amount) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        self.to_decimal().checked_div(other.to_decimal())
    }

    /// Returns `percentage`% of this amount, rounded to the nearest micro-unit.
    pub fn percent(&self, percentage: Decimal) -> Result<Amount, AmountConversionError> {
        let value = self
            .to_decimal()
            .checked_mul(percentage)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| AmountConversionError(format!("{percentage}% of {self} overflows")))?;
        Self::try_from(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_decimal_strings() {
        assert_eq!(Amount::from_str("50").unwrap(), Amount::from_units(50));
        assert_eq!(Amount::from_str(" 0.000001 ").unwrap(), Amount::from_micro(1));
        assert_eq!(Amount::from_str("12.3456785").unwrap(), Amount::from_micro(12_345_679));
        assert!(Amount::from_str("twelve").is_err());
    }

    #[test]
    fn display_uses_two_places() {
        assert_eq!(Amount::from_units(50).to_string(), "50.00");
        assert_eq!(Amount::from_micro(1_250_000).to_string(), "1.25");
    }

    #[test]
    fn arithmetic() {
        let mut a = Amount::from_units(10);
        a += Amount::from_units(5);
        assert_eq!(a, Amount::from_units(15));
        a -= Amount::from_units(20);
        assert_eq!(a, Amount::from_units(-5));
        assert_eq!(-a, Amount::from_units(5));
        let total: Amount = [1, 2, 3].into_iter().map(Amount::from_units).sum();
        assert_eq!(total, Amount::from_units(6));
    }

    #[test]
    fn ratio_and_percent() {
        let fiat = Amount::from_units(525);
        let crypto = Amount::from_units(100);
        assert_eq!(fiat.ratio(crypto), Some(Decimal::new(525, 2)));
        assert_eq!(fiat.ratio(Amount::default()), None);
        let pct = Decimal::new(15, 1); // 1.5%
        assert_eq!(Amount::from_units(200).percent(pct).unwrap(), Amount::from_units(3));
    }

    #[test]
    fn serializes_as_micro_units() {
        let json = serde_json::to_string(&Amount::from_units(2)).unwrap();
        assert_eq!(json, "2000000");
    }
}
