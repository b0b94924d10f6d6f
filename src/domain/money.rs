use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::Error;

/// Strictly positive amount of a ledger movement, kept at minor-unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const DECIMALS: u32 = 2; // paise / cents

    /// Rounds half-to-even to [`Money::DECIMALS`] and rejects anything not above zero.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        let rounded =
            value.round_dp_with_strategy(Self::DECIMALS, RoundingStrategy::MidpointNearestEven);
        if rounded <= Decimal::ZERO {
            return Err(Error::InvalidAmount(value.to_string()));
        }
        Ok(Self(rounded))
    }

    pub fn from_minor(minor: i64) -> Result<Self, Error> {
        Self::new(Decimal::new(minor, Self::DECIMALS))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn from_decimal_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        let value = Decimal::from_str(s).map_err(|_| Error::InvalidAmount(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_decimal_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("Invalid Money format: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::Money;
    use rust_decimal::Decimal;

    #[test]
    fn bankers_round_half_even() {
        let v = Money::from_decimal_str("1.225").unwrap(); // 1.225 -> 1.22
        assert_eq!(format!("{}", v), "1.22");
        let v = Money::from_decimal_str("1.235").unwrap(); // 1.235 -> 1.24
        assert_eq!(format!("{}", v), "1.24");
        let v = Money::from_decimal_str(" 10000 ").unwrap();
        assert_eq!(format!("{}", v), "10000.00");
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(Money::new(Decimal::ZERO).is_err());
        assert!(Money::from_decimal_str("-5").is_err());
        // rounds to zero at two decimals
        assert!(Money::from_decimal_str("0.004").is_err());
        assert!(Money::from_decimal_str("abc").is_err());
    }

    #[test]
    fn minor_units() {
        let v = Money::from_minor(150).unwrap();
        assert_eq!(v.amount(), Decimal::new(150, 2));
        assert!(Money::from_minor(0).is_err());
    }
}
