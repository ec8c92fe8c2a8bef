//! Unit price representation using decimal arithmetic.
//!
//! Prices are stored as [`Decimal`] so that values read back from persisted
//! carts compare exactly, but they travel as plain JSON numbers to stay
//! compatible with carts written by the mobile client. A JSON number is an
//! `f64`, so a price is limited to [`UnitPrice::MAX_SIGNIFICANT_DIGITS`]
//! digits: every such decimal reads back from its `f64` form unchanged.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`UnitPrice`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),

    /// The amount has more digits than a JSON number carries exactly.
    #[error("price {0} has more than 15 significant digits")]
    TooPrecise(Decimal),
}

/// The non-negative price of a single unit of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Most digits a price may carry, counting integer trailing zeros.
    pub const MAX_SIGNIFICANT_DIGITS: u32 = 15;

    /// Create a new unit price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero, or
    /// [`PriceError::TooPrecise`] if it would not survive persistence as a
    /// JSON number.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if significant_digits(amount) > Self::MAX_SIGNIFICANT_DIGITS {
            return Err(PriceError::TooPrecise(amount));
        }
        Ok(Self(amount))
    }

    /// Create a unit price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Returns the amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

fn significant_digits(amount: Decimal) -> u32 {
    match amount.normalize().mantissa().unsigned_abs() {
        0 => 0,
        mantissa => mantissa.ilog10() + 1,
    }
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for UnitPrice {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl std::str::FromStr for UnitPrice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s.parse::<Decimal>().map_err(|e| e.to_string())?;
        Self::new(amount).map_err(|e| e.to_string())
    }
}

impl Serialize for UnitPrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Parsing the decimal text gives the nearest `f64`, which arithmetic
        // conversion does not promise at high scales.
        let value = self
            .0
            .to_string()
            .parse::<f64>()
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_f64(value)
    }
}

impl<'de> Deserialize<'de> for UnitPrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(D::Error::custom(format!("price {value} is not finite")));
        }
        // `f64` displays as its shortest round-trip form without an exponent.
        let amount = value
            .to_string()
            .parse::<Decimal>()
            .map_err(D::Error::custom)?;
        // Drop float noise such as 0.30000000000000004 written by other clients.
        let amount = if significant_digits(amount) > Self::MAX_SIGNIFICANT_DIGITS {
            amount
                .round_sf(Self::MAX_SIGNIFICANT_DIGITS)
                .ok_or_else(|| D::Error::custom(format!("price {value} out of range")))?
        } else {
            amount
        };
        Self::new(amount).map_err(D::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_negative() {
        let result = UnitPrice::new(Decimal::new(-1, 2));
        assert!(matches!(result, Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_new_accepts_zero() {
        assert_eq!(UnitPrice::new(Decimal::ZERO).unwrap(), UnitPrice::ZERO);
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(UnitPrice::from_cents(1999).amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(UnitPrice::from_cents(1000).to_string(), "10.00");
        assert_eq!(UnitPrice::from_cents(1999).to_string(), "19.99");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "19.99".parse::<UnitPrice>().unwrap(),
            UnitPrice::from_cents(1999)
        );
        assert!("-3".parse::<UnitPrice>().is_err());
        assert!("ten".parse::<UnitPrice>().is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(UnitPrice::from_cents(1999)).unwrap();
        assert!(json.is_number());
    }

    #[test]
    fn test_deserialize_integer_and_float() {
        let whole: UnitPrice = serde_json::from_str("10").unwrap();
        assert_eq!(whole.amount(), Decimal::new(10, 0));

        let fractional: UnitPrice = serde_json::from_str("19.99").unwrap();
        assert_eq!(fractional, UnitPrice::from_cents(1999));
    }

    #[test]
    fn test_deserialize_negative_rejected() {
        assert!(serde_json::from_str::<UnitPrice>("-5").is_err());
    }

    #[test]
    fn test_new_rejects_amounts_a_json_number_cannot_carry() {
        let long: Decimal = "0.1234567890123456789".parse().unwrap();
        assert!(matches!(
            UnitPrice::new(long),
            Err(PriceError::TooPrecise(_))
        ));

        assert!(matches!(
            UnitPrice::new(Decimal::MAX),
            Err(PriceError::TooPrecise(_))
        ));
        assert!("79228162514264337593543950335".parse::<UnitPrice>().is_err());
    }

    #[test]
    fn test_new_accepts_fifteen_digits() {
        let amount: Decimal = "1234567890.12345".parse().unwrap();
        let price = UnitPrice::new(amount).unwrap();

        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(serde_json::from_str::<UnitPrice>(&json).unwrap(), price);
    }

    #[test]
    fn test_trailing_zeros_do_not_count() {
        let amount: Decimal = "19.9900000000000000000".parse().unwrap();
        assert_eq!(UnitPrice::new(amount).unwrap(), UnitPrice::from_cents(1999));
    }

    #[test]
    fn test_deserialize_rounds_float_noise() {
        let price: UnitPrice = serde_json::from_str("0.30000000000000004").unwrap();
        assert_eq!(price, UnitPrice::from_cents(30));
    }

    #[test]
    fn test_deserialize_huge_number_rejected() {
        assert!(serde_json::from_str::<UnitPrice>("7.922816251426434e28").is_err());
        assert!(serde_json::from_str::<UnitPrice>("1e300").is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        /// Any decimal `Decimal::new` can build, with any scale it allows.
        fn any_decimal() -> impl Strategy<Value = Decimal> {
            (any::<i64>(), 0u32..=28).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
        }

        /// Decimals short enough to be accepted as prices.
        fn short_decimal() -> impl Strategy<Value = Decimal> {
            (0i64..1_000_000_000_000_000, 0u32..=28)
                .prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
        }

        proptest! {
            #[test]
            fn prop_accepted_prices_survive_json(amount in any_decimal()) {
                if let Ok(price) = UnitPrice::new(amount) {
                    prop_assert_eq!(price.amount(), amount);
                    let json = serde_json::to_string(&price).unwrap();
                    prop_assert_eq!(serde_json::from_str::<UnitPrice>(&json).unwrap(), price);
                }
            }

            #[test]
            fn prop_short_prices_are_accepted(amount in short_decimal()) {
                let price = UnitPrice::new(amount).unwrap();
                let json = serde_json::to_string(&price).unwrap();
                prop_assert_eq!(serde_json::from_str::<UnitPrice>(&json).unwrap(), price);
            }
        }
    }
}
