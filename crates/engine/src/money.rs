use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::{Currency, EngineError, ResultEngine};

/// Money amount represented as **integer minor units** of a currency.
///
/// Use this type when converting between human amounts (`"12.34"`) and the
/// stored `amount_minor` columns, so no floating-point value ever reaches the
/// database.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34, Currency::Usd);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34 USD");
/// assert_eq!(amount.amount_string(), "12.34");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Converts a decimal major-unit amount, rounding half away from zero to
    /// the currency's minor units.
    pub fn from_decimal(amount: Decimal, currency: Currency) -> ResultEngine<Self> {
        let scale = Decimal::from(10_i64.pow(currency.minor_units()));
        let minor = amount
            .checked_mul(scale)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
        Ok(Self { minor, currency })
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.minor, self.currency.minor_units())
    }

    /// Amount without the currency code, always with the currency's fraction
    /// digits (`"5.00"`, `"-0.10"`, `"1200"` for JPY).
    #[must_use]
    pub fn amount_string(self) -> String {
        let units = self.currency.minor_units() as usize;
        format!("{:.units$}", self.to_decimal())
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, minor: i64) -> Option<Money> {
        self.minor.checked_add(minor).map(|minor| Money {
            minor,
            currency: self.currency,
        })
    }
}

/// Add two minor-unit amounts, failing instead of wrapping.
pub(crate) fn add_minor(a: i64, b: i64) -> ResultEngine<i64> {
    a.checked_add(b)
        .ok_or_else(|| EngineError::InvalidAmount("total is out of range".to_string()))
}

/// Sum minor-unit amounts, failing instead of wrapping.
pub(crate) fn total_minor(amounts: impl IntoIterator<Item = i64>) -> ResultEngine<i64> {
    amounts.into_iter().try_fold(0, add_minor)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_string(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Money::new(0, Currency::Usd).to_string(), "0.00 USD");
        assert_eq!(Money::new(1, Currency::Usd).to_string(), "0.01 USD");
        assert_eq!(Money::new(10, Currency::Eur).to_string(), "0.10 EUR");
        assert_eq!(Money::new(-1050, Currency::Inr).to_string(), "-10.50 INR");
        assert_eq!(Money::new(1200, Currency::Jpy).to_string(), "1200 JPY");
    }

    #[test]
    fn from_decimal_rounds_half_away_from_zero() {
        let dec = Decimal::from_str("10.005").unwrap();
        assert_eq!(Money::from_decimal(dec, Currency::Usd).unwrap().minor(), 1001);
        let dec = Decimal::from_str("-0.125").unwrap();
        assert_eq!(Money::from_decimal(dec, Currency::Usd).unwrap().minor(), -13);
        let dec = Decimal::from_str("1200.4").unwrap();
        assert_eq!(Money::from_decimal(dec, Currency::Jpy).unwrap().minor(), 1200);
    }

    #[test]
    fn from_decimal_rejects_overflowing_scale() {
        assert!(matches!(
            Money::from_decimal(Decimal::MAX, Currency::Usd),
            Err(EngineError::InvalidAmount(_))
        ));
        assert_eq!(
            Money::from_decimal(Decimal::MAX, Currency::Jpy),
            Err(EngineError::InvalidAmount("amount too large".to_string()))
        );
    }

    #[test]
    fn totals_fail_instead_of_wrapping() {
        assert_eq!(total_minor([1, 2, 3]).unwrap(), 6);
        assert_eq!(total_minor([]).unwrap(), 0);
        assert!(matches!(
            total_minor([i64::MAX, 1]),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(add_minor(i64::MIN, -1).is_err());
    }

    #[test]
    fn tiny_amounts_round_to_zero() {
        let dec = Decimal::from_str("0.001").unwrap();
        assert_eq!(Money::from_decimal(dec, Currency::Usd).unwrap().minor(), 0);
    }
}
