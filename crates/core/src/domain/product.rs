use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NANOS_PER_UNIT: i32 = 1_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency code `{0}` is not a 3-letter uppercase code")]
    InvalidCurrencyCode(String),
    #[error("nanos {0} is outside -999999999..=999999999")]
    NanosOutOfRange(i32),
    #[error("units {units} and nanos {nanos} have opposite signs")]
    SignMismatch { units: i64, nanos: i32 },
}

/// Monetary amount split into whole units and billionths of a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Money {
    currency_code: String,
    units: i64,
    nanos: i32,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, units: i64, nanos: i32) -> Result<Self, MoneyError> {
        let currency_code = currency_code.into();
        let valid_code = currency_code.len() == 3
            && currency_code.chars().all(|ch| ch.is_ascii_uppercase());
        if !valid_code {
            return Err(MoneyError::InvalidCurrencyCode(currency_code));
        }

        if nanos <= -NANOS_PER_UNIT || nanos >= NANOS_PER_UNIT {
            return Err(MoneyError::NanosOutOfRange(nanos));
        }

        if (units > 0 && nanos < 0) || (units < 0 && nanos > 0) {
            return Err(MoneyError::SignMismatch { units, nanos });
        }

        Ok(Self { currency_code, units, nanos })
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn nanos(&self) -> i32 {
        self.nanos
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.units) + Decimal::new(i64::from(self.nanos), 9)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub picture: String,
    pub price: Money,
    pub categories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Money, MoneyError};

    #[test]
    fn money_accepts_matching_signs_and_zero_parts() {
        assert!(Money::new("USD", 19, 990_000_000).is_ok());
        assert!(Money::new("USD", -3, -500_000_000).is_ok());
        assert!(Money::new("EUR", 0, -10).is_ok());
        assert!(Money::new("JPY", 1200, 0).is_ok());
    }

    #[test]
    fn money_rejects_invalid_currency_codes() {
        assert_eq!(
            Money::new("usd", 1, 0),
            Err(MoneyError::InvalidCurrencyCode("usd".to_string()))
        );
        assert!(matches!(Money::new("DOLLAR", 1, 0), Err(MoneyError::InvalidCurrencyCode(_))));
        assert!(matches!(Money::new("", 1, 0), Err(MoneyError::InvalidCurrencyCode(_))));
    }

    #[test]
    fn money_rejects_out_of_range_nanos_and_sign_mismatch() {
        assert_eq!(Money::new("USD", 1, 1_000_000_000), Err(MoneyError::NanosOutOfRange(1_000_000_000)));
        assert_eq!(
            Money::new("USD", 2, -1),
            Err(MoneyError::SignMismatch { units: 2, nanos: -1 })
        );
    }

    #[test]
    fn money_converts_to_decimal() {
        let price = Money::new("USD", 19, 990_000_000).expect("valid money");
        assert_eq!(price.to_decimal(), Decimal::new(1999, 2));

        let refund = Money::new("USD", -3, -250_000_000).expect("valid money");
        assert_eq!(refund.to_decimal(), Decimal::new(-325, 2));
    }
}
