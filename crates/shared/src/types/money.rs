//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` and rounds to the currency's
//! decimal places with banker's rounding (`MidpointNearestEven`) only when a
//! value is constructed or explicitly rounded.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by money arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Two operands carry different currencies.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        expected: CurrencyCode,
        /// Currency of the right operand.
        actual: CurrencyCode,
    },

    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    /// Division by zero.
    #[error("Division by zero")]
    DivisionByZero,
}

/// ISO 4217 alphabetic currency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Parses a three-letter code, upper-casing it.
    pub fn new(code: &str) -> Result<Self, MoneyError> {
        let bytes = code.trim().as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(MoneyError::InvalidCurrencyCode(code.to_string()));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.as_str().to_string()
    }
}

/// A currency together with the number of decimal places amounts are kept at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonetaryCurrency {
    /// ISO code.
    pub code: CurrencyCode,
    /// Digits after the decimal point.
    pub decimal_places: u32,
}

impl MonetaryCurrency {
    /// Creates a currency descriptor.
    #[must_use]
    pub const fn new(code: CurrencyCode, decimal_places: u32) -> Self {
        Self {
            code,
            decimal_places,
        }
    }

    /// Rounds an amount to this currency using banker's rounding.
    #[must_use]
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointNearestEven)
    }
}

impl std::fmt::Display for MonetaryCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Represents a monetary amount with currency.
///
/// Binary operations between two `Money` values require the same currency
/// and fail with [`MoneyError::CurrencyMismatch`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: MonetaryCurrency,
}

impl Money {
    /// Creates a money value, rounding the amount to the currency.
    #[must_use]
    pub fn of(currency: MonetaryCurrency, amount: Decimal) -> Self {
        Self {
            amount: currency.round(amount),
            currency,
        }
    }

    /// Creates a money value from an optional amount, treating `None` as zero.
    #[must_use]
    pub fn of_optional(currency: MonetaryCurrency, amount: Option<Decimal>) -> Self {
        Self::of(currency, amount.unwrap_or_default())
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub const fn zero(currency: MonetaryCurrency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// The amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency.
    #[must_use]
    pub const fn currency(&self) -> MonetaryCurrency {
        self.currency
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub fn is_greater_than_zero(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative.
    #[must_use]
    pub fn is_less_than_zero(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Adds another money value of the same currency.
    pub fn plus(self, other: Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(&other)?;
        Ok(Self::of(self.currency, self.amount + other.amount))
    }

    /// Subtracts another money value of the same currency.
    pub fn minus(self, other: Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(&other)?;
        Ok(Self::of(self.currency, self.amount - other.amount))
    }

    /// Adds a raw amount expressed in this currency.
    #[must_use]
    pub fn plus_amount(self, amount: Decimal) -> Self {
        Self::of(self.currency, self.amount + amount)
    }

    /// Subtracts a raw amount expressed in this currency.
    #[must_use]
    pub fn minus_amount(self, amount: Decimal) -> Self {
        Self::of(self.currency, self.amount - amount)
    }

    /// Multiplies by a factor, rounding the product.
    #[must_use]
    pub fn multiplied_by(self, factor: Decimal) -> Self {
        Self::of(self.currency, self.amount * factor)
    }

    /// Divides by a divisor, rounding the quotient.
    pub fn divided_by(self, divisor: Decimal) -> Result<Self, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(Self::of(self.currency, self.amount / divisor))
    }

    /// Compares two money values of the same currency.
    pub fn is_greater_than(&self, other: &Self) -> Result<bool, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount > other.amount)
    }

    /// Returns the smaller of two money values of the same currency.
    pub fn min(self, other: Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(&other)?;
        Ok(if other.amount < self.amount { other } else { self })
    }

    /// Clamps negative amounts to zero.
    #[must_use]
    pub fn zero_if_negative(self) -> Self {
        if self.is_less_than_zero() {
            Self::zero(self.currency)
        } else {
            self
        }
    }

    /// Flips the sign.
    #[must_use]
    pub fn negated(self) -> Self {
        Self {
            amount: -self.amount,
            currency: self.currency,
        }
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency.code == other.currency.code {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                expected: self.currency.code,
                actual: other.currency.code,
            })
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.currency.code, self.amount)
    }
}
