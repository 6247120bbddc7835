//! Money types with precise decimal arithmetic
//!
//! Installment schedules must add up to the plan total to the cent, so every
//! amount in the system is a `Money` backed by `rust_decimal` and tagged with
//! its currency. Operations that could mix currencies are checked and return
//! `MoneyError` instead of panicking.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Mexican peso, the default for construction contracts
    MXN,
    USD,
    EUR,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::MXN => "$",
            Currency::USD => "US$",
            Currency::EUR => "€",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::MXN => "MXN",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::MXN
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MXN" => Ok(Currency::MXN),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// A monetary amount with associated currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates Money from an integer amount in minor units (e.g., centavos)
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self::new(Decimal::new(minor_units, currency.decimal_places()), currency)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self::new(dec!(0), currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Returns true if the amount carries no digits beyond the currency's minor unit
    pub fn has_currency_precision(&self) -> bool {
        self.amount.normalize().scale() <= self.currency.decimal_places()
    }

    /// Rounds half away from zero to the currency's minor unit
    pub fn round_to_currency(&self) -> Self {
        Self::new(
            self.amount.round_dp_with_strategy(
                self.currency.decimal_places(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            self.currency,
        )
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| overflow("adding", self, other.amount))?;
        Ok(Self::new(amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| overflow("subtracting", self, other.amount))?;
        Ok(Self::new(amount, self.currency))
    }

    /// Returns `percent`% of this amount, rounded to the currency's minor unit
    pub fn percentage(&self, percent: Decimal) -> Result<Money, MoneyError> {
        let amount = self
            .amount
            .checked_mul(percent)
            .and_then(|scaled| scaled.checked_div(dec!(100)))
            .ok_or_else(|| overflow("taking a percentage of", self, percent))?;
        Ok(Self::new(amount, self.currency).round_to_currency())
    }

    /// Splits the amount into `parts` shares that add up exactly to `self`
    ///
    /// Every share but the last is the even share truncated to the currency's
    /// minor unit; the last share absorbs whatever truncation left over, so it
    /// is never smaller than the others.
    pub fn split_with_remainder(&self, parts: u32) -> Result<Vec<Money>, MoneyError> {
        if parts == 0 {
            return Err(MoneyError::DivisionByZero);
        }
        if self.is_negative() {
            return Err(MoneyError::InvalidAmount(format!(
                "cannot split negative amount {}",
                self
            )));
        }

        let share = (self.amount / Decimal::from(parts))
            .round_dp_with_strategy(self.currency.decimal_places(), RoundingStrategy::ToZero);
        let last = share
            .checked_mul(Decimal::from(parts - 1))
            .and_then(|allocated| self.amount.checked_sub(allocated))
            .ok_or_else(|| overflow("splitting", self, Decimal::from(parts)))?;

        let mut shares = vec![Self::new(share, self.currency); (parts - 1) as usize];
        shares.push(Self::new(last, self.currency));
        Ok(shares)
    }

    /// Sums an iterator of amounts, all of which must be in `currency`
    pub fn sum<'a, I>(items: I, currency: Currency) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }
}

fn overflow(operation: &str, money: &Money, operand: Decimal) -> MoneyError {
    MoneyError::InvalidAmount(format!("{} {} and {} is out of range", operation, money, operand))
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{}{:.dp$} {}",
            self.currency.symbol(),
            self.amount,
            self.currency.code(),
            dp = dp as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(10050, Currency::MXN);
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_currency_mismatch() {
        let mxn = Money::new(dec!(100), Currency::MXN);
        let usd = Money::new(dec!(100), Currency::USD);

        let result = mxn.checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_percentage_rounds_to_cents() {
        let total = Money::new(dec!(1000.01), Currency::MXN);
        assert_eq!(total.percentage(dec!(30)).unwrap().amount(), dec!(300.00));
        assert_eq!(total.percentage(dec!(50)).unwrap().amount(), dec!(500.01));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let huge = Money::new(Decimal::MAX, Currency::MXN);
        let one = Money::new(dec!(1), Currency::MXN);

        assert!(matches!(huge.percentage(dec!(30)), Err(MoneyError::InvalidAmount(_))));
        assert!(matches!(huge.checked_add(&one), Err(MoneyError::InvalidAmount(_))));
        assert!(matches!(
            Money::new(Decimal::MIN, Currency::MXN).checked_sub(&one),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert!(matches!(
            Money::sum([huge, one].iter(), Currency::MXN),
            Err(MoneyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_split_last_share_absorbs_remainder() {
        let m = Money::new(dec!(100.00), Currency::MXN);
        let parts = m.split_with_remainder(3).unwrap();

        assert_eq!(parts[0].amount(), dec!(33.33));
        assert_eq!(parts[1].amount(), dec!(33.33));
        assert_eq!(parts[2].amount(), dec!(33.34));
    }

    #[test]
    fn test_split_zero_parts() {
        let m = Money::new(dec!(10), Currency::MXN);
        assert_eq!(m.split_with_remainder(0), Err(MoneyError::DivisionByZero));
    }

    #[test]
    fn test_precision_check() {
        assert!(Money::new(dec!(10.50), Currency::MXN).has_currency_precision());
        assert!(Money::new(dec!(10.5000), Currency::MXN).has_currency_precision());
        assert!(!Money::new(dec!(10.505), Currency::MXN).has_currency_precision());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("mxn".parse::<Currency>().unwrap(), Currency::MXN);
        assert!("XYZ".parse::<Currency>().is_err());
    }
}
