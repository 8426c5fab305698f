//! Decimal prices and store currency formatting.
//!
//! Catalog rows store bare `NUMERIC(12,2)` amounts. The currency is a store
//! setting, so a [`Price`] is only assembled when an amount is displayed or
//! summed for a cart.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., reais, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display, e.g. `R$ 1.234,56` or `$1,234.56`.
    #[must_use]
    pub fn display(&self) -> String {
        let (thousands, decimal) = self.currency_code.separators();
        let digits = format_amount(self.amount, thousands, decimal);
        match self.currency_code {
            CurrencyCode::BRL => format!("R$ {digits}"),
            CurrencyCode::USD => format!("${digits}"),
            CurrencyCode::EUR => format!("€{digits}"),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        debug_assert_eq!(self.currency_code, rhs.currency_code);
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self::new(self.amount * Decimal::from(rhs), self.currency_code)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut iter = iter.peekable();
        let currency = iter
            .peek()
            .map_or_else(CurrencyCode::default, |p| p.currency_code);
        iter.fold(Self::zero(currency), Add::add)
    }
}

/// ISO 4217 currency codes supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BRL,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Thousands and decimal separators for the currency's usual locale.
    #[must_use]
    pub const fn separators(self) -> (char, char) {
        match self {
            Self::BRL | Self::EUR => ('.', ','),
            Self::USD => (',', '.'),
        }
    }

    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BRL => "BRL",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRL" => Ok(Self::BRL),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// Round a monetary amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn format_amount(amount: Decimal, thousands: char, decimal: char) -> String {
    let rounded = round_money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(thousands);
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}{decimal}{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_display_brl() {
        let price = Price::new(dec("1234.5"), CurrencyCode::BRL);
        assert_eq!(price.display(), "R$ 1.234,50");
    }

    #[test]
    fn test_display_usd() {
        let price = Price::new(dec("1234567.891"), CurrencyCode::USD);
        assert_eq!(price.display(), "$1,234,567.89");
    }

    #[test]
    fn test_display_eur() {
        let price = Price::new(dec("1234.56"), CurrencyCode::EUR);
        assert_eq!(price.display(), "€1.234,56");
    }

    #[test]
    fn test_display_small_amounts() {
        assert_eq!(Price::new(dec("0"), CurrencyCode::BRL).display(), "R$ 0,00");
        assert_eq!(Price::new(dec("9.9"), CurrencyCode::EUR).display(), "€9,90");
        assert_eq!(Price::new(dec("999"), CurrencyCode::USD).display(), "$999.00");
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec("10.005")), dec("10.01"));
        assert_eq!(round_money(dec("10.004")), dec("10.00"));
    }

    #[test]
    fn test_sum_and_multiply() {
        let unit = Price::new(dec("19.90"), CurrencyCode::BRL);
        let total: Price = vec![unit * 2, unit].into_iter().sum();
        assert_eq!(total.amount, dec("59.70"));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("brl".parse::<CurrencyCode>().unwrap(), CurrencyCode::BRL);
        assert!("JPY".parse::<CurrencyCode>().is_err());
    }
}
