//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL slug value object: lowercase ascii letters, digits and dashes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(SlugError::Empty); }
        if value.len() > 255 { return Err(SlugError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(value))
    }

    /// Derives a slug from a display name: "Summer Hats!" becomes "summer-hats".
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
        }
        Self::new(out.trim_end_matches('-'))
    }

    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Slug is required"),
            Self::TooLong => write!(f, "Slug is too long"),
            Self::InvalidCharacter => write!(f, "Slug may only contain lowercase letters, digits and dashes"),
        }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_lowercase() } }
    pub fn currency(&self) -> &str { &self.currency }

    /// Amount in the currency's minor unit (cents), rounded half away from zero.
    pub fn minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.round_dp(2), self.currency.to_uppercase())
    }
}

/// Sum of `price × quantity` over the given lines.
pub fn line_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines.into_iter().fold(Decimal::ZERO, |acc, (price, qty)| acc + price * Decimal::from(qty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_slug() {
        assert_eq!(Slug::new(" Hats-2 ").unwrap().as_str(), "hats-2");
        assert_eq!(Slug::new("").unwrap_err(), SlugError::Empty);
        assert_eq!(Slug::new("a b").unwrap_err(), SlugError::InvalidCharacter);
        assert_eq!(Slug::from_name("Summer  Hats!").unwrap().as_str(), "summer-hats");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::new(dec!(35.00), "USD").minor_units(), Some(3500));
        assert_eq!(Money::new(dec!(19.995), "usd").minor_units(), Some(2000));
        assert_eq!(Money::new(dec!(0.1), "usd").minor_units(), Some(10));
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total([(dec!(10.00), 2), (dec!(15.00), 1)]), dec!(35.00));
        assert_eq!(line_total(std::iter::empty()), Decimal::ZERO);
    }
}
