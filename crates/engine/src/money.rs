use std::{
    fmt,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed cash amount in whole **rupiah**.
///
/// Rupiah has no fractional unit in day-to-day use, so amounts are plain
/// integers and every balance computation is exact.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(1_500_000);
/// assert_eq!(amount.rupiah(), 1_500_000);
/// assert_eq!(amount.to_string(), "Rp1.500.000");
/// ```
///
/// Parsing from user input (accepts `.`, `,` or `_` as thousands separators
/// and an optional `Rp` prefix):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("150000".parse::<Money>().unwrap().rupiah(), 150_000);
/// assert_eq!("Rp1.500.000".parse::<Money>().unwrap().rupiah(), 1_500_000);
/// assert!("12.5x".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn new(rupiah: i64) -> Self {
        Self(rupiah)
    }

    #[must_use]
    pub const fn rupiah(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}Rp{grouped}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a rupiah amount.
    ///
    /// Separators are only accepted between digits; fractional amounts are
    /// rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid amount: {s}"));

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix("Rp").unwrap_or(rest).trim();
        if rest.is_empty() {
            return Err(EngineError::Validation("empty amount".to_string()));
        }

        let mut digits = String::with_capacity(rest.len());
        let mut prev_digit = false;
        for ch in rest.chars() {
            match ch {
                '0'..='9' => {
                    digits.push(ch);
                    prev_digit = true;
                }
                '.' | ',' | '_' if prev_digit => prev_digit = false,
                _ => return Err(invalid()),
            }
        }
        if !prev_digit {
            return Err(invalid());
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| EngineError::Validation("amount too large".to_string()))?;
        Ok(Money(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "Rp0");
        assert_eq!(Money::new(999).to_string(), "Rp999");
        assert_eq!(Money::new(1_000).to_string(), "Rp1.000");
        assert_eq!(Money::new(850_000).to_string(), "Rp850.000");
        assert_eq!(Money::new(-1_150_000).to_string(), "-Rp1.150.000");
    }

    #[test]
    fn parse_accepts_separators_and_prefix() {
        assert_eq!("1.000.000".parse::<Money>().unwrap().rupiah(), 1_000_000);
        assert_eq!("1,000,000".parse::<Money>().unwrap().rupiah(), 1_000_000);
        assert_eq!(" Rp 25_000 ".parse::<Money>().unwrap().rupiah(), 25_000);
        assert_eq!("-500".parse::<Money>().unwrap().rupiah(), -500);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("Rp".parse::<Money>().is_err());
        assert!("1..000".parse::<Money>().is_err());
        assert!("1000.".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }
}
