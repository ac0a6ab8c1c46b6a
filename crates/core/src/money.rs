//! Money value object.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Signed money amount in **integer cents**.
///
/// All balances, shares and transfers use this type, so zero-sum checks and
/// settlement termination are exact comparisons.
///
/// ```rust
/// use tripsplit_core::Money;
///
/// let amount: Money = "12,5".parse().unwrap();
/// assert_eq!(amount.cents(), 1250);
/// assert_eq!(amount.to_string(), "12.50");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// One cent. Balances strictly smaller than this in absolute value are settled.
    pub const CENT: Money = Money(1);

    /// Largest magnitude accepted for a single expense (100 billion in major
    /// units). Sums of such amounts stay far inside the `i64` range.
    pub const MAX_AMOUNT: Money = Money(10_000_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Convert a floating amount in major units (as received over JSON) to
    /// cents, rounding half away from zero.
    ///
    /// Returns `None` for non-finite values or values outside the `i64` range.
    pub fn from_major(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Saturates at `i64::MAX` for `i64::MIN`.
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    pub const fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    pub const fn saturating_sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }

    /// Whether a single expense may carry this amount.
    pub const fn is_within_limit(self) -> bool {
        self.0.unsigned_abs() <= Self::MAX_AMOUNT.0 as u64
    }

    /// Split into `parts` shares that differ by at most one cent and sum to
    /// `self` exactly. The leading shares carry the remainder.
    ///
    /// `parts == 0` yields an empty vector.
    pub fn split_even(self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let n = parts as i64;
        let base = self.0 / n;
        let remainder = self.0 % n;
        let step = remainder.signum();
        let extra = remainder.unsigned_abs() as usize;

        (0..parts)
            .map(|i| if i < extra { Money(base + step) } else { Money(base) })
            .collect()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Parse a decimal string in major units.
    ///
    /// Accepts `.` or `,` as decimal separator, an optional leading sign and at
    /// most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("invalid amount: {s:?}"));

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if rest.is_empty() {
            return Err(invalid());
        }

        let rest = rest.replace(',', ".");
        let (units, fraction) = match rest.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (rest.as_str(), ""),
        };

        if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => fraction.parse::<i64>().map_err(|_| invalid())?,
            _ => {
                return Err(DomainError::validation(format!(
                    "amount has more than two decimals: {s:?}"
                )));
            }
        };

        let total = units
            .parse::<i64>()
            .ok()
            .and_then(|u| u.checked_mul(100))
            .and_then(|u| u.checked_add(cents))
            .ok_or_else(|| DomainError::validation(format!("amount too large: {s:?}")))?;

        Ok(Money(if negative { -total } else { total }))
    }
}
