//! # Currency Amounts
//!
//! **NO FLOATING POINT IN PAYOUTS**
//!
//! Job payouts travel through the pipeline as fixed-point values with six
//! decimal places, stored as a `u64` scaled by 1,000,000. Configuration
//! files spell them as decimal strings (`"2.50"`), never as floats.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Number of decimal places.
const DECIMAL_PLACES: u32 = 6;

/// The multiplier for 6 decimal places.
const MULTIPLIER: u64 = 10u64.pow(DECIMAL_PLACES);

/// Fixed-point currency amount with 6 decimal places.
///
/// # Range
///
/// - Minimum: 0.000000
/// - Maximum: 18,446,744,073,709.551615
///
/// Arithmetic saturates instead of wrapping: a payout can never roll over
/// into a tiny number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Self(0);

    /// One unit (1.000000).
    pub const ONE: Self = Self(MULTIPLIER);

    /// Maximum representable value.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates an amount from a whole number, saturating at [`Amount::MAX`].
    #[inline]
    #[must_use]
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole.saturating_mul(MULTIPLIER))
    }

    /// Creates an amount from a whole part and a decimal part (0-999999).
    ///
    /// ```rust,ignore
    /// let value = Amount::from_parts(2, 500_000); // 2.500000
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_parts(whole: u64, decimal: u32) -> Self {
        Self(
            whole
                .saturating_mul(MULTIPLIER)
                .saturating_add(decimal as u64 % MULTIPLIER),
        )
    }

    /// Returns the raw internal value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the whole number part.
    #[inline]
    #[must_use]
    pub const fn whole(self) -> u64 {
        self.0 / MULTIPLIER
    }

    /// Returns the decimal part (0-999999).
    #[inline]
    #[must_use]
    pub const fn decimal(self) -> u32 {
        (self.0 % MULTIPLIER) as u32
    }

    /// Multiplies by an integer count, saturating.
    #[inline]
    #[must_use]
    pub const fn saturating_mul_int(self, rhs: u64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }

    /// Multiplies by a percentage in basis points (10000 = 100%).
    ///
    /// Values above 10000 scale up, so a tier bonus of 12500 pays 125%.
    #[inline]
    #[must_use]
    pub const fn mul_percent_bp(self, percent_basis_points: u32) -> Self {
        // Use u128 to avoid overflow during calculation
        let result = (self.0 as u128 * percent_basis_points as u128) / 10000;
        if result > u64::MAX as u128 {
            Self::MAX
        } else {
            Self(result as u64)
        }
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Returns true if this value is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Amount {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Amount {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl FromStr for Amount {
    type Err = PipelineError;

    /// Parses `"12"`, `"12.5"` or `"12.000001"`. More than six decimals,
    /// signs and exponents are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::InvalidConfig(format!("invalid amount: {s:?}"));
        let trimmed = s.trim();
        let (whole_str, decimal_str) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        if whole_str.is_empty() || !whole_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if decimal_str.len() > DECIMAL_PLACES as usize
            || !decimal_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u64 = whole_str.parse().map_err(|_| invalid())?;
        let mut decimal: u64 = 0;
        for digit in decimal_str.bytes() {
            decimal = decimal * 10 + u64::from(digit - b'0');
        }
        // Right-pad: "5" means 500000 millionths.
        let padding = DECIMAL_PLACES - decimal_str.len() as u32;
        decimal *= 10u64.pow(padding);

        whole
            .checked_mul(MULTIPLIER)
            .and_then(|raw| raw.checked_add(decimal))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Amount {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({}.{:06})", self.whole(), self.decimal())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.whole(), self.decimal())
    }
}
