//! # Money Module
//!
//! Provides the `Money` type used for every denomination, payout amount,
//! transaction limit and credit in Teller.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EXACT CHANGE NEEDS EXACT ARITHMETIC                                    │
//! │                                                                         │
//! │  A dispenser either pays out the requested amount or nothing at all.    │
//! │  Floating point remainders (0.1 + 0.2 = 0.30000000000000004) would      │
//! │  turn "feasible" amounts into "infeasible" ones and vice versa.         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    A €20 note is 2000, a €5 note is 500.                                │
//! │    10 500 / 2000 = 5 notes, remainder 500 - always exact.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use teller_core::money::Money;
//!
//! let note = Money::from_minor(2000); // a 20.00 note
//! let stack = note.times(5);          // 100.00
//! assert_eq!(stack.minor(), 10_000);
//! assert_eq!(stack.whole_multiples_of(note), 5);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents, pence, ...).
///
/// ## Design Decisions
/// - **i64 (signed)**: `limit - credit` may legitimately go negative
/// - **Single field tuple struct**: serializes as a plain JSON number
/// - **Ord + Hash**: used as a map key for active denominations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use teller_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(500).minor(), 500);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole major units (e.g. `20` for a 20.00 note).
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Value of `count` notes of this denomination.
    ///
    /// ```rust
    /// use teller_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(2000).times(3), Money::from_minor(6000));
    /// ```
    #[inline]
    pub const fn times(&self, count: u32) -> Self {
        Money(self.0 * count as i64)
    }

    /// Like [`times`](Self::times), but `None` on overflow.
    #[inline]
    pub const fn checked_times(&self, count: u32) -> Option<Self> {
        match self.0.checked_mul(count as i64) {
            Some(value) => Some(Money(value)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(value) => Some(Money(value)),
            None => None,
        }
    }

    /// Subtraction clamped to the `i64` range.
    #[inline]
    pub const fn saturating_sub(&self, other: Money) -> Self {
        Money(self.0.saturating_sub(other.0))
    }

    /// How many whole `unit`s fit into this amount.
    ///
    /// Returns 0 when either side is not positive, so a greedy caller never
    /// takes notes for a non-positive remainder.
    ///
    /// ```rust
    /// use teller_core::money::Money;
    ///
    /// let amount = Money::from_minor(10_700);
    /// assert_eq!(amount.whole_multiples_of(Money::from_minor(2000)), 5);
    /// assert_eq!(Money::from_minor(-100).whole_multiples_of(Money::from_minor(500)), 0);
    /// ```
    #[inline]
    pub const fn whole_multiples_of(&self, unit: Money) -> u64 {
        if self.0 <= 0 || unit.0 <= 0 {
            return 0;
        }
        (self.0 / unit.0) as u64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `major.minor` without a currency symbol; the
/// currency code travels separately with the inventory.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
