//! # Money Module
//!
//! Provides the `Money` type for every amount the engine touches: unit
//! prices, line totals, delivery fees, voucher balances and payments.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A voucher of 30.00 paid with 10.00 + 20.00 must land on exactly 0.    │
//! │  With floats the remaining balance can end up as 0.0000000001 and the  │
//! │  voucher never flips to `paid`.                                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    3000 - 1000 - 2000 = 0   ✅                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use agua_core::money::Money;
//!
//! let bottle = Money::from_cents(250); // 2.50
//! let line = bottle.multiply_quantity(12);
//! assert_eq!(line.cents(), 3000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::DiscountRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► resolve_unit_price ──► OrderLine.line_total          │
/// │                                                │                        │
/// │                                                ▼                        │
/// │  District.base_fee ──► resolve_delivery_fee ──► Order.total             │
/// │                                                │                        │
/// │                                                ▼                        │
/// │                         Voucher.amount ──► allocate_payment             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use agua_core::money::Money;
    ///
    /// let fee = Money::from_cents(450);
    /// assert_eq!(fee.cents(), 450);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
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

    /// Zero money value.
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

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Multiplies money by a quantity.
    ///
    /// This is the only place a line total is produced, so no rounding
    /// happens before `unit price × quantity`.
    ///
    /// ```rust
    /// use agua_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(900);
    /// assert_eq!(unit_price.multiply_quantity(49).cents(), 44100);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Portion of this amount represented by `rate`, rounded half-up to the cent.
    ///
    /// Formula: `(cents × bps + 5000) / 10000`, computed in i128.
    pub fn portion(&self, rate: DiscountRate) -> Money {
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ```rust
    /// use agua_core::money::Money;
    /// use agua_core::types::DiscountRate;
    ///
    /// let base_fee = Money::from_cents(500);
    /// let fee = base_fee.apply_discount(DiscountRate::from_bps(1000)); // 10% off
    /// assert_eq!(fee.cents(), 450);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        Money::from_cents(self.0 - self.portion(rate).cents())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display. Localised formatting belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
