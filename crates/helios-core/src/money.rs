//! # Money Module
//!
//! Provides the `Money` type used for line totals and every sum built on
//! top of them.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE PARTITION PROBLEM                                                  │
//! │                                                                         │
//! │  Summing f64 line totals in a different order gives a different sum:   │
//! │    (0.1 + 0.2) + 0.3 = 0.6000000000000001                              │
//! │    0.1 + (0.2 + 0.3) = 0.6                                             │
//! │                                                                         │
//! │  Grouping lines by supplier or category re-orders the additions, so    │
//! │  the grand total could drift from the sum of group subtotals.          │
//! │                                                                         │
//! │  OUR SOLUTION: each line total is rounded ONCE to integer cents,       │
//! │  every later sum is exact integer addition.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use helios_core::money::Money;
//!
//! // Supplier catalogs quote unit costs in dollars (possibly sub-cent)
//! let line = Money::line_total(0.125, 40.0); // 40 clips at $0.125
//! assert_eq!(line.cents(), 500);
//!
//! let total = line + Money::from_cents(1999);
//! assert_eq!(total.to_string(), "$24.99");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// CandidateProduct.unit_cost (f64 dollars)
///      │
///      ▼ × resolved quantity, rounded once
/// CalculatedAccessory.total_cost (Money)
///      │
///      ├──► group_totals (by supplier / category)
///      └──► CostSummary.subtotal ──► tax ──► total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use helios_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a dollar amount to cents, rounding half away from zero.
    ///
    /// Non-finite input yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use helios_core::money::Money;
    ///
    /// assert_eq!(Money::from_dollars(12.346).cents(), 1235);
    /// assert_eq!(Money::from_dollars(f64::NAN).cents(), 0);
    /// ```
    pub fn from_dollars(dollars: f64) -> Self {
        if !dollars.is_finite() {
            return Money::zero();
        }
        Money((dollars * 100.0).round() as i64)
    }

    /// Computes `unit_cost × quantity` and rounds it to the cent.
    ///
    /// The multiplication happens in f64 before rounding so that sub-cent
    /// unit costs (cable per metre, clips per piece) do not accumulate
    /// rounding error across large quantities.
    pub fn line_total(unit_cost: f64, quantity: f64) -> Self {
        Money::from_dollars(unit_cost * quantity)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount as f64 dollars (for display and export only).
    #[inline]
    pub fn as_dollars(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides
    /// half-up rounding for non-negative amounts.
    ///
    /// ## Example
    /// ```rust
    /// use helios_core::money::Money;
    /// use helios_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(123_45);
    /// let gst = subtotal.calculate_tax(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(gst.cents(), 12_35);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money as dollars.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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
