//! # Money Module
//!
//! Integer money for movement unit costs and stock valuation.
//!
//! Movements carry an optional unit cost so reporting queries can value
//! stock flows without consulting product master data at read time. The
//! same integer-cents discipline as [`crate::quantity`] applies: no
//! floating point anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::quantity::Quantity;

/// A monetary value in the smallest currency unit (cents).
///
/// Signed: negative values appear in discrepancy valuations where an
/// adjustment removes stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let cost = Money::from_cents(1250); // 12.50
    /// assert_eq!(cost.cents(), 1250);
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

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Values a quantity at this unit cost, rounding half away from zero.
    ///
    /// Quantities are milliunits, so the intermediate product is scaled
    /// back down by 1000. i128 math prevents overflow on large stocks.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    /// use stockbook_core::quantity::Quantity;
    ///
    /// let unit_cost = Money::from_cents(1250);     // 12.50 per unit
    /// let qty = Quantity::from_units_milli(4, 250); // 4.250 units
    ///
    /// // 12.50 × 4.250 = 53.125 → 53.13 (rounded)
    /// assert_eq!(unit_cost.extend(qty).cents(), 5313);
    /// ```
    pub fn extend(&self, quantity: Quantity) -> Money {
        let product = self.0 as i128 * quantity.milli() as i128;
        let rounded = if product >= 0 {
            (product + 500) / 1000
        } else {
            (product - 500) / 1000
        };
        Money(rounded as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1250);
        assert_eq!(money.cents(), 1250);
        assert!(!money.is_zero());
        assert!(!money.is_negative());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1250)), "12.50");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::zero()), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
    }

    #[test]
    fn test_extend_whole_units() {
        let cost = Money::from_cents(299);
        let total = cost.extend(Quantity::from_units(3));
        assert_eq!(total.cents(), 897);
    }

    #[test]
    fn test_extend_fractional_with_rounding() {
        // 12.50 × 4.250 = 53.125 → 53.13
        let cost = Money::from_cents(1250);
        let total = cost.extend(Quantity::from_units_milli(4, 250));
        assert_eq!(total.cents(), 5313);
    }

    #[test]
    fn test_extend_negative_quantity() {
        // Valuing an outbound adjustment: sign follows the quantity.
        let cost = Money::from_cents(1250);
        let total = cost.extend(Quantity::from_milli(-4250));
        assert_eq!(total.cents(), -5313);
    }
}
