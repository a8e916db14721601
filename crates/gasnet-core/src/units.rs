//! Compile-time unit safety for pipeline quantities.
//!
//! Prevents mixing incompatible units like volumetric flow (MMscfd) and
//! pressure (psia), or pressure and pressure-squared.
//!
//! # Design Philosophy
//!
//! Pipeline analysis involves several physical quantities with specific units:
//! - Volumetric flow rates (MMscfd)
//! - Pressures (psia) and pressure differentials (psi)
//! - Segment lengths (miles) and diameters (inches)
//!
//! Using raw `f64` values throughout the codebase makes it easy to
//! accidentally mix incompatible units (e.g., adding a flow to a pressure, or
//! passing a diameter where a length is expected). The newtype wrappers in
//! this module catch such errors at compile time.
//!
//! All types use `#[repr(transparent)]`, so they have the same memory layout
//! as `f64` and serialize as plain numbers.
//!
//! # Usage
//!
//! ```
//! use gasnet_core::units::{Mmscfd, Psia};
//!
//! let supply = Mmscfd(1000.0);
//! let shipped = supply + Mmscfd(20.0);
//!
//! // This would NOT compile - different units
//! // let wrong = supply + Psia(800.0);
//!
//! let p = Psia(800.0);
//! assert_eq!(p.squared(), 640_000.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl AddAssign for $type {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Minimum of two values
            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// Clamp value to range
            #[inline]
            pub fn clamp(self, min: Self, max: Self) -> Self {
                Self(self.0.clamp(min.0, max.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Flow Units
// =============================================================================

/// Volumetric gas flow in million standard cubic feet per day (MMscfd)
///
/// The standard nomination unit for transmission pipelines. Negative values
/// denote reverse flow on bidirectional segments.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Mmscfd(pub f64);

impl_unit_ops!(Mmscfd, "MMscfd");

impl Mmscfd {
    /// Convert to standard cubic feet per hour
    #[inline]
    pub fn to_scf_per_hour(self) -> f64 {
        self.0 * 1.0e6 / 24.0
    }
}

// =============================================================================
// Pressure Units
// =============================================================================

/// Absolute pressure in pounds per square inch (psia)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Psia(pub f64);

impl_unit_ops!(Psia, "psia");

/// Pressure differential in psi (compressor boost, drawdown)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Psi(pub f64);

impl_unit_ops!(Psi, "psi");

/// Atmospheric pressure at standard conditions
pub const ATMOSPHERIC_PSIA: f64 = 14.696;

impl Psia {
    /// Square of the pressure, the natural variable of the Weymouth relation
    #[inline]
    pub fn squared(self) -> f64 {
        self.0 * self.0
    }

    /// Recover a pressure from a pressure-squared value, clamped at zero
    #[inline]
    pub fn from_squared(p_squared: f64) -> Self {
        Psia(p_squared.max(0.0).sqrt())
    }

    /// Convert to gauge pressure (psig)
    #[inline]
    pub fn to_psig(self) -> f64 {
        self.0 - ATMOSPHERIC_PSIA
    }

    /// Construct from gauge pressure (psig)
    #[inline]
    pub fn from_psig(psig: f64) -> Self {
        Psia(psig + ATMOSPHERIC_PSIA)
    }

    /// Apply a boost differential
    #[inline]
    pub fn boosted(self, boost: Psi) -> Self {
        Psia(self.0 + boost.0)
    }
}

// =============================================================================
// Geometry Units
// =============================================================================

/// Segment length in miles
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Miles(pub f64);

impl_unit_ops!(Miles, "mi");

/// Internal pipe diameter in inches
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Inches(pub f64);

impl_unit_ops!(Inches, "in");

impl Miles {
    /// Convert to feet
    #[inline]
    pub fn to_feet(self) -> f64 {
        self.0 * 5280.0
    }
}

impl Inches {
    /// Convert to feet
    #[inline]
    pub fn to_feet(self) -> f64 {
        self.0 / 12.0
    }
}
