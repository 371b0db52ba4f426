//! This module defines the unit types used for demand, output and percentages.
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing quantities which have been through repeated arithmetic
pub const TOLERANCE: f64 = 1e-9;

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the value is within [`TOLERANCE`] of zero
            pub fn is_zero(self) -> bool {
                self.0.abs() <= TOLERANCE
            }

            /// The smaller of two quantities
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

/// Represents a dimensionless quantity.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
pub struct Dimensionless(pub f64);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl Dimensionless {
    /// Restrict the value to the given range
    pub fn clamp(self, min: f64, max: f64) -> Self {
        Dimensionless(self.0.clamp(min, max))
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

impl ApproxEq for Dimensionless {
    type Margin = F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        self.0.approx_eq(other.0, margin)
    }
}

// Demand and output are expressed in the same (unspecified) energy unit
unit_struct!(Energy);

impl Energy {
    /// Whether this is a usable demand or output value (finite and non-negative)
    pub fn is_valid_quantity(self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, true)]
    #[case(12.5, true)]
    #[case(-1.0, false)]
    #[case(f64::NAN, false)]
    #[case(f64::INFINITY, false)]
    fn energy_is_valid_quantity(#[case] value: f64, #[case] expected: bool) {
        assert_eq!(Energy(value).is_valid_quantity(), expected);
    }

    #[test]
    fn energy_ratio_is_dimensionless() {
        let ratio = Energy(25.0) / Energy(100.0);
        assert_approx_eq!(Dimensionless, ratio, Dimensionless(0.25));
    }

    #[test]
    fn energy_sum() {
        let total: Energy = [Energy(1.5), Energy(2.5), Energy(6.0)].into_iter().sum();
        assert_eq!(total, Energy(10.0));
    }

    #[test]
    fn energy_is_zero_within_tolerance() {
        assert!(Energy(0.0).is_zero());
        assert!(Energy(TOLERANCE / 2.0).is_zero());
        assert!(!Energy(1e-6).is_zero());
    }
}
