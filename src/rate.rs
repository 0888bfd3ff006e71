use serde::{Deserialize, Serialize};
use std::fmt;

use crate::v4l_sys::*;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Time per frame in seconds, as the driver expresses it
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    pub const fn new(num: u32, denom: u32) -> Self {
        Fraction {
            numerator: num,
            denominator: denom,
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<v4l2_fract> for Fraction {
    fn from(frac: v4l2_fract) -> Self {
        Self {
            numerator: frac.numerator,
            denominator: frac.denominator,
        }
    }
}

impl From<Fraction> for v4l2_fract {
    fn from(fraction: Fraction) -> Self {
        Self {
            numerator: fraction.numerator,
            denominator: fraction.denominator,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Frames per second as a fraction
///
/// This is the inverse of the driver's [`Fraction`] interval: 30 fps is `30/1` here and
/// `1/30` at the kernel boundary.
///
/// # Example
///
/// ```
/// use vcap::{FrameRate, Fraction};
/// let rate = FrameRate::new(30, 1);
/// assert_eq!(Fraction::from(rate), Fraction::new(1, 30));
/// ```
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        FrameRate {
            numerator,
            denominator,
        }
    }

    /// Returns the rate as a floating point value, or 0 for a zero denominator
    pub fn fps(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            f64::from(self.numerator) / f64::from(self.denominator)
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{} fps", self.numerator)
        } else {
            write!(f, "{}/{} fps", self.numerator, self.denominator)
        }
    }
}

impl From<Fraction> for FrameRate {
    fn from(interval: Fraction) -> Self {
        FrameRate {
            numerator: interval.denominator,
            denominator: interval.numerator,
        }
    }
}

impl From<FrameRate> for Fraction {
    fn from(rate: FrameRate) -> Self {
        Fraction {
            numerator: rate.denominator,
            denominator: rate.numerator,
        }
    }
}
