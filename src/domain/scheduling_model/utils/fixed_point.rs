//! Fixed-point value types used in feasibility arithmetic.
//!
//! Attention percentages and batch quantities are compared against hard limits
//! (100% attention, zero remaining capacity). Both are stored as scaled integers so
//! that a sum can never overshoot a limit by rounding error.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::error::EngineError;

/// A share of a multi-tasking resource in hundredths of a percent.
///
/// Valid values lie in `(0, 100.00]`, i.e. `1..=10_000` raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u32);

impl Percent {
    /// Raw units per whole percent.
    pub const SCALE: u32 = 100;

    /// 100% attention.
    pub const FULL: Percent = Percent(100 * Self::SCALE);

    /// Builds a percentage from whole percent points, e.g. `from_percent(60)`.
    pub fn from_percent(percent: u32) -> Result<Self, EngineError> {
        Self::from_hundredths(percent.saturating_mul(Self::SCALE))
    }

    /// Builds a percentage from hundredths of a percent, e.g. `from_hundredths(6050)` = 60.5%.
    pub fn from_hundredths(hundredths: u32) -> Result<Self, EngineError> {
        if hundredths == 0 || hundredths > Self::FULL.0 {
            return Err(EngineError::InvalidPercent(format!("{}.{:02}", hundredths / Self::SCALE, hundredths % Self::SCALE)));
        }
        Ok(Percent(hundredths))
    }

    /// Converts a decimal value such as `60.5`, rounding to the nearest hundredth.
    pub fn from_f64(value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::InvalidPercent(value.to_string()));
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled <= 0.0 || scaled > Self::FULL.0 as f64 {
            return Err(EngineError::InvalidPercent(value.to_string()));
        }
        Ok(Percent(scaled as u32))
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::FULL
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Percent::from_f64(value).map_err(serde::de::Error::custom)
    }
}

/// A material quantity in thousandths of a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    /// Raw units per whole unit.
    pub const SCALE: i64 = 1000;

    pub const ZERO: Quantity = Quantity(0);

    pub fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    pub fn from_thousandths(thousandths: i64) -> Self {
        Quantity(thousandths)
    }

    pub fn from_f64(value: f64) -> Self {
        Quantity((value * Self::SCALE as f64).round() as i64)
    }

    pub fn thousandths(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Share of `self` in `whole`, as a percentage rounded down to hundredths.
    /// Returns 0 for a non-positive `whole`.
    pub fn ratio_in_hundredths(&self, whole: Quantity) -> i64 {
        if whole.0 <= 0 {
            return 0;
        }
        (self.0 as i128 * 100 * Percent::SCALE as i128 / whole.0 as i128) as i64
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:03}", sign, abs / Self::SCALE, abs % Self::SCALE)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("quantity must be finite"));
        }
        Ok(Quantity::from_f64(value))
    }
}
