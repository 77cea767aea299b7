use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Number of classes after which an active cycle stops accruing and is billed.
pub const DEFAULT_CLASS_THRESHOLD: u32 = 25;

/// Platform cut of every cycle total.
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.10);

/// A non-negative amount in the smallest currency unit.
///
/// Every persisted total goes through this type, so no fractional or negative
/// amount can reach storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub u64);

impl Money {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Amount billed for `hours` at `rate` per hour, truncated to a whole unit.
    pub fn for_duration(hours: Hours, rate: Money) -> Result<Self> {
        hours
            .value()
            .checked_mul(Decimal::from(rate.0))
            .map(|amount| amount.floor())
            .and_then(|amount| amount.to_u64())
            .map(Self)
            .ok_or_else(|| {
                BillingError::InvalidInput(format!(
                    "Session amount for {} hours at rate {} is out of range",
                    hours, rate
                ))
            })
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<u64> for Money {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Length of a tutoring session in hours. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Hours(Decimal);

impl Hours {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BillingError::InvalidInput(format!(
                "Duration must be positive, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Hours {
    type Error = BillingError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fraction of a cycle total kept by the platform, between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionRate(Decimal);

impl CommissionRate {
    pub fn new(value: Decimal) -> Result<Self> {
        if (Decimal::ZERO..=Decimal::ONE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(BillingError::Config(format!(
                "Commission rate must be between 0 and 1, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Commission owed on `total`, rounded down.
    ///
    /// Always applied to a running total, never summed per session: flooring
    /// each session separately would lose up to one unit per session.
    pub fn commission_on(&self, total: Money) -> Result<Money> {
        Decimal::from(total.0)
            .checked_mul(self.0)
            .map(|commission| commission.floor())
            .and_then(|commission| commission.to_u64())
            .map(Money)
            .ok_or_else(|| BillingError::InvalidInput(format!("Commission on {} overflows", total)))
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        Self(DEFAULT_COMMISSION_RATE)
    }
}

/// Rules a payment cycle is billed under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingPolicy {
    pub commission_rate: CommissionRate,
    pub class_threshold: u32,
}

impl BillingPolicy {
    pub fn new(commission_rate: CommissionRate, class_threshold: u32) -> Result<Self> {
        if class_threshold == 0 {
            return Err(BillingError::Config(
                "Class threshold must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            commission_rate,
            class_threshold,
        })
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            commission_rate: CommissionRate::default(),
            class_threshold: DEFAULT_CLASS_THRESHOLD,
        }
    }
}
