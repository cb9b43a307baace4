use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul};
use std::time::Duration;

/// A length in meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

impl Meters {
    pub const fn new(meters: f64) -> Self {
        Self(meters)
    }

    /// Build a length from kilometers.
    pub fn km(km: f64) -> Self {
        Self(km * 1000.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn max(self, other: Meters) -> Meters {
        Meters(self.0.max(other.0))
    }
}

impl Add for Meters {
    type Output = Meters;

    fn add(self, rhs: Meters) -> Meters {
        Meters(self.0 + rhs.0)
    }
}

impl Mul<f64> for Meters {
    type Output = Meters;

    fn mul(self, rhs: f64) -> Meters {
        Meters(self.0 * rhs)
    }
}

impl Div for Meters {
    type Output = f64;

    fn div(self, rhs: Meters) -> f64 {
        self.0 / rhs.0
    }
}

impl fmt::Display for Meters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// An expiration window in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Minutes(pub u32);

impl Minutes {
    pub const fn new(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl From<Minutes> for Duration {
    fn from(minutes: Minutes) -> Self {
        minutes.as_duration()
    }
}
