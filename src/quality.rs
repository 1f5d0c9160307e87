use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{InvalidQualitySnafu, Result, SchedulerError};

/// Self-assessed recall score: 0 is a total blackout, 5 is perfect instant recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(0);
    pub const MAX: Quality = Quality(5);
    pub(crate) const PASS_THRESHOLD: u8 = 3;

    /// Accepts any integer, pinning it into 0..=5.
    pub fn clamped(value: i32) -> Self {
        Self(value.clamp(0, 5) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS_THRESHOLD
    }

    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=5).map(Quality)
    }

    pub(crate) fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl TryFrom<i32> for Quality {
    type Error = SchedulerError;

    fn try_from(value: i32) -> Result<Self> {
        ensure!((0..=5).contains(&value), InvalidQualitySnafu { value });
        Ok(Self(value as u8))
    }
}

impl From<Quality> for i32 {
    fn from(quality: Quality) -> Self {
        quality.0 as i32
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
