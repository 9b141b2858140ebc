//! Tick-based time types and wrap-safe arithmetic

use core::fmt;
use core::ops::{Add, AddAssign};

/// An absolute point on the kernel tick timeline.
///
/// Instants wrap around at `u32::MAX` ticks. All ordering queries use
/// wrap-safe signed comparison, so two instants can be compared as long as
/// they are less than half the counter range apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instant(u32);

impl Instant {
    /// The timeline origin
    pub const ZERO: Self = Self(0);

    /// Create an instant from a raw tick count
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Check whether this instant lies strictly after `other` (wrap-safe)
    pub const fn is_after(self, other: Instant) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }

    /// Check whether this instant lies at or after `other` (wrap-safe)
    pub const fn is_at_or_after(self, other: Instant) -> bool {
        (self.0.wrapping_sub(other.0) as i32) >= 0
    }

    /// Ticks elapsed since an earlier instant
    pub const fn elapsed_since(self, earlier: Instant) -> Duration {
        Duration(self.0.wrapping_sub(earlier.0))
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick:{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Instant {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "tick:{}", self.0);
    }
}

/// A span of kernel ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(u32);

impl Duration {
    /// Zero-length span
    pub const ZERO: Self = Self(0);

    /// One tick
    pub const TICK: Self = Self(1);

    /// Maximum representable span
    pub const MAX: Self = Self(u32::MAX);

    /// Create a duration from a tick count
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Get the tick count
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Check if the duration is zero
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ticks", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Duration {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ticks", self.0);
    }
}
