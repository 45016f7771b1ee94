//! Utilities for telling time in milliseconds
//!
//! Types included allow mocking out clocks and other side-effect-laden time
//! operations, so that expiry checks can be exercised at exact boundaries.
//! All instants are represented as milliseconds since the Unix epoch, which
//! is the resolution used by the persisted token store.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_must_use
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{
    fmt, ops,
    time::{Duration, SystemTime},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unix time in milliseconds
///
/// The number of milliseconds elapsed since the beginning of the Unix epoch
/// on 1970/01/01 at 00:00:00 UTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UnixMillis(pub u64);

impl From<SystemTime> for UnixMillis {
    #[inline]
    fn from(t: SystemTime) -> Self {
        // Clocks set before the epoch are clamped to the epoch itself
        let millis = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

        UnixMillis(millis)
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl ops::Add<DurationMillis> for UnixMillis {
    type Output = UnixMillis;

    #[inline]
    fn add(self, rhs: DurationMillis) -> Self::Output {
        UnixMillis(self.0.saturating_add(rhs.0))
    }
}

impl ops::Sub<DurationMillis> for UnixMillis {
    type Output = UnixMillis;

    /// Subtracts a duration, saturating at the epoch
    #[inline]
    fn sub(self, rhs: DurationMillis) -> Self::Output {
        UnixMillis(self.0.saturating_sub(rhs.0))
    }
}

impl ops::Sub for UnixMillis {
    type Output = DurationMillis;

    /// The elapsed time between two instants, saturating at zero
    #[inline]
    fn sub(self, rhs: UnixMillis) -> Self::Output {
        DurationMillis(self.0.saturating_sub(rhs.0))
    }
}

/// A duration in whole milliseconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct DurationMillis(pub u64);

impl From<DurationMillis> for Duration {
    #[inline]
    fn from(d: DurationMillis) -> Self {
        Duration::from_millis(d.0)
    }
}

impl From<DurationSecs> for DurationMillis {
    #[inline]
    fn from(d: DurationSecs) -> Self {
        DurationMillis(d.0.saturating_mul(1000))
    }
}

/// A duration in whole seconds, as advertised by token authorities
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct DurationSecs(pub u64);

impl From<DurationSecs> for Duration {
    #[inline]
    fn from(d: DurationSecs) -> Self {
        Duration::from_secs(d.0)
    }
}

impl ops::Add<DurationSecs> for UnixMillis {
    type Output = UnixMillis;

    #[inline]
    fn add(self, rhs: DurationSecs) -> Self::Output {
        self + DurationMillis::from(rhs)
    }
}

macro_rules! transparent_serde {
    ($($ty:ty),*) => {$(
        #[cfg(feature = "serde")]
        #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
        impl Serialize for $ty {
            #[inline]
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        #[cfg(feature = "serde")]
        #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
        impl<'de> Deserialize<'de> for $ty {
            #[inline]
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let v = u64::deserialize(deserializer)?;
                Ok(Self(v))
            }
        }
    )*};
}

transparent_serde!(UnixMillis, DurationMillis, DurationSecs);

/// Represents a clock, which can tell the current time
pub trait Clock {
    /// Gets the current time according to this clock
    fn now(&self) -> UnixMillis;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> UnixMillis {
        (**self).now()
    }
}

/// The system clock as provided by `std::time::SystemTime`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixMillis {
        UnixMillis::from(SystemTime::now())
    }
}

/// A test clock which maintains the current time as internal state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixMillis);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixMillis {
        self.0
    }
}

impl TestClock {
    /// Creates a new test clock with the specified time
    #[inline]
    pub const fn new(time: UnixMillis) -> Self {
        Self(time)
    }

    /// Updates the clock's current time to `val`
    pub fn set(&mut self, val: UnixMillis) {
        self.0 = val;
    }

    /// Advances the clock's current time by `inc`
    pub fn advance(&mut self, inc: DurationMillis) {
        self.0 = self.0 + inc;
    }
}
