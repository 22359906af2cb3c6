//! Clock capability.
//!
//! Operations that stamp tombstones or touch modification times take a
//! `Clock` instead of calling [`Timestamp::now`] directly, so tests can
//! drive time deterministically.

use crate::Timestamp;

/// Supplies the current time.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
