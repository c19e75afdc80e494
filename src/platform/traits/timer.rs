//! Timer interface traits
//!
//! This module defines the periodic timer and delay interfaces that platform
//! implementations must provide.

use crate::platform::Result;

/// Periodic timer interface trait
///
/// A periodic timer expires repeatedly at its configured period. Expiries are
/// latched by the platform and observed by polling; each observed expiry must
/// be acknowledged with [`consume_event`] exactly once before acting on it.
/// Dropping the timer disposes it.
///
/// [`consume_event`]: PeriodicTimerInterface::consume_event
pub trait PeriodicTimerInterface {
    /// Change the timer period
    ///
    /// Takes effect from the next arming of the timer.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer(TimerError::InvalidPeriod)` if the
    /// period cannot be programmed.
    fn set_period_ns(&mut self, period_ns: u64) -> Result<()>;

    /// Check whether an expiry is pending
    fn poll_expired(&mut self) -> bool;

    /// Acknowledge one pending expiry
    ///
    /// Must be called exactly once per expiry before acting on it.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer(TimerError::NoEventPending)` if no
    /// expiry is pending.
    fn consume_event(&mut self) -> Result<()>;
}

/// Delay interface trait
///
/// Platform implementations must provide this interface for blocking delays
/// and timestamps.
///
/// # Safety Invariants
///
/// - Monotonic time source (never goes backwards)
pub trait DelayInterface {
    /// Delay for specified number of microseconds
    ///
    /// Blocks execution for at least `us` microseconds.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer` if the delay operation fails.
    fn delay_us(&mut self, us: u32) -> Result<()>;

    /// Delay for specified number of milliseconds
    ///
    /// Blocks execution for at least `ms` milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer` if the delay operation fails.
    fn delay_ms(&mut self, ms: u32) -> Result<()> {
        self.delay_us(ms.saturating_mul(1000))
    }

    /// Get current time in microseconds
    ///
    /// Returns a monotonic timestamp in microseconds since platform
    /// initialization.
    fn now_us(&self) -> u64;
}
