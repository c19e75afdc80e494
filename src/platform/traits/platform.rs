//! Root platform trait
//!
//! This module defines the root Platform trait that aggregates all peripheral
//! interfaces.

use super::{
    DelayInterface, GpioInterface, PeriodicTimerInterface, PinId, PinLevel,
    PwmControllerId, PwmControllerInterface,
};
use crate::platform::Result;

/// Root platform trait
///
/// This trait aggregates the peripheral interfaces the motion-control
/// libraries consume. Platform implementations provide concrete types for
/// each peripheral via associated types, enabling zero-cost abstractions
/// through compile-time dispatch.
///
/// Every peripheral returned by the `open_*`/`create_*` methods is owned by
/// the caller; dropping it releases the underlying hardware resource.
pub trait Platform: Sized {
    /// GPIO pin type
    type Gpio: GpioInterface;

    /// PWM controller type
    type PwmController: PwmControllerInterface;

    /// Periodic timer type
    type Timer: PeriodicTimerInterface;

    /// Delay/timestamp source type
    type Delay: DelayInterface;

    /// Open a GPIO pin as a high-impedance input
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Gpio` if the pin is invalid or already in use.
    fn open_input_pin(&mut self, pin: PinId) -> Result<Self::Gpio>;

    /// Open a GPIO pin as a push-pull output driven to `initial`
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Gpio` if the pin is invalid or already in use.
    fn open_output_pin(&mut self, pin: PinId, initial: PinLevel) -> Result<Self::Gpio>;

    /// Open a PWM controller
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Pwm` if the controller is invalid or cannot be
    /// opened.
    fn open_pwm_controller(&mut self, controller: PwmControllerId) -> Result<Self::PwmController>;

    /// Create a periodic timer with the given initial period
    ///
    /// The timer starts armed; expiries are observed through
    /// [`PeriodicTimerInterface::poll_expired`].
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer` if no timer slot is available.
    fn create_periodic_timer(&mut self, period_ns: u64) -> Result<Self::Timer>;

    /// Create a delay/timestamp source
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer` if the time base is unavailable.
    fn create_delay(&mut self) -> Result<Self::Delay>;
}
