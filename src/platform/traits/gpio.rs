//! GPIO interface trait
//!
//! This module defines the GPIO (General Purpose Input/Output) interface that
//! platform implementations must provide.

use crate::platform::Result;

/// Platform-specific GPIO pin identifier
pub type PinId = u32;

/// Logic level of a GPIO pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinLevel {
    /// Logic level 0
    Low,
    /// Logic level 1
    High,
}

impl PinLevel {
    /// Returns `true` if the level is [`PinLevel::High`]
    pub fn is_high(self) -> bool {
        self == PinLevel::High
    }

    /// Returns `true` if the level is [`PinLevel::Low`]
    pub fn is_low(self) -> bool {
        self == PinLevel::Low
    }
}

/// GPIO interface trait
///
/// Platform implementations must provide this interface for GPIO control.
/// Pins are opened through [`Platform::open_input_pin`] and
/// [`Platform::open_output_pin`]; dropping the pin releases it.
///
/// # Safety Invariants
///
/// - Only one owner per GPIO pin instance
/// - No concurrent access to the same GPIO pin from multiple contexts
///
/// [`Platform::open_input_pin`]: super::Platform::open_input_pin
/// [`Platform::open_output_pin`]: super::Platform::open_output_pin
pub trait GpioInterface {
    /// Drive the pin to the given level
    ///
    /// Only valid on pins opened as outputs.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Gpio(GpioError::InvalidMode)` if the pin is not
    /// an output, or `GpioError::WriteFailed` if the hardware write fails.
    fn set_level(&mut self, level: PinLevel) -> Result<()>;

    /// Read the current level of the pin
    ///
    /// Valid in both input and output modes.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Gpio(GpioError::ReadFailed)` if the hardware
    /// read fails.
    fn level(&self) -> Result<PinLevel>;
}
