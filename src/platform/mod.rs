//! Platform abstraction layer
//!
//! This module provides hardware abstraction for the GPIO, PWM, and timer
//! peripherals the motion-control libraries depend on. All platform-specific
//! code lives behind these traits; a board support crate implements them
//! against the real hardware.

pub mod error;
pub mod traits;

// Mock implementation (host testing only)
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{PlatformError, Result};
pub use traits::{
    DelayInterface, GpioInterface, PeriodicTimerInterface, PinId, PinLevel, Platform,
    PwmChannelId, PwmControllerId, PwmControllerInterface, PwmPolarity, PwmState,
};
