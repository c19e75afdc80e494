//! Platform interface traits
//!
//! These traits define the contract between the motion-control libraries and
//! the underlying hardware. Platform implementations provide concrete types
//! for each peripheral via the associated types on [`Platform`].

pub mod gpio;
pub mod platform;
pub mod pwm;
pub mod timer;

pub use gpio::{GpioInterface, PinId, PinLevel};
pub use platform::Platform;
pub use pwm::{PwmChannelId, PwmControllerId, PwmControllerInterface, PwmPolarity, PwmState};
pub use timer::{DelayInterface, PeriodicTimerInterface};
