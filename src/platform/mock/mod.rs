//! Mock platform for hardware-free testing
//!
//! Mock peripherals share their state with the [`MockPlatform`] registry, so
//! tests can script input levels, inject faults, fire timers, and inspect
//! writes after ownership of a peripheral has moved into the code under test.

mod gpio;
mod platform;
mod pwm;
mod timer;

pub use gpio::MockGpio;
pub use platform::MockPlatform;
pub use pwm::MockPwmController;
pub use timer::{MockDelay, MockPeriodicTimer};
