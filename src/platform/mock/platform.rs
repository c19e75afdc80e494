//! Mock Platform implementation for testing

use core::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::platform::{
    error::{GpioError, PlatformError, PwmError, TimerError},
    traits::{PinId, PinLevel, Platform, PwmControllerId},
    Result,
};

use super::{MockDelay, MockGpio, MockPeriodicTimer, MockPwmController};

/// Mock Platform implementation
///
/// Provides mock peripheral implementations for hardware-free testing. The
/// platform keeps a registry clone of every peripheral it hands out, so tests
/// can observe and script peripheral state after ownership has moved into the
/// code under test.
///
/// # Example
///
/// ```
/// use driveline::platform::mock::MockPlatform;
/// use driveline::platform::traits::{GpioInterface, PinLevel, Platform};
///
/// let mut platform = MockPlatform::new();
/// let mut pin = platform.open_output_pin(4, PinLevel::High).unwrap();
/// pin.set_level(PinLevel::Low).unwrap();
/// assert_eq!(platform.pin(4).unwrap().level_now(), PinLevel::Low);
/// ```
#[derive(Debug, Default)]
pub struct MockPlatform {
    clock_us: Rc<RefCell<u64>>,
    pins: Vec<(PinId, MockGpio)>,
    controllers: Vec<(PwmControllerId, MockPwmController)>,
    timers: Vec<MockPeriodicTimer>,
    pin_open_fails: Vec<PinId>,
    pwm_open_fails: Vec<PwmControllerId>,
    pwm_apply_fails: Vec<PwmControllerId>,
    pwm_open_counts: Vec<(PwmControllerId, u32)>,
    timer_create_fails: bool,
}

impl MockPlatform {
    /// Create a new mock platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every open of `pin` fail with `GpioError::OpenFailed`
    pub fn fail_pin_open(&mut self, pin: PinId) {
        self.pin_open_fails.push(pin);
    }

    /// Make every open of `controller` fail with `PwmError::OpenFailed`
    pub fn fail_pwm_open(&mut self, controller: PwmControllerId) {
        self.pwm_open_fails.push(controller);
    }

    /// Make `controller` reject applies from the moment it is opened
    pub fn fail_pwm_apply(&mut self, controller: PwmControllerId) {
        self.pwm_apply_fails.push(controller);
    }

    /// Make timer creation fail with `TimerError::CreateFailed`
    pub fn set_timer_create_fails(&mut self, fails: bool) {
        self.timer_create_fails = fails;
    }

    /// Registry view of a pin handed out earlier
    pub fn pin(&self, pin: PinId) -> Option<&MockGpio> {
        self.pins
            .iter()
            .rev()
            .find(|(id, _)| *id == pin)
            .map(|(_, gpio)| gpio)
    }

    /// Registry view of a controller handed out earlier
    pub fn controller(&self, controller: PwmControllerId) -> Option<&MockPwmController> {
        self.controllers
            .iter()
            .rev()
            .find(|(id, _)| *id == controller)
            .map(|(_, pwm)| pwm)
    }

    /// Registry view of the `index`-th timer created (creation order)
    pub fn timer(&self, index: usize) -> Option<&MockPeriodicTimer> {
        self.timers.get(index)
    }

    /// Number of timers created so far
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// How many times `controller` has been opened
    pub fn pwm_open_count(&self, controller: PwmControllerId) -> u32 {
        self.pwm_open_counts
            .iter()
            .find(|(id, _)| *id == controller)
            .map_or(0, |(_, count)| *count)
    }

    /// Whether the pin handed out for `pin` is still owned by someone
    pub fn pin_is_held(&self, pin: PinId) -> bool {
        self.pin(pin)
            .is_some_and(|gpio| Rc::strong_count(&gpio.state) > 1)
    }

    /// Whether the controller handed out for `controller` is still owned
    pub fn controller_is_held(&self, controller: PwmControllerId) -> bool {
        self.controller(controller)
            .is_some_and(|pwm| Rc::strong_count(&pwm.state) > 1)
    }

    /// Whether the `index`-th timer is still owned by someone
    pub fn timer_is_held(&self, index: usize) -> bool {
        self.timer(index)
            .is_some_and(|timer| Rc::strong_count(&timer.state) > 1)
    }

    /// Current simulated time in microseconds
    pub fn clock_us(&self) -> u64 {
        *self.clock_us.borrow()
    }

    fn register_pin(&mut self, pin: PinId, gpio: MockGpio) -> Result<MockGpio> {
        if self.pin_open_fails.contains(&pin) {
            return Err(PlatformError::Gpio(GpioError::OpenFailed));
        }
        if self.pin_is_held(pin) {
            return Err(PlatformError::Gpio(GpioError::PinInUse));
        }
        self.pins.retain(|(id, _)| *id != pin);
        self.pins.push((pin, gpio.clone()));
        Ok(gpio)
    }
}

impl Platform for MockPlatform {
    type Gpio = MockGpio;
    type PwmController = MockPwmController;
    type Timer = MockPeriodicTimer;
    type Delay = MockDelay;

    fn open_input_pin(&mut self, pin: PinId) -> Result<Self::Gpio> {
        self.register_pin(pin, MockGpio::new_input())
    }

    fn open_output_pin(&mut self, pin: PinId, initial: PinLevel) -> Result<Self::Gpio> {
        self.register_pin(pin, MockGpio::new_output(initial))
    }

    fn open_pwm_controller(&mut self, controller: PwmControllerId) -> Result<Self::PwmController> {
        if self.pwm_open_fails.contains(&controller) {
            return Err(PlatformError::Pwm(PwmError::OpenFailed));
        }
        match self
            .pwm_open_counts
            .iter_mut()
            .find(|(id, _)| *id == controller)
        {
            Some((_, count)) => *count += 1,
            None => self.pwm_open_counts.push((controller, 1)),
        }
        let pwm = MockPwmController::new(self.pwm_apply_fails.contains(&controller));
        self.controllers.retain(|(id, _)| *id != controller);
        self.controllers.push((controller, pwm.clone()));
        Ok(pwm)
    }

    fn create_periodic_timer(&mut self, period_ns: u64) -> Result<Self::Timer> {
        if self.timer_create_fails {
            return Err(PlatformError::Timer(TimerError::CreateFailed));
        }
        let timer = MockPeriodicTimer::new(period_ns);
        self.timers.push(timer.clone());
        Ok(timer)
    }

    fn create_delay(&mut self) -> Result<Self::Delay> {
        Ok(MockDelay {
            clock_us: self.clock_us.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::traits::{DelayInterface, GpioInterface};

    #[test]
    fn pin_state_observable_after_move() {
        let mut platform = MockPlatform::new();
        let mut pin = platform.open_output_pin(4, PinLevel::High).unwrap();

        pin.set_level(PinLevel::Low).unwrap();
        assert_eq!(platform.pin(4).unwrap().level_now(), PinLevel::Low);

        assert!(platform.pin_is_held(4));
        drop(pin);
        assert!(!platform.pin_is_held(4));
    }

    #[test]
    fn held_pin_cannot_be_reopened() {
        let mut platform = MockPlatform::new();
        let pin = platform.open_input_pin(7).unwrap();
        assert_eq!(
            platform.open_input_pin(7).unwrap_err(),
            PlatformError::Gpio(GpioError::PinInUse)
        );

        // Released pins can be reopened.
        drop(pin);
        assert!(platform.open_input_pin(7).is_ok());
    }

    #[test]
    fn pwm_open_count_tracks_hardware_opens() {
        let mut platform = MockPlatform::new();
        assert_eq!(platform.pwm_open_count(1), 0);

        let pwm = platform.open_pwm_controller(1).unwrap();
        assert_eq!(platform.pwm_open_count(1), 1);
        assert!(platform.controller_is_held(1));
        drop(pwm);
        assert!(!platform.controller_is_held(1));
    }

    #[test]
    fn injected_open_failures() {
        let mut platform = MockPlatform::new();
        platform.fail_pin_open(3);
        platform.fail_pwm_open(2);
        platform.set_timer_create_fails(true);

        assert_eq!(
            platform.open_output_pin(3, PinLevel::Low).unwrap_err(),
            PlatformError::Gpio(GpioError::OpenFailed)
        );
        assert_eq!(
            platform.open_pwm_controller(2).unwrap_err(),
            PlatformError::Pwm(PwmError::OpenFailed)
        );
        assert_eq!(
            platform.create_periodic_timer(1_000_000).unwrap_err(),
            PlatformError::Timer(TimerError::CreateFailed)
        );
    }

    #[test]
    fn delays_share_the_platform_clock() {
        let mut platform = MockPlatform::new();
        let mut delay = platform.create_delay().unwrap();
        delay.delay_us(500).unwrap();
        assert_eq!(platform.clock_us(), 500);
    }
}
