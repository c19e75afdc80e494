//! Mock timer and delay implementations for testing

use core::cell::RefCell;
use std::rc::Rc;

use crate::platform::{
    error::{PlatformError, TimerError},
    traits::{DelayInterface, PeriodicTimerInterface},
    Result,
};

#[derive(Debug)]
pub(crate) struct TimerState {
    period_ns: u64,
    pending: u32,
}

/// Mock periodic timer implementation
///
/// Expiries are queued manually with [`fire`](Self::fire) instead of by the
/// passage of time, so tests control exactly when a tick is serviced.
#[derive(Debug, Clone)]
pub struct MockPeriodicTimer {
    pub(crate) state: Rc<RefCell<TimerState>>,
}

impl MockPeriodicTimer {
    pub(crate) fn new(period_ns: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(TimerState {
                period_ns,
                pending: 0,
            })),
        }
    }

    /// Queue one expiry
    pub fn fire(&self) {
        self.state.borrow_mut().pending += 1;
    }

    /// Currently programmed period
    pub fn period_ns(&self) -> u64 {
        self.state.borrow().period_ns
    }
}

impl PeriodicTimerInterface for MockPeriodicTimer {
    fn set_period_ns(&mut self, period_ns: u64) -> Result<()> {
        if period_ns == 0 {
            return Err(PlatformError::Timer(TimerError::InvalidPeriod));
        }
        self.state.borrow_mut().period_ns = period_ns;
        Ok(())
    }

    fn poll_expired(&mut self) -> bool {
        self.state.borrow().pending > 0
    }

    fn consume_event(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.pending == 0 {
            return Err(PlatformError::Timer(TimerError::NoEventPending));
        }
        state.pending -= 1;
        Ok(())
    }
}

/// Mock delay implementation
///
/// Advances a simulated microsecond clock shared with the owning
/// [`MockPlatform`](super::MockPlatform) instead of sleeping.
#[derive(Debug)]
pub struct MockDelay {
    pub(crate) clock_us: Rc<RefCell<u64>>,
}

impl DelayInterface for MockDelay {
    fn delay_us(&mut self, us: u32) -> Result<()> {
        let mut clock = self.clock_us.borrow_mut();
        *clock += u64::from(us);
        Ok(())
    }

    fn now_us(&self) -> u64 {
        *self.clock_us.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_must_be_consumed_once() {
        let mut timer = MockPeriodicTimer::new(1_000_000);
        assert!(!timer.poll_expired());
        assert_eq!(
            timer.consume_event(),
            Err(PlatformError::Timer(TimerError::NoEventPending))
        );

        timer.fire();
        assert!(timer.poll_expired());
        timer.consume_event().unwrap();
        assert!(!timer.poll_expired());
    }

    #[test]
    fn set_period_rejects_zero() {
        let mut timer = MockPeriodicTimer::new(1_000_000);
        assert_eq!(
            timer.set_period_ns(0),
            Err(PlatformError::Timer(TimerError::InvalidPeriod))
        );
        timer.set_period_ns(250_000).unwrap();
        assert_eq!(timer.period_ns(), 250_000);
    }

    #[test]
    fn delay_advances_simulated_clock() {
        let clock = Rc::new(RefCell::new(0));
        let mut delay = MockDelay {
            clock_us: clock.clone(),
        };
        delay.delay_us(1_500).unwrap();
        delay.delay_ms(2).unwrap();
        assert_eq!(delay.now_us(), 3_500);
        assert_eq!(*clock.borrow(), 3_500);
    }
}
