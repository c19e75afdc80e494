//! Mock PWM controller implementation for testing

use core::cell::RefCell;
use std::rc::Rc;

use heapless::Vec;

use crate::platform::{
    error::{PlatformError, PwmError},
    traits::{PwmChannelId, PwmControllerInterface, PwmState},
    Result,
};

/// Depth of the per-controller apply journal
const APPLY_JOURNAL_DEPTH: usize = 64;

#[derive(Debug)]
pub(crate) struct ControllerState {
    apply_fails: bool,
    applies: Vec<(PwmChannelId, PwmState), APPLY_JOURNAL_DEPTH>,
}

/// Mock PWM controller implementation
///
/// Journals every applied waveform state per channel for test verification.
#[derive(Debug, Clone)]
pub struct MockPwmController {
    pub(crate) state: Rc<RefCell<ControllerState>>,
}

impl MockPwmController {
    pub(crate) fn new(apply_fails: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(ControllerState {
                apply_fails,
                applies: Vec::new(),
            })),
        }
    }

    /// All states applied since the last [`clear_applies`](Self::clear_applies)
    pub fn applies(&self) -> Vec<(PwmChannelId, PwmState), APPLY_JOURNAL_DEPTH> {
        self.state.borrow().applies.clone()
    }

    /// The most recent state applied to `channel`
    pub fn last_apply(&self, channel: PwmChannelId) -> Option<PwmState> {
        self.state
            .borrow()
            .applies
            .iter()
            .rev()
            .find(|(ch, _)| *ch == channel)
            .map(|(_, state)| *state)
    }

    /// Clear the apply journal
    pub fn clear_applies(&self) {
        self.state.borrow_mut().applies.clear();
    }

    /// Make subsequent applies fail with `PwmError::ApplyFailed`
    pub fn set_apply_fails(&self, fails: bool) {
        self.state.borrow_mut().apply_fails = fails;
    }
}

impl PwmControllerInterface for MockPwmController {
    fn apply(&mut self, channel: PwmChannelId, state: &PwmState) -> Result<()> {
        let mut inner = self.state.borrow_mut();
        if inner.apply_fails {
            return Err(PlatformError::Pwm(PwmError::ApplyFailed));
        }
        let _ = inner.applies.push((channel, *state));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::traits::PwmPolarity;

    fn state(duty_cycle_ns: u32) -> PwmState {
        PwmState {
            period_ns: 20_000,
            duty_cycle_ns,
            polarity: PwmPolarity::Normal,
            enabled: true,
        }
    }

    #[test]
    fn journals_applies_per_channel() {
        let mut pwm = MockPwmController::new(false);
        pwm.apply(0, &state(1_000)).unwrap();
        pwm.apply(1, &state(2_000)).unwrap();
        pwm.apply(0, &state(3_000)).unwrap();

        assert_eq!(pwm.applies().len(), 3);
        assert_eq!(pwm.last_apply(0).unwrap().duty_cycle_ns, 3_000);
        assert_eq!(pwm.last_apply(1).unwrap().duty_cycle_ns, 2_000);
        assert!(pwm.last_apply(2).is_none());
    }

    #[test]
    fn injected_apply_failure() {
        let mut pwm = MockPwmController::new(false);
        pwm.set_apply_fails(true);
        assert_eq!(
            pwm.apply(0, &state(1_000)),
            Err(PlatformError::Pwm(PwmError::ApplyFailed))
        );
        assert!(pwm.applies().is_empty());
    }
}
