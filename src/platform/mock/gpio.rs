//! Mock GPIO implementation for testing

use core::cell::RefCell;
use std::rc::Rc;

use heapless::{Deque, Vec};

use crate::platform::{
    error::{GpioError, PlatformError},
    traits::{GpioInterface, PinLevel},
    Result,
};

/// Depth of the per-pin write journal and input script
const PIN_BUFFER_DEPTH: usize = 64;

#[derive(Debug)]
pub(crate) struct PinState {
    level: PinLevel,
    is_input: bool,
    write_fails: bool,
    read_fails: bool,
    writes: Vec<PinLevel, PIN_BUFFER_DEPTH>,
    script: Deque<PinLevel, PIN_BUFFER_DEPTH>,
}

/// Mock GPIO implementation
///
/// Tracks pin level and mode for test verification. Output pins journal every
/// write; input pins can be scripted with a sequence of levels, each read
/// consuming the next sample (the last one holds).
#[derive(Debug, Clone)]
pub struct MockGpio {
    pub(crate) state: Rc<RefCell<PinState>>,
}

impl MockGpio {
    pub(crate) fn new_output(initial: PinLevel) -> Self {
        Self {
            state: Rc::new(RefCell::new(PinState {
                level: initial,
                is_input: false,
                write_fails: false,
                read_fails: false,
                writes: Vec::new(),
                script: Deque::new(),
            })),
        }
    }

    pub(crate) fn new_input() -> Self {
        Self {
            state: Rc::new(RefCell::new(PinState {
                level: PinLevel::Low,
                is_input: true,
                write_fails: false,
                read_fails: false,
                writes: Vec::new(),
                script: Deque::new(),
            })),
        }
    }

    /// Set the level seen by subsequent reads (input pins)
    pub fn set_input_level(&self, level: PinLevel) {
        self.state.borrow_mut().level = level;
    }

    /// Queue a sequence of levels; each read consumes one, the last holds
    pub fn script_levels(&self, levels: &[PinLevel]) {
        let mut state = self.state.borrow_mut();
        for &level in levels {
            state
                .script
                .push_back(level)
                .expect("pin script overflows mock buffer");
        }
    }

    /// Number of scripted samples not yet consumed
    pub fn script_remaining(&self) -> usize {
        self.state.borrow().script.len()
    }

    /// Current pin level, without consuming scripted samples
    pub fn level_now(&self) -> PinLevel {
        self.state.borrow().level
    }

    /// Journal of levels written since the last [`clear_writes`](Self::clear_writes)
    pub fn writes(&self) -> Vec<PinLevel, PIN_BUFFER_DEPTH> {
        self.state.borrow().writes.clone()
    }

    /// Clear the write journal
    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Make subsequent writes fail with `GpioError::WriteFailed`
    pub fn set_write_fails(&self, fails: bool) {
        self.state.borrow_mut().write_fails = fails;
    }

    /// Make subsequent reads fail with `GpioError::ReadFailed`
    pub fn set_read_fails(&self, fails: bool) {
        self.state.borrow_mut().read_fails = fails;
    }
}

impl GpioInterface for MockGpio {
    fn set_level(&mut self, level: PinLevel) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.is_input {
            return Err(PlatformError::Gpio(GpioError::InvalidMode));
        }
        if state.write_fails {
            return Err(PlatformError::Gpio(GpioError::WriteFailed));
        }
        state.level = level;
        // Journal is bounded; tests clear it between phases.
        let _ = state.writes.push(level);
        Ok(())
    }

    fn level(&self) -> Result<PinLevel> {
        let mut state = self.state.borrow_mut();
        if state.read_fails {
            return Err(PlatformError::Gpio(GpioError::ReadFailed));
        }
        if let Some(next) = state.script.pop_front() {
            state.level = next;
        }
        Ok(state.level)
    }
}
