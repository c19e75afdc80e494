//! Stepper motor manager
//!
//! Drives 4-wire unipolar/bipolar stepper motors through four GPIO pins, one
//! coil pattern per step. Each stepper owns a periodic timer; the host event
//! loop calls [`StepperManager::poll`] to advance whichever stepper's timer
//! has expired. Direction comes from the sign of the stored speed, the step
//! rate from the timer period.

use bitflags::bitflags;

use crate::platform::{PinId, PinLevel, Platform, PlatformError};
use crate::platform::traits::{GpioInterface, PeriodicTimerInterface};

/// Maximum number of steppers resident at once (one hardware timer slot each)
pub const MAX_STEPPERS: usize = 2;

/// Full steps in one 360 degree revolution of the output shaft
pub const STEPS_PER_REV: f64 = 4096.0;

/// Fastest the motor can turn and still settle on every step
pub const MIN_SEC_PER_REV: f64 = 3.5;

/// Revolution time at speed 1, the slowest commanded rate
pub const MAX_SEC_PER_REV: f64 = 60.0;

/// Period a stepper's timer is armed with before the first `drive`
const INITIAL_PERIOD_NS: u64 = 1_000_000_000;

bitflags! {
    /// Energized winding pattern across the four drive pins (bit 0 = pin1)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Coils: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const C = 1 << 2;
        const D = 1 << 3;
    }
}

/// Coil sequence for one electrical cycle, D..A bit order.
/// Consecutive entries differ in exactly one coil, so a step toggles a
/// single pin.
const COIL_SEQUENCE: [Coils; 8] = [
    Coils::from_bits_retain(0b0001),
    Coils::from_bits_retain(0b0011),
    Coils::from_bits_retain(0b0010),
    Coils::from_bits_retain(0b0110),
    Coils::from_bits_retain(0b0100),
    Coils::from_bits_retain(0b1100),
    Coils::from_bits_retain(0b1000),
    Coils::from_bits_retain(0b1001),
];

/// Opaque handle for an open stepper motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepperHandle(u32);

impl StepperHandle {
    /// Raw nonzero handle value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Stepper motor error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Stepper table is full
    CapacityExceeded,
    /// A drive pin could not be opened
    PinOpenFailed(PlatformError),
    /// The step timer could not be created
    TimerInitFailed(PlatformError),
    /// Speed outside [-100, 100]
    InvalidSpeed,
    /// No resident stepper for this handle
    NotFound,
    /// Timer reprogramming failed
    Hardware(PlatformError),
}

struct StepperSlot<P: Platform> {
    handle: StepperHandle,
    pins: [P::Gpio; 4],
    speed: i32,
    sequence_index: usize,
    timer: P::Timer,
}

/// Fixed-capacity table of open stepper motors
pub struct StepperManager<P: Platform> {
    slots: [Option<StepperSlot<P>>; MAX_STEPPERS],
    next_id: u32,
}

impl<P: Platform> StepperManager<P> {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            next_id: 0,
        }
    }

    /// Open a stepper on four drive pins
    ///
    /// All pins are opened as push-pull outputs driven low (de-energized),
    /// and a periodic step timer is created with a 1-second initial period.
    /// The stepper holds position until [`drive`](Self::drive) sets a speed.
    /// Resources acquired before a failing step are rolled back.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded`, `PinOpenFailed`, or `TimerInitFailed`.
    pub fn open(
        &mut self,
        platform: &mut P,
        pins: [PinId; 4],
    ) -> Result<StepperHandle, StepperError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(StepperError::CapacityExceeded)?;

        // Early returns below drop the pins already opened, which closes them.
        let pin1 = platform
            .open_output_pin(pins[0], PinLevel::Low)
            .map_err(StepperError::PinOpenFailed)?;
        let pin2 = platform
            .open_output_pin(pins[1], PinLevel::Low)
            .map_err(StepperError::PinOpenFailed)?;
        let pin3 = platform
            .open_output_pin(pins[2], PinLevel::Low)
            .map_err(StepperError::PinOpenFailed)?;
        let pin4 = platform
            .open_output_pin(pins[3], PinLevel::Low)
            .map_err(StepperError::PinOpenFailed)?;
        let timer = platform
            .create_periodic_timer(INITIAL_PERIOD_NS)
            .map_err(StepperError::TimerInitFailed)?;

        self.next_id += 1;
        let handle = StepperHandle(self.next_id);
        self.slots[slot] = Some(StepperSlot {
            handle,
            pins: [pin1, pin2, pin3, pin4],
            speed: 0,
            sequence_index: 0,
            timer,
        });
        crate::log_debug!("stepper {}: open", handle.raw());
        Ok(handle)
    }

    /// Set stepper speed and direction
    ///
    /// `speed` is a signed percentage in [-100, 100]; the sign selects the
    /// step direction and the magnitude maps linearly onto revolution time
    /// between [`MAX_SEC_PER_REV`] (speed 1) and [`MIN_SEC_PER_REV`]
    /// (speed 100). Zero keeps the timer armed but stops stepping. Note that
    /// the mapping is applied to the signed value, so a negative speed does
    /// not step at the same rate as its positive counterpart; direction comes
    /// solely from the advance step.
    ///
    /// # Errors
    ///
    /// `InvalidSpeed` for out-of-range input, `NotFound` for a stale handle,
    /// or `Hardware` if the timer period cannot be reprogrammed.
    pub fn drive(&mut self, handle: StepperHandle, speed: i32) -> Result<(), StepperError> {
        if !(-100..=100).contains(&speed) {
            return Err(StepperError::InvalidSpeed);
        }
        let slot = self.slot_mut(handle).ok_or(StepperError::NotFound)?;
        slot.speed = speed;
        slot.timer
            .set_period_ns(step_period_ns(speed))
            .map_err(StepperError::Hardware)?;
        Ok(())
    }

    /// Advance every resident stepper whose step timer has expired
    ///
    /// Call this from the host event loop. Each serviced expiry is consumed
    /// exactly once before the step is taken; pin writes on the step path are
    /// best-effort.
    pub fn poll(&mut self) {
        for slot in self.slots.iter_mut().filter_map(Option::as_mut) {
            if slot.timer.poll_expired() && slot.timer.consume_event().is_ok() {
                take_step(slot);
            }
        }
    }

    /// Close a stepper and free its slot
    ///
    /// Disposes the step timer, drives all four pins low (best-effort) and
    /// releases them.
    ///
    /// # Errors
    ///
    /// `NotFound` for a stale handle; no side effects in that case.
    pub fn close(&mut self, handle: StepperHandle) -> Result<(), StepperError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|s| s.handle == handle))
            .ok_or(StepperError::NotFound)?;
        let Some(slot) = self.slots[index].take() else {
            return Err(StepperError::NotFound);
        };

        let StepperSlot { pins, timer, .. } = slot;
        drop(timer);
        for mut pin in pins {
            let _ = pin.set_level(PinLevel::Low);
            // Dropping the pin closes it.
        }
        crate::log_debug!("stepper {}: closed", handle.raw());
        Ok(())
    }

    /// Number of resident steppers
    pub fn resident(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn slot_mut(&mut self, handle: StepperHandle) -> Option<&mut StepperSlot<P>> {
        self.slots
            .iter_mut()
            .filter_map(Option::as_mut)
            .find(|slot| slot.handle == handle)
    }
}

impl<P: Platform> Default for StepperManager<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a commanded speed onto the step timer period
fn step_period_ns(speed: i32) -> u64 {
    let sec_per_rev =
        (speed as f64 - 1.0) * (MIN_SEC_PER_REV - MAX_SEC_PER_REV) / 99.0 + MAX_SEC_PER_REV;
    (1_000_000_000.0 * (sec_per_rev / STEPS_PER_REV)) as u64
}

/// Advance one stepper by a single step
///
/// With zero speed the windings are de-energized and the sequence index
/// holds. Otherwise the index moves one entry around the ring and only the
/// pin whose coil bit changed is written, so a step never glitches the
/// unaffected windings.
fn take_step<P: Platform>(slot: &mut StepperSlot<P>) {
    if slot.speed == 0 {
        for pin in slot.pins.iter_mut() {
            let _ = pin.set_level(PinLevel::Low);
        }
        return;
    }

    let previous = COIL_SEQUENCE[slot.sequence_index];
    slot.sequence_index = if slot.speed > 0 {
        (slot.sequence_index + 1) % COIL_SEQUENCE.len()
    } else {
        slot.sequence_index
            .checked_sub(1)
            .unwrap_or(COIL_SEQUENCE.len() - 1)
    };
    let next = COIL_SEQUENCE[slot.sequence_index];

    let changed = previous ^ next;
    for (bit, pin) in slot.pins.iter_mut().enumerate() {
        let coil = Coils::from_bits_retain(1 << bit);
        if changed.contains(coil) {
            let level = if next.contains(coil) {
                PinLevel::High
            } else {
                PinLevel::Low
            };
            let _ = pin.set_level(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;

    const PINS: [PinId; 4] = [10, 11, 12, 13];

    fn open_stepper(
        manager: &mut StepperManager<MockPlatform>,
        platform: &mut MockPlatform,
    ) -> StepperHandle {
        manager.open(platform, PINS).unwrap()
    }

    fn tick(platform: &MockPlatform, manager: &mut StepperManager<MockPlatform>, timer: usize) {
        platform.timer(timer).unwrap().fire();
        manager.poll();
    }

    fn pin_levels(platform: &MockPlatform) -> [PinLevel; 4] {
        PINS.map(|pin| platform.pin(pin).unwrap().level_now())
    }

    fn levels_for(coils: u8) -> [PinLevel; 4] {
        core::array::from_fn(|bit| {
            if coils & (1 << bit) != 0 {
                PinLevel::High
            } else {
                PinLevel::Low
            }
        })
    }

    #[test]
    fn open_starts_deenergized_with_one_second_timer() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);

        assert_eq!(stepper.raw(), 1);
        assert_eq!(pin_levels(&platform), levels_for(0b0000));
        assert_eq!(platform.timer(0).unwrap().period_ns(), 1_000_000_000);
    }

    #[test]
    fn sequence_rings_forward_for_positive_speed() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);
        manager.drive(stepper, 50).unwrap();

        let expected = [
            0b0011, 0b0010, 0b0110, 0b0100, 0b1100, 0b1000, 0b1001, 0b0001,
        ];
        for (step, &coils) in expected.iter().enumerate() {
            tick(&platform, &mut manager, 0);
            assert_eq!(pin_levels(&platform), levels_for(coils), "step {}", step);
        }
        // Eight steps complete the ring.
        assert_eq!(manager.slots[0].as_ref().unwrap().sequence_index, 0);
    }

    #[test]
    fn sequence_rings_backward_for_negative_speed() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);
        manager.drive(stepper, -50).unwrap();

        let expected_indices = [7, 6, 5, 4, 3, 2, 1, 0];
        for &index in expected_indices.iter() {
            tick(&platform, &mut manager, 0);
            assert_eq!(manager.slots[0].as_ref().unwrap().sequence_index, index);
        }
    }

    #[test]
    fn each_step_writes_exactly_one_pin() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);
        manager.drive(stepper, 100).unwrap();

        for _ in 0..8 {
            for pin in PINS {
                platform.pin(pin).unwrap().clear_writes();
            }
            tick(&platform, &mut manager, 0);
            let writes: usize = PINS
                .iter()
                .map(|&pin| platform.pin(pin).unwrap().writes().len())
                .sum();
            assert_eq!(writes, 1);
        }
    }

    #[test]
    fn zero_speed_forces_pins_low_and_holds_index() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);

        manager.drive(stepper, 30).unwrap();
        tick(&platform, &mut manager, 0);
        tick(&platform, &mut manager, 0);
        let index = manager.slots[0].as_ref().unwrap().sequence_index;
        assert_eq!(index, 2);

        manager.drive(stepper, 0).unwrap();
        tick(&platform, &mut manager, 0);
        assert_eq!(pin_levels(&platform), levels_for(0b0000));
        assert_eq!(manager.slots[0].as_ref().unwrap().sequence_index, index);
    }

    #[test]
    fn poll_without_expiry_is_a_no_op() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);
        manager.drive(stepper, 50).unwrap();

        manager.poll();
        assert_eq!(manager.slots[0].as_ref().unwrap().sequence_index, 0);

        // One expiry yields exactly one step.
        platform.timer(0).unwrap().fire();
        manager.poll();
        manager.poll();
        assert_eq!(manager.slots[0].as_ref().unwrap().sequence_index, 1);
    }

    #[test]
    fn drive_reprograms_timer_period_endpoints() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);

        // speed 1: slowest, 60.0 s/rev.
        manager.drive(stepper, 1).unwrap();
        assert_eq!(platform.timer(0).unwrap().period_ns(), 14_648_437);

        // speed 100: fastest, 3.5 s/rev.
        manager.drive(stepper, 100).unwrap();
        assert_eq!(platform.timer(0).unwrap().period_ns(), 854_492);
    }

    #[test]
    fn step_period_is_linear_in_speed() {
        assert_eq!(step_period_ns(50), 7_821_131);
        // Monotonically faster as speed rises.
        for speed in 2..=100 {
            assert!(step_period_ns(speed) < step_period_ns(speed - 1));
        }
    }

    #[test]
    fn drive_negative_speed_period_asymmetry() {
        // The linear map is applied to the signed speed, -1 term included, so
        // a negative command does not mirror its positive counterpart. Pinned
        // deliberately; confirm intent with the product owner before changing.
        assert_eq!(step_period_ns(-100), 28_721_048);
        assert_ne!(step_period_ns(-100), step_period_ns(100));
        // Every negative command lands past the speed-1 slow end of the map.
        assert!(step_period_ns(-1) > step_period_ns(1));
    }

    #[test]
    fn drive_rejects_out_of_range_speed() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);

        assert_eq!(manager.drive(stepper, 101), Err(StepperError::InvalidSpeed));
        assert_eq!(
            manager.drive(stepper, -101),
            Err(StepperError::InvalidSpeed)
        );
        // The timer still holds its initial period.
        assert_eq!(platform.timer(0).unwrap().period_ns(), 1_000_000_000);
    }

    #[test]
    fn capacity_exceeded_on_third_stepper() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();

        let a = manager.open(&mut platform, [10, 11, 12, 13]).unwrap();
        let b = manager.open(&mut platform, [14, 15, 16, 17]).unwrap();
        assert_eq!(
            manager.open(&mut platform, [18, 19, 20, 21]),
            Err(StepperError::CapacityExceeded)
        );

        // Resident steppers are untouched by the failed open.
        assert_eq!(manager.resident(), MAX_STEPPERS);
        manager.drive(a, 20).unwrap();
        manager.drive(b, -20).unwrap();
    }

    #[test]
    fn open_rolls_back_pins_on_pin_failure() {
        let mut platform = MockPlatform::new();
        platform.fail_pin_open(12);
        let mut manager = StepperManager::new();

        assert!(matches!(
            manager.open(&mut platform, PINS),
            Err(StepperError::PinOpenFailed(_))
        ));
        assert!(!platform.pin_is_held(10));
        assert!(!platform.pin_is_held(11));
    }

    #[test]
    fn open_rolls_back_pins_on_timer_failure() {
        let mut platform = MockPlatform::new();
        platform.set_timer_create_fails(true);
        let mut manager = StepperManager::new();

        assert!(matches!(
            manager.open(&mut platform, PINS),
            Err(StepperError::TimerInitFailed(_))
        ));
        for pin in PINS {
            assert!(!platform.pin_is_held(pin));
        }
    }

    #[test]
    fn close_disposes_timer_and_releases_pins() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();
        let stepper = open_stepper(&mut manager, &mut platform);
        manager.drive(stepper, 40).unwrap();
        tick(&platform, &mut manager, 0);

        manager.close(stepper).unwrap();
        assert!(!platform.timer_is_held(0));
        for pin in PINS {
            assert!(!platform.pin_is_held(pin));
            assert_eq!(platform.pin(pin).unwrap().level_now(), PinLevel::Low);
        }
        assert_eq!(manager.close(stepper), Err(StepperError::NotFound));
    }

    #[test]
    fn reopened_slot_gets_fresh_handle() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();

        let first = open_stepper(&mut manager, &mut platform);
        manager.close(first).unwrap();
        let second = open_stepper(&mut manager, &mut platform);

        assert_ne!(first, second);
        assert_eq!(manager.drive(first, 10), Err(StepperError::NotFound));
        manager.drive(second, 10).unwrap();
    }

    #[test]
    fn steppers_poll_independently() {
        let mut platform = MockPlatform::new();
        let mut manager = StepperManager::new();

        let a = manager.open(&mut platform, [10, 11, 12, 13]).unwrap();
        let b = manager.open(&mut platform, [14, 15, 16, 17]).unwrap();
        manager.drive(a, 50).unwrap();
        manager.drive(b, -50).unwrap();

        // Only stepper B's timer fires.
        platform.timer(1).unwrap().fire();
        manager.poll();
        assert_eq!(manager.slots[0].as_ref().unwrap().sequence_index, 0);
        assert_eq!(manager.slots[1].as_ref().unwrap().sequence_index, 7);
    }
}
