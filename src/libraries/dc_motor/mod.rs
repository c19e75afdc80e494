//! DC motor manager
//!
//! Each motor owns two direction-control pins and one channel on a shared PWM
//! controller. Direction comes from the pin pair, speed from the duty cycle:
//!
//! | speed   | pin1 | pin2 | duty cycle                 | Motor state       |
//! |---------|------|------|----------------------------|-------------------|
//! | > 0     | H    | L    | period * speed / 100       | Clockwise         |
//! | < 0     | L    | H    | period * abs(speed) / 100  | Counter-clockwise |
//! | 0       | H    | H    | 0                          | Active brake      |
//! | (coast) | L    | L    | unchanged                  | Freewheel         |
//!
//! Motors are addressed through opaque handles allocated from a fixed-size
//! table; handles are nonzero, monotonically assigned, and never reused, so a
//! stale handle can never reach a newer motor.

use crate::libraries::pwm_cache::{PwmCache, PwmCacheError};
use crate::platform::{
    PinId, PinLevel, Platform, PlatformError, PwmChannelId, PwmControllerId, PwmPolarity, PwmState,
};
use crate::platform::traits::GpioInterface;

/// Maximum number of motors resident at once
pub const MAX_MOTORS: usize = 8;

/// Opaque handle for an open DC motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DcMotorHandle(u32);

impl DcMotorHandle {
    /// Raw nonzero handle value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// DC motor error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DcMotorError {
    /// Motor table is full
    CapacityExceeded,
    /// First direction pin could not be opened
    Pin1OpenFailed(PlatformError),
    /// Second direction pin could not be opened
    Pin2OpenFailed(PlatformError),
    /// Shared PWM controller could not be acquired
    ControllerUnavailable(PwmCacheError),
    /// Initial waveform state was rejected
    PwmApplyFailed(PlatformError),
    /// Speed outside [-100, 100]
    InvalidSpeed,
    /// No resident motor for this handle
    NotFound,
    /// Pin write or waveform apply failed mid-operation
    Hardware(PlatformError),
}

struct MotorSlot<P: Platform> {
    handle: DcMotorHandle,
    pin1: P::Gpio,
    pin2: P::Gpio,
    controller_slot: usize,
    channel: PwmChannelId,
    state: PwmState,
}

/// Fixed-capacity table of open DC motors
///
/// Owns the [`PwmCache`] so that motors on channels of the same physical
/// controller share one hardware handle.
pub struct DcMotorManager<P: Platform> {
    slots: [Option<MotorSlot<P>>; MAX_MOTORS],
    cache: PwmCache<P>,
    next_id: u32,
}

impl<P: Platform> DcMotorManager<P> {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            cache: PwmCache::new(),
            next_id: 0,
        }
    }

    /// Open a motor on two direction pins and one PWM channel
    ///
    /// Both pins are opened as push-pull outputs initialized high (brake).
    /// The channel starts enabled with a zero duty cycle on the caller's
    /// `period_ns`. Resources acquired before a failing step are rolled back.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded`, `Pin1OpenFailed`, `Pin2OpenFailed`,
    /// `ControllerUnavailable`, or `PwmApplyFailed`.
    pub fn open(
        &mut self,
        platform: &mut P,
        pin1: PinId,
        pin2: PinId,
        controller: PwmControllerId,
        channel: PwmChannelId,
        period_ns: u32,
    ) -> Result<DcMotorHandle, DcMotorError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DcMotorError::CapacityExceeded)?;

        let pin1 = platform
            .open_output_pin(pin1, PinLevel::High)
            .map_err(DcMotorError::Pin1OpenFailed)?;
        // Early returns below drop the pins already opened, which closes them.
        let pin2 = platform
            .open_output_pin(pin2, PinLevel::High)
            .map_err(DcMotorError::Pin2OpenFailed)?;
        let controller_slot = self
            .cache
            .acquire(platform, controller)
            .map_err(DcMotorError::ControllerUnavailable)?;

        let state = PwmState {
            period_ns,
            duty_cycle_ns: 0,
            polarity: PwmPolarity::Normal,
            enabled: true,
        };
        if let Err(e) = self.cache.apply(controller_slot, channel, &state) {
            self.cache.unref(controller_slot);
            return Err(DcMotorError::PwmApplyFailed(e));
        }

        self.next_id += 1;
        let handle = DcMotorHandle(self.next_id);
        self.slots[slot] = Some(MotorSlot {
            handle,
            pin1,
            pin2,
            controller_slot,
            channel,
            state,
        });
        crate::log_debug!(
            "dc motor {}: open on controller {} channel {}",
            handle.raw(),
            controller,
            channel
        );
        Ok(handle)
    }

    /// Set motor speed and direction
    ///
    /// `speed` is a signed percentage in [-100, 100]; the sign selects the
    /// direction, the magnitude the duty cycle as a fraction of the
    /// configured period (integer division). Zero actively brakes.
    ///
    /// # Errors
    ///
    /// `InvalidSpeed` for out-of-range input, `NotFound` for a stale handle,
    /// or `Hardware` on the first failing pin write or waveform apply.
    /// No rollback: earlier pin writes may already be on the wire.
    pub fn drive(&mut self, handle: DcMotorHandle, speed: i32) -> Result<(), DcMotorError> {
        if !(-100..=100).contains(&speed) {
            return Err(DcMotorError::InvalidSpeed);
        }

        let Self { slots, cache, .. } = self;
        let slot = slot_mut(slots, handle).ok_or(DcMotorError::NotFound)?;

        if speed > 0 {
            // Clockwise
            slot.pin1
                .set_level(PinLevel::High)
                .map_err(DcMotorError::Hardware)?;
            slot.pin2
                .set_level(PinLevel::Low)
                .map_err(DcMotorError::Hardware)?;
        } else if speed < 0 {
            // Counter-clockwise
            slot.pin1
                .set_level(PinLevel::Low)
                .map_err(DcMotorError::Hardware)?;
            slot.pin2
                .set_level(PinLevel::High)
                .map_err(DcMotorError::Hardware)?;
        } else {
            // Brake
            slot.pin1
                .set_level(PinLevel::High)
                .map_err(DcMotorError::Hardware)?;
            slot.pin2
                .set_level(PinLevel::High)
                .map_err(DcMotorError::Hardware)?;
        }

        slot.state.enabled = true;
        slot.state.duty_cycle_ns = duty_cycle_ns(slot.state.period_ns, speed);
        cache
            .apply(slot.controller_slot, slot.channel, &slot.state)
            .map_err(DcMotorError::Hardware)?;
        Ok(())
    }

    /// Release the drive pins so the motor freewheels to a stop
    ///
    /// Drives both pins low; the PWM state is left untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` for a stale handle, `Hardware` on a failing pin write.
    pub fn coast(&mut self, handle: DcMotorHandle) -> Result<(), DcMotorError> {
        let slot = slot_mut(&mut self.slots, handle).ok_or(DcMotorError::NotFound)?;
        slot.pin1
            .set_level(PinLevel::Low)
            .map_err(DcMotorError::Hardware)?;
        slot.pin2
            .set_level(PinLevel::Low)
            .map_err(DcMotorError::Hardware)?;
        Ok(())
    }

    /// Close a motor and free its slot
    ///
    /// Disables the PWM channel (best-effort) and releases both pins. The
    /// shared controller stays cached for other motors.
    ///
    /// # Errors
    ///
    /// `NotFound` for a stale handle; no side effects in that case.
    pub fn close(&mut self, handle: DcMotorHandle) -> Result<(), DcMotorError> {
        let Self { slots, cache, .. } = self;
        let index = slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|m| m.handle == handle))
            .ok_or(DcMotorError::NotFound)?;
        let Some(mut slot) = slots[index].take() else {
            return Err(DcMotorError::NotFound);
        };

        slot.state.enabled = false;
        if cache
            .apply(slot.controller_slot, slot.channel, &slot.state)
            .is_err()
        {
            crate::log_warn!("dc motor {}: pwm disable failed during close", handle.raw());
        }
        cache.unref(slot.controller_slot);
        // Dropping the slot closes both pins.
        Ok(())
    }

    /// Close the cached controller for `id` once no motor references it
    ///
    /// # Errors
    ///
    /// `PwmCacheError::InUse` while a resident motor still uses it.
    pub fn release_controller(
        &mut self,
        id: PwmControllerId,
    ) -> Result<(), PwmCacheError> {
        self.cache.release(id)
    }

    /// Number of resident motors
    pub fn resident(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

impl<P: Platform> Default for DcMotorManager<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_mut<P: Platform>(
    slots: &mut [Option<MotorSlot<P>>; MAX_MOTORS],
    handle: DcMotorHandle,
) -> Option<&mut MotorSlot<P>> {
    slots
        .iter_mut()
        .filter_map(Option::as_mut)
        .find(|slot| slot.handle == handle)
}

fn duty_cycle_ns(period_ns: u32, speed: i32) -> u32 {
    (u64::from(period_ns) * u64::from(speed.unsigned_abs()) / 100) as u32
}
