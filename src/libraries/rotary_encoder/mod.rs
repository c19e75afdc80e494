//! Rotary encoder decoder
//!
//! Decodes a two-line quadrature rotary encoder (clock + data) by periodic
//! polling with debounce. Each detent begins with a falling clock edge; the
//! data line at that moment carries the direction. A detent is only counted
//! when the clock is low on two samples a debounce interval apart and the
//! data line is steady across them, which filters mid-transition noise. The
//! registered callback then receives `+1` (clockwise) or `-1`
//! (counter-clockwise) per detent.
//!
//! The decoder is an explicitly constructed instance; open it once, service
//! it from the host event loop with [`RotaryEncoder::poll`], close it to
//! release the pins.

use crate::platform::{PinId, PinLevel, Platform, PlatformError};
use crate::platform::traits::{DelayInterface, GpioInterface, PeriodicTimerInterface};

/// Poll cadence of the decoder
pub const POLL_PERIOD_NS: u64 = 1_000_000;

/// Settling delay between the two samples of one poll
const DEBOUNCE_US: u32 = 2_000;

/// Delay between probes while waiting out the low pulse
const CLOCK_PROBE_INTERVAL_US: u32 = 1_000;

/// Upper bound on end-of-pulse probes before giving up on the detent
const CLOCK_RECOVERY_TIMEOUT_PROBES: u32 = 100;

/// Rotary encoder error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderError {
    /// The instance is already open
    AlreadyOpen,
    /// The instance is not open
    NotOpen,
    /// Clock pin could not be opened
    ClockPinOpenFailed(PlatformError),
    /// Data pin could not be opened
    DataPinOpenFailed(PlatformError),
    /// Poll timer or delay source could not be created
    TimerInitFailed(PlatformError),
    /// Clock never returned high after a detected detent
    ClockStuckLow,
    /// Pin read or timer acknowledge failed
    Hardware(PlatformError),
}

struct EncoderChannel<P: Platform, F: FnMut(i32)> {
    clock: P::Gpio,
    data: P::Gpio,
    timer: P::Timer,
    delay: P::Delay,
    on_change: F,
}

/// Debounced quadrature decoder for one rotary encoder
pub struct RotaryEncoder<P: Platform, F: FnMut(i32)> {
    channel: Option<EncoderChannel<P, F>>,
}

impl<P: Platform, F: FnMut(i32)> RotaryEncoder<P, F> {
    /// Create a closed decoder
    pub fn new() -> Self {
        Self { channel: None }
    }

    /// Whether the decoder currently owns its pins and timer
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Open the decoder on a clock and a data input pin
    ///
    /// `on_change` is invoked from [`poll`](Self::poll) with `+1` or `-1`
    /// per detected detent. Resources acquired before a failing step are
    /// rolled back.
    ///
    /// # Errors
    ///
    /// `AlreadyOpen` if open was called twice without an intervening close;
    /// otherwise `ClockPinOpenFailed`, `DataPinOpenFailed`, or
    /// `TimerInitFailed`.
    pub fn open(
        &mut self,
        platform: &mut P,
        clock_pin: PinId,
        data_pin: PinId,
        on_change: F,
    ) -> Result<(), EncoderError> {
        if self.channel.is_some() {
            return Err(EncoderError::AlreadyOpen);
        }

        let clock = platform
            .open_input_pin(clock_pin)
            .map_err(EncoderError::ClockPinOpenFailed)?;
        // Early returns below drop the resources already acquired.
        let data = platform
            .open_input_pin(data_pin)
            .map_err(EncoderError::DataPinOpenFailed)?;
        let timer = platform
            .create_periodic_timer(POLL_PERIOD_NS)
            .map_err(EncoderError::TimerInitFailed)?;
        let delay = platform
            .create_delay()
            .map_err(EncoderError::TimerInitFailed)?;

        self.channel = Some(EncoderChannel {
            clock,
            data,
            timer,
            delay,
            on_change,
        });
        Ok(())
    }

    /// Service the decoder from the host event loop
    ///
    /// A no-op while closed or while the poll timer has not expired. One
    /// expiry is consumed per call; a detected detent blocks inside the call
    /// for the debounce interval plus the remainder of the low pulse.
    ///
    /// # Errors
    ///
    /// `ClockStuckLow` if the clock does not return high within the recovery
    /// timeout, `Hardware` on a failing pin read or timer acknowledge.
    pub fn poll(&mut self) -> Result<(), EncoderError> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(());
        };
        if !channel.timer.poll_expired() {
            return Ok(());
        }
        channel.timer.consume_event().map_err(EncoderError::Hardware)?;

        let clock_first = channel.clock.level().map_err(EncoderError::Hardware)?;
        let data_first = channel.data.level().map_err(EncoderError::Hardware)?;
        channel
            .delay
            .delay_us(DEBOUNCE_US)
            .map_err(EncoderError::Hardware)?;
        let clock_second = channel.clock.level().map_err(EncoderError::Hardware)?;
        let data_second = channel.data.level().map_err(EncoderError::Hardware)?;

        if clock_first.is_low() && clock_second.is_low() && data_first == data_second {
            // Wait out the low pulse: the detent completes when the clock
            // returns high.
            let mut clock = clock_first;
            let mut probes = 0;
            while clock.is_low() {
                if probes >= CLOCK_RECOVERY_TIMEOUT_PROBES {
                    return Err(EncoderError::ClockStuckLow);
                }
                clock = channel.clock.level().map_err(EncoderError::Hardware)?;
                channel
                    .delay
                    .delay_us(CLOCK_PROBE_INTERVAL_US)
                    .map_err(EncoderError::Hardware)?;
                probes += 1;
            }

            let increment = if data_first.is_high() { -1 } else { 1 };
            (channel.on_change)(increment);
        }
        Ok(())
    }

    /// Close the decoder, releasing its pins and poll timer
    ///
    /// # Errors
    ///
    /// `NotOpen` if the decoder is not open.
    pub fn close(&mut self) -> Result<(), EncoderError> {
        // Dropping the channel releases pins, timer and delay source.
        match self.channel.take() {
            Some(_) => Ok(()),
            None => Err(EncoderError::NotOpen),
        }
    }
}

impl<P: Platform, F: FnMut(i32)> Default for RotaryEncoder<P, F> {
    fn default() -> Self {
        Self::new()
    }
}
