//! Shared PWM controller cache
//!
//! A physical PWM controller exposes several channels, and several motors may
//! sit on channels of the same controller. The hardware handle must therefore
//! be opened once and shared. This cache memoizes one open controller per
//! controller id in a fixed slot table; callers address a cached controller by
//! its slot index, which stays stable until the entry is explicitly released.
//!
//! Entries are reference counted by their consumers (one reference per open
//! motor), and [`PwmCache::release`] refuses to close a controller that is
//! still referenced.

use crate::platform::{Platform, PlatformError, PwmChannelId, PwmControllerId, PwmState};
use crate::platform::traits::PwmControllerInterface;

/// Maximum number of controllers resident at once
pub const MAX_PWM_CONTROLLERS: usize = 4;

/// PWM cache error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmCacheError {
    /// All cache slots are occupied by other controllers
    Exhausted,
    /// The hardware open failed
    OpenFailed(PlatformError),
    /// The controller is still referenced by an open motor
    InUse,
}

struct CacheEntry<P: Platform> {
    id: PwmControllerId,
    controller: P::PwmController,
    refs: u32,
}

/// Fixed-capacity cache of open PWM controllers
pub struct PwmCache<P: Platform> {
    entries: [Option<CacheEntry<P>>; MAX_PWM_CONTROLLERS],
}

impl<P: Platform> PwmCache<P> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|_| None),
        }
    }

    /// Look up or open the controller for `id`, returning its slot index
    ///
    /// A resident entry is shared: every caller asking for the same id gets
    /// the same slot, and the hardware is only opened on the first request.
    /// Each successful call takes one reference; pair it with
    /// [`unref`](Self::unref).
    ///
    /// # Errors
    ///
    /// Returns `PwmCacheError::Exhausted` if the id is not resident and no
    /// slot is free, or `PwmCacheError::OpenFailed` if the hardware open
    /// fails (the slot stays free).
    pub fn acquire(
        &mut self,
        platform: &mut P,
        id: PwmControllerId,
    ) -> Result<usize, PwmCacheError> {
        let mut free_slot = None;
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            match entry {
                Some(cached) if cached.id == id => {
                    cached.refs += 1;
                    return Ok(slot);
                }
                None if free_slot.is_none() => free_slot = Some(slot),
                _ => {}
            }
        }

        let slot = free_slot.ok_or(PwmCacheError::Exhausted)?;
        let controller = platform
            .open_pwm_controller(id)
            .map_err(PwmCacheError::OpenFailed)?;
        self.entries[slot] = Some(CacheEntry {
            id,
            controller,
            refs: 1,
        });
        crate::log_debug!("pwm cache: controller {} opened in slot {}", id, slot);
        Ok(slot)
    }

    /// Apply a waveform state through the controller in `slot`
    ///
    /// # Errors
    ///
    /// Propagates the hardware apply error; returns
    /// `PlatformError::ResourceUnavailable` if the slot is empty.
    pub fn apply(
        &mut self,
        slot: usize,
        channel: PwmChannelId,
        state: &PwmState,
    ) -> Result<(), PlatformError> {
        match self.entries.get_mut(slot).and_then(Option::as_mut) {
            Some(entry) => entry.controller.apply(channel, state),
            None => Err(PlatformError::ResourceUnavailable),
        }
    }

    /// Drop one reference from the entry in `slot`
    pub fn unref(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot).and_then(Option::as_mut) {
            entry.refs = entry.refs.saturating_sub(1);
        }
    }

    /// Close the controller(s) cached for `id` and free their slots
    ///
    /// A missing entry is not an error; releasing is idempotent.
    ///
    /// # Errors
    ///
    /// Returns `PwmCacheError::InUse` if any matching entry is still
    /// referenced; nothing is released in that case.
    pub fn release(&mut self, id: PwmControllerId) -> Result<(), PwmCacheError> {
        if self
            .entries
            .iter()
            .flatten()
            .any(|entry| entry.id == id && entry.refs > 0)
        {
            return Err(PwmCacheError::InUse);
        }
        for entry in self.entries.iter_mut() {
            if entry.as_ref().is_some_and(|cached| cached.id == id) {
                // Dropping the entry closes the hardware handle.
                *entry = None;
            }
        }
        Ok(())
    }

    /// Number of resident entries
    pub fn resident(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}

impl<P: Platform> Default for PwmCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
