#![cfg_attr(not(test), no_std)]

//! driveline - peripheral resource and motion-control layer
//!
//! This library provides the motion-control primitives for a small motor-driver
//! board: DC motors driving shared PWM controllers, 4-wire stepper motors, and a
//! quadrature rotary encoder. Everything is serviced cooperatively from a
//! single-threaded host event loop; the board support crate implements the
//! `platform` traits against real hardware.

// The mock platform is host-only; it needs std for shared-state peripherals.
#[cfg(any(test, feature = "mock"))]
extern crate std;

// Platform abstraction layer (HAL contract + mock implementation)
pub mod platform;

// Core support (logging macros)
pub mod core;

// Motion-control libraries built on the platform abstraction
pub mod libraries;
