//! Motion-control libraries
//!
//! Handle-table managers for the motor-driver peripherals, built on the
//! platform abstraction:
//!
//! - [`pwm_cache`]: shared PWM controller cache
//! - [`dc_motor`]: DC motor manager (direction pins + PWM duty cycle)
//! - [`stepper`]: 4-wire stepper motor manager (timer-driven coil sequencing)
//! - [`rotary_encoder`]: debounced quadrature decoder

pub mod dc_motor;
pub mod pwm_cache;
pub mod rotary_encoder;
pub mod stepper;
