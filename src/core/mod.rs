//! Core support modules

pub mod logging;
