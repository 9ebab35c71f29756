//! Drives a PiRacer-style RC car's steering servo and ESC through a PCA9685 PWM controller.
//!
//! [`codec`] turns pulse widths into the chip's 12-bit counts, [`pca9685`] writes them to the
//! chip's registers over I2C, and [`DriveController`] maps throttle and steering commands in
//! \[-1,1\] onto the calibrated pulse ranges of the car. The library is `no_std` and generic over
//! the `embedded-hal` I2C traits; the `std` feature adds [`host`], which opens the bus on Linux.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
#[cfg(feature = "std")]
pub mod host;
pub mod pca9685;
pub mod rc_control;

pub use commands::Command;
pub use config::DriveConfig;
pub use error::{Error, InvalidChannel};
pub use pca9685::Pca9685;
pub use rc_control::DriveController;
