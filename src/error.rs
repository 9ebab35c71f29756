//! Errors raised while configuring or driving the PCA9685.

use core::fmt::Debug;
use thiserror::Error;

/// A channel index outside the 16 outputs of the PCA9685.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel {0} is outside the PCA9685 range 0..=15")]
pub struct InvalidChannel(pub u8);

/// Errors from the device and controller layers.
///
/// `E` is the error type of the underlying I2C bus.
#[derive(Debug, Error)]
pub enum Error<E: Debug> {
    /// A channel outside `0..=15` was configured. Wiring or configuration bug.
    #[error(transparent)]
    InvalidChannel(#[from] InvalidChannel),
    /// The PWM frequency needs a prescale value the chip cannot hold.
    #[error("{0} Hz cannot be produced by the PCA9685 prescaler")]
    InvalidFrequency(u32),
    /// A calibration range breaks its ordering invariant.
    #[error("invalid calibration: {0}")]
    InvalidCalibration(&'static str),
    /// The bus could not be opened or the chip did not answer during initialization.
    #[error("PCA9685 at {address:#04x} is unavailable: {cause:?}")]
    DeviceUnavailable { address: u8, cause: E },
    /// The controller was used after `cleanup`.
    #[error("drive controller is closed")]
    ControllerClosed,
    /// A register write failed mid-session.
    #[error("I2C write failed: {0:?}")]
    Bus(E),
}
