//! Wiring and calibration of one car.

use crate::pca9685::DEFAULT_ADDRESS;
use crate::rc_control::calibration::{SteeringRange, ThrottleRange};
use embedded_time::rate::Hertz;

/// Everything the [`DriveController`](crate::DriveController) needs to know about the car.
///
/// Fixed once the controller is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveConfig {
    /// 7-bit I2C address of the PCA9685.
    pub address: u8,
    /// Output frequency; servos and ESCs expect 50-60 Hz.
    pub frequency: Hertz,
    pub steering_channel: u8,
    pub throttle_channel: u8,
    pub steering: SteeringRange,
    pub throttle: ThrottleRange,
}

impl Default for DriveConfig {
    /// The PiRacer Pro: servo on channel 0, ESC on channel 1, 60 Hz.
    fn default() -> Self {
        DriveConfig {
            address: DEFAULT_ADDRESS,
            frequency: Hertz(60),
            steering_channel: 0,
            throttle_channel: 1,
            steering: SteeringRange::PIRACER,
            throttle: ThrottleRange::PIRACER,
        }
    }
}

impl DriveConfig {
    /// Checks both calibration ranges.
    pub fn validate(&self) -> Result<(), &'static str> {
        self.steering.validate()?;
        self.throttle.validate()?;
        if self.steering_channel == self.throttle_channel {
            return Err("steering and throttle share a channel");
        }
        Ok(())
    }
}
