//! Throttle and steering control over two PCA9685 channels.

use crate::codec::{Channel, RegisterPair};
use crate::config::DriveConfig;
use crate::error::Error;
use crate::pca9685::Pca9685;
use crate::rc_control::calibration::clamp_command;
use crate::rc_control::traits::{Esc, Servo};
use core::fmt::Debug;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{debug, info, warn};

/// Owns the PWM chip and drives the steering servo and ESC of one car.
///
/// The controller is `Ready` from construction until [`cleanup`](Self::cleanup), after which it is
/// `Closed` and rejects every command. Dropping a ready controller cleans it up, so the motor is
/// returned to neutral on every exit path that unwinds the stack.
pub struct DriveController<I2C: Write> {
    // None once closed
    pwm: Option<Pca9685<I2C>>,
    steering: Channel,
    throttle: Channel,
    config: DriveConfig,
}

impl<I2C, E> DriveController<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Initializes the chip on `i2c` and parks the car: throttle neutral, steering centered.
    pub fn new(
        i2c: I2C,
        config: DriveConfig,
        delay: &mut dyn DelayMs<u32>,
    ) -> Result<Self, Error<E>> {
        let steering = Channel::new(config.steering_channel)?;
        let throttle = Channel::new(config.throttle_channel)?;
        config.validate().map_err(Error::InvalidCalibration)?;

        let pwm = Pca9685::new(i2c, config.address, config.frequency, delay)?;

        let mut controller = DriveController {
            pwm: Some(pwm),
            steering,
            throttle,
            config,
        };
        controller.set_throttle(0.0)?;
        controller.set_steering(0.0)?;

        info!(
            "drive controller ready: steering ch{}, throttle ch{}",
            steering.index(),
            throttle.index()
        );
        Ok(controller)
    }

    pub fn is_closed(&self) -> bool {
        self.pwm.is_none()
    }

    /// Pulse width, in milliseconds, that a throttle command produces.
    pub fn throttle_pulse_ms(&self, value: f32) -> f32 {
        self.config.throttle.pulse_ms(clamp_command(value))
    }

    /// Pulse width, in milliseconds, that a steering command produces.
    pub fn steering_pulse_ms(&self, value: f32) -> f32 {
        self.config.steering.pulse_ms(clamp_command(value))
    }

    /// Sets the motor to a throttle in \[-1,1\]. Positive is forward.
    ///
    /// Out of range values are clamped rather than rejected.
    pub fn set_throttle(&mut self, value: f32) -> Result<(), Error<E>> {
        let clamped = clamp_command(value);
        if clamped != value {
            warn!("throttle {} clamped to {}", value, clamped);
        }

        let pulse_ms = self.config.throttle.pulse_ms(clamped);
        if clamped != 0.0 && self.config.throttle.in_dead_zone(pulse_ms) {
            debug!("throttle {} ({} ms) is inside the ESC dead zone", clamped, pulse_ms);
        }

        let channel = self.throttle;
        let count = self.pwm()?.set_pulse(channel, pulse_ms)?;
        debug!("throttle {} -> {} ms ({})", clamped, pulse_ms, count);
        Ok(())
    }

    /// Sets the steering to a position in \[-1,1\]. Negative is left.
    ///
    /// Out of range values are clamped rather than rejected.
    pub fn set_steering(&mut self, value: f32) -> Result<(), Error<E>> {
        let clamped = clamp_command(value);
        if clamped != value {
            warn!("steering {} clamped to {}", value, clamped);
        }

        let pulse_ms = self.config.steering.pulse_ms(clamped);
        let channel = self.steering;
        let count = self.pwm()?.set_pulse(channel, pulse_ms)?;
        debug!("steering {} -> {} ms ({})", clamped, pulse_ms, count);
        Ok(())
    }

    /// Stops the motor. Steering is left where it is.
    pub fn stop(&mut self) -> Result<(), Error<E>> {
        self.set_throttle(0.0)
    }

    /// Stops the motor and centers the steering.
    pub fn park(&mut self) -> Result<(), Error<E>> {
        self.stop()?;
        self.set_steering(0.0)
    }

    /// Returns the motor to neutral and closes the controller.
    ///
    /// The controller is closed even if the final write fails. Calling this again does nothing.
    pub fn cleanup(&mut self) -> Result<(), Error<E>> {
        match self.close() {
            None => Ok(()),
            Some((_, Ok(()))) => {
                info!("drive controller closed, throttle at neutral");
                Ok(())
            }
            Some((_, Err(e))) => {
                warn!("failed to return throttle to neutral: {:?}", e);
                Err(Error::Bus(e))
            }
        }
    }

    /// Parks the car, cleans up, holds every output low and gives the bus back.
    ///
    /// Each step is attempted even if an earlier one fails; the first failure is returned.
    pub fn shutdown(mut self) -> Result<I2C, Error<E>> {
        let parked = self.park();
        let (mut pwm, neutral) = self.close().ok_or(Error::ControllerClosed)?;
        let stopped = pwm.all_off();

        parked?;
        neutral.map_err(Error::Bus)?;
        stopped?;
        info!("drive controller shut down");
        Ok(pwm.release())
    }

    fn pwm(&mut self) -> Result<&mut Pca9685<I2C>, Error<E>> {
        self.pwm.as_mut().ok_or(Error::ControllerClosed)
    }
}

impl<I2C: Write> DriveController<I2C> {
    /// Takes the chip out and writes the neutral throttle pulse. `None` if already closed.
    fn close(&mut self) -> Option<(Pca9685<I2C>, Result<(), I2C::Error>)> {
        let mut pwm = self.pwm.take()?;
        let neutral = pwm.pulse_count(self.config.throttle.neutral_ms);
        let written = pwm.write_pair(self.throttle, RegisterPair::pulse(neutral));
        Some((pwm, written))
    }
}

impl<I2C: Write> Drop for DriveController<I2C> {
    fn drop(&mut self) {
        if let Some((_, Err(_))) = self.close() {
            warn!("throttle could not be returned to neutral while dropping the controller");
        }
    }
}

impl<I2C, E> Esc for DriveController<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    type Error = Error<E>;

    fn set_neutral(&mut self) -> Result<(), Self::Error> {
        self.stop()
    }

    fn set_forward(&mut self, percent_power: f32) -> Result<(), Self::Error> {
        self.set_throttle(percent_power.clamp(0.0, 1.0))
    }

    fn set_reverse(&mut self, percent_power: f32) -> Result<(), Self::Error> {
        self.set_throttle(-percent_power.clamp(0.0, 1.0))
    }
}

impl<I2C, E> Servo for DriveController<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    type Error = Error<E>;

    fn set_position(&mut self, position: f32) -> Result<(), Self::Error> {
        self.set_steering(position)
    }
}
