//! Register-level access to a PCA9685 PWM controller.

use crate::codec::{self, Channel, RegisterPair, RESOLUTION};
use crate::error::Error;
use core::fmt::Debug;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_time::rate::Hertz;
use log::{debug, info, warn};

/// Default 7-bit bus address of the chip.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Mode register 1.
pub const MODE1: u8 = 0x00;
/// Prescaler for the PWM output frequency.
pub const PRESCALE: u8 = 0xFE;

const MODE1_RESTART: u8 = 0x80;
const MODE1_SLEEP: u8 = 0x10;
const MODE1_AUTO_INCREMENT: u8 = 0x20;

/// Shortest pulse [`Pca9685::set_pulse`] will send, in milliseconds.
pub const MIN_PULSE_MS: f32 = 0.5;
/// Longest pulse [`Pca9685::set_pulse`] will send, in milliseconds.
pub const MAX_PULSE_MS: f32 = 2.5;

// Oscillator needs up to 500us after leaving sleep; the init sequence waits a full 10ms.
const SETTLE_MS: u32 = 10;

/// A PCA9685 reached through a blocking I2C bus.
pub struct Pca9685<I2C> {
    i2c: I2C,
    address: u8,
    freq: Hertz,
}

impl<I2C: Write> Pca9685<I2C> {
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[register, value])
    }

    /// Four single-byte writes: ON low, ON high, OFF low, OFF high.
    pub(crate) fn write_pair(&mut self, channel: Channel, pair: RegisterPair) -> Result<(), I2C::Error> {
        let (on_l, on_h, off_l, off_h) = channel.registers();
        let [on_low, on_high, off_low, off_high] = pair.bytes();

        self.write_register(on_l, on_low)?;
        self.write_register(on_h, on_high)?;
        self.write_register(off_l, off_low)?;
        self.write_register(off_h, off_high)
    }

    pub(crate) fn pulse_count(&self, pulse_ms: f32) -> u16 {
        codec::pulse_to_count(pulse_ms, self.freq, RESOLUTION)
    }
}

impl<I2C, E> Pca9685<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Wakes the chip, programs the prescaler for `freq`, and enables register auto-increment.
    ///
    /// Any bus failure during this sequence is reported as [`Error::DeviceUnavailable`].
    pub fn new(
        i2c: I2C,
        address: u8,
        freq: Hertz,
        delay: &mut dyn DelayMs<u32>,
    ) -> Result<Self, Error<E>> {
        let prescale = codec::prescale_for(freq).ok_or(Error::InvalidFrequency(freq.0))?;

        let mut pwm = Pca9685 { i2c, address, freq };
        pwm.init(prescale, delay)
            .map_err(|cause| Error::DeviceUnavailable { address, cause })?;

        info!("PCA9685 at {:#04x} initialized at {} Hz", address, freq.0);
        Ok(pwm)
    }

    fn init(&mut self, prescale: u8, delay: &mut dyn DelayMs<u32>) -> Result<(), E> {
        self.write_register(MODE1, 0x00)?;
        delay.delay_ms(SETTLE_MS);

        let old_mode = self.read_register(MODE1)?;
        // Prescale can only be written while asleep
        let sleep_mode = (old_mode & !MODE1_RESTART) | MODE1_SLEEP;
        self.write_register(MODE1, sleep_mode)?;
        self.write_register(PRESCALE, prescale)?;
        self.write_register(MODE1, old_mode)?;
        delay.delay_ms(SETTLE_MS);

        self.write_register(MODE1, old_mode | MODE1_AUTO_INCREMENT)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, E> {
        let mut value = [0u8];
        self.i2c.write_read(self.address, &[register], &mut value)?;
        Ok(value[0])
    }
}

impl<I2C, E> Pca9685<I2C>
where
    I2C: Write<Error = E>,
    E: Debug,
{
    /// Writes raw ON/OFF counts to a channel, one register at a time.
    pub fn set_pwm(&mut self, channel: Channel, pair: RegisterPair) -> Result<(), Error<E>> {
        debug!("ch{} on={} off={}", channel.index(), pair.on, pair.off);
        self.write_pair(channel, pair).map_err(Error::Bus)
    }

    /// Sets a channel to a pulse width in milliseconds. Returns the OFF count written.
    ///
    /// Widths outside [`MIN_PULSE_MS`]..=[`MAX_PULSE_MS`] are clamped; use [`set_off`](Self::set_off)
    /// to stop pulsing a channel.
    pub fn set_pulse(&mut self, channel: Channel, pulse_ms: f32) -> Result<u16, Error<E>> {
        let limited = limit_pulse(pulse_ms);
        if limited != pulse_ms && !pulse_ms.is_nan() {
            warn!("ch{} pulse {} ms limited to {} ms", channel.index(), pulse_ms, limited);
        }
        let count = self.pulse_count(limited);
        self.set_pwm(channel, RegisterPair::pulse(count))?;
        Ok(count)
    }

    /// Holds a channel low.
    pub fn set_off(&mut self, channel: Channel) -> Result<(), Error<E>> {
        self.set_pwm(channel, RegisterPair { on: 0, off: 0 })
    }

    /// Holds every channel low.
    pub fn all_off(&mut self) -> Result<(), Error<E>> {
        for channel in Channel::all() {
            self.set_off(channel)?;
        }
        info!("all PCA9685 outputs stopped");
        Ok(())
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Clamps a pulse width to what a hobby servo or ESC accepts.
///
/// NaN is passed through; the codec turns it into a zero count, which idles the output.
pub fn limit_pulse(pulse_ms: f32) -> f32 {
    pulse_ms.clamp(MIN_PULSE_MS, MAX_PULSE_MS)
}
