//! Conversion between servo pulse widths and PCA9685 12-bit counts.
//!
//! The PCA9685 splits every PWM period into `resolution` ticks. A channel goes high at its ON
//! count and low at its OFF count; with ON fixed at 0 the OFF count alone encodes the pulse width.

use crate::error::InvalidChannel;
use embedded_time::duration::Microseconds;
use embedded_time::rate::Hertz;

/// Counter resolution of the PCA9685 (12 bits).
pub const RESOLUTION: u16 = 4096;

/// Number of PWM outputs on the chip.
pub const CHANNEL_COUNT: u8 = 16;

/// First register of channel 0 (`LED0_ON_L`).
pub const LED0_ON_L: u8 = 0x06;

/// Internal oscillator frequency the prescaler divides.
const OSCILLATOR_HZ: f32 = 25_000_000.0;

/// Microseconds per tick for the given frequency and resolution.
fn tick_us(freq: Hertz, resolution: u16) -> f32 {
    let period_us = 1_000_000.0 / freq.0 as f32;
    period_us / resolution as f32
}

/// Converts a pulse width in milliseconds to an OFF count.
///
/// The result is clamped to `[0, resolution - 1]`; negative or NaN widths produce 0.
pub fn pulse_to_count(pulse_ms: f32, freq: Hertz, resolution: u16) -> u16 {
    // NaN fails this comparison too
    if !(pulse_ms > 0.0) {
        return 0;
    }

    let ticks = libm::roundf(pulse_ms * 1000.0 / tick_us(freq, resolution));
    let max = resolution.saturating_sub(1);

    if ticks >= max as f32 {
        max
    } else {
        ticks as u16
    }
}

/// Converts a pulse width in microseconds to an OFF count.
pub fn pulse_us_to_count(pulse: Microseconds<u32>, freq: Hertz, resolution: u16) -> u16 {
    pulse_to_count(pulse.0 as f32 / 1000.0, freq, resolution)
}

/// Converts an OFF count back to the pulse width it produces, in milliseconds.
pub fn count_to_pulse(count: u16, freq: Hertz, resolution: u16) -> f32 {
    count as f32 * tick_us(freq, resolution) / 1000.0
}

/// Prescale register value for a PWM frequency, or `None` if the chip can't produce it.
pub fn prescale_for(freq: Hertz) -> Option<u8> {
    if freq.0 == 0 {
        return None;
    }

    let prescale = OSCILLATOR_HZ / (RESOLUTION as f32 * freq.0 as f32) - 1.0;

    // The chip forces values below 3 up to 3
    if (3.0..256.0).contains(&prescale) {
        Some(prescale as u8)
    } else {
        None
    }
}

/// Register addresses for one channel, as `(on_low, on_high, off_low, off_high)`.
pub fn channel_registers(channel: u8) -> Result<(u8, u8, u8, u8), InvalidChannel> {
    Channel::new(channel).map(Channel::registers)
}

/// A validated PCA9685 output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Every channel on the chip, in order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT).map(Channel)
    }

    pub fn new(index: u8) -> Result<Self, InvalidChannel> {
        if index < CHANNEL_COUNT {
            Ok(Channel(index))
        } else {
            Err(InvalidChannel(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// `(on_low, on_high, off_low, off_high)` register addresses.
    pub fn registers(self) -> (u8, u8, u8, u8) {
        let base = LED0_ON_L + 4 * self.0;
        (base, base + 1, base + 2, base + 3)
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Channel::new(index)
    }
}

/// ON/OFF counts for one channel, split into the bytes the registers hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPair {
    pub on: u16,
    pub off: u16,
}

impl RegisterPair {
    /// A pulse that starts at the beginning of the period and ends at `off`.
    pub fn pulse(off: u16) -> Self {
        RegisterPair { on: 0, off }
    }

    /// Bytes for `(on_low, on_high, off_low, off_high)`.
    pub fn bytes(self) -> [u8; 4] {
        [
            (self.on & 0xFF) as u8,
            (self.on >> 8) as u8,
            (self.off & 0xFF) as u8,
            (self.off >> 8) as u8,
        ]
    }
}
