//! A PCA9685 stand-in that records every register write.

#![allow(dead_code)]

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use piracer_control::codec::{pulse_to_count, RESOLUTION};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// LED0_ON_L through LED15_OFF_H
const CHANNEL_REGISTERS: std::ops::RangeInclusive<u8> = 0x06..=0x45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// One single-register write: `(device address, register, value)`.
pub type RegWrite = (u8, u8, u8);

/// Clones share the same log, so tests can inspect it after the controller owns the bus.
#[derive(Clone, Default)]
pub struct FakeBus {
    writes: Rc<RefCell<Vec<RegWrite>>>,
    fail: Rc<Cell<bool>>,
    mode1: u8,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following transfer fails.
    pub fn unplug(&self) {
        self.fail.set(true);
    }

    pub fn writes(&self) -> Vec<RegWrite> {
        self.writes.borrow().clone()
    }

    pub fn clear(&self) {
        self.writes.borrow_mut().clear();
    }

    /// Channel writes grouped as `(base register, [on_l, on_h, off_l, off_h])`.
    ///
    /// MODE1 and PRESCALE writes from initialization are skipped.
    pub fn channel_writes(&self) -> Vec<(u8, [u8; 4])> {
        let writes: Vec<RegWrite> = self
            .writes()
            .into_iter()
            .filter(|(_, register, _)| CHANNEL_REGISTERS.contains(register))
            .collect();
        writes
            .chunks(4)
            .map(|chunk| {
                let base = chunk[0].1;
                let mut bytes = [0u8; 4];
                for (i, (_, register, value)) in chunk.iter().enumerate() {
                    assert_eq!(*register, base + i as u8, "registers are not consecutive");
                    bytes[i] = *value;
                }
                (base, bytes)
            })
            .collect()
    }

    pub fn last_channel_write(&self) -> (u8, [u8; 4]) {
        *self.channel_writes().last().expect("no channel writes")
    }
}

impl Write for FakeBus {
    type Error = BusFault;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(BusFault);
        }
        assert_eq!(bytes.len(), 2, "expected a single register write");
        self.writes.borrow_mut().push((address, bytes[0], bytes[1]));
        Ok(())
    }
}

impl WriteRead for FakeBus {
    type Error = BusFault;

    fn write_read(&mut self, _address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(BusFault);
        }
        assert_eq!(bytes, &[0x00], "only MODE1 is read");
        buffer[0] = self.mode1;
        Ok(())
    }
}

#[derive(Default)]
pub struct NoDelay {
    pub total_ms: u32,
}

impl DelayMs<u32> for NoDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
    }
}

/// The bytes a 60 Hz pulse of `pulse_ms` puts in the channel registers.
pub fn pulse_bytes(pulse_ms: f32) -> [u8; 4] {
    let count = pulse_to_count(pulse_ms, embedded_time::rate::Hertz(60), RESOLUTION);
    [0, 0, (count & 0xFF) as u8, (count >> 8) as u8]
}
