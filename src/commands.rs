//! Commands sent to drive the car.
//!
//! Each command is one ASCII line, delimited from the prior by newline.

use crate::error::Error;
use crate::rc_control::DriveController;
use ascii::AsciiStr;
use core::fmt::Debug;
use embedded_hal::blocking::i2c::{Write, WriteRead};

/// Longest line the [`LineBuffer`] holds, newline excluded.
pub const MAX_LINE: usize = 64;

/// Everything a caller can ask of a [`DriveController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Drive at a throttle in \[-1,1\]. Negative reverses.
    ///
    /// Sent in form:
    ///
    /// 'T X' where X is a decimal number, e.g. `T 0.2`.
    Throttle(f32),
    /// Steer to a position in \[-1,1\]. Negative is left.
    ///
    /// Sent in form:
    ///
    /// 'S X' where X is a decimal number, e.g. `S -0.5`.
    Steering(f32),
    /// Stop motion
    ///
    /// Sent in form:
    ///
    /// 'N'
    Stop,
    /// Return to neutral and close the controller
    ///
    /// Sent in form:
    ///
    /// 'D'
    Cleanup,
}

/// Reasons a line is not a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("command line is not ASCII")]
    NotAscii,
    #[error("unknown command {0:?}")]
    Unknown(char),
    #[error("command needs a numeric value")]
    InvalidValue,
    #[error("command line longer than 64 bytes")]
    LineTooLong,
}

impl TryFrom<&[u8]> for Command {
    type Error = CommandError;

    fn try_from(other: &[u8]) -> Result<Self, Self::Error> {
        fn f32_from_ascii(data: &[u8]) -> Result<f32, CommandError> {
            let asci = AsciiStr::from_ascii(data).map_err(|_| CommandError::NotAscii)?;
            asci.as_str()
                .trim()
                .parse::<f32>()
                .map_err(|_| CommandError::InvalidValue)
        }

        let line = AsciiStr::from_ascii(other)
            .map_err(|_| CommandError::NotAscii)?
            .as_str()
            .trim();
        let (&op, rest) = line.as_bytes().split_first().ok_or(CommandError::Empty)?;

        match op {
            // Throttle
            b'T' => Ok(Command::Throttle(f32_from_ascii(rest)?)),
            // Steering
            b'S' => Ok(Command::Steering(f32_from_ascii(rest)?)),
            // Neutral
            b'N' if rest.is_empty() => Ok(Command::Stop),
            // Shut down
            b'D' if rest.is_empty() => Ok(Command::Cleanup),
            b'N' | b'D' => Err(CommandError::InvalidValue),
            _ => Err(CommandError::Unknown(op as char)),
        }
    }
}

impl Command {
    /// Runs the command against a controller.
    pub fn apply<I2C, E>(self, car: &mut DriveController<I2C>) -> Result<(), Error<E>>
    where
        I2C: Write<Error = E> + WriteRead<Error = E>,
        E: Debug,
    {
        match self {
            Command::Throttle(value) => car.set_throttle(value),
            Command::Steering(value) => car.set_steering(value),
            Command::Stop => car.stop(),
            Command::Cleanup => car.cleanup(),
        }
    }
}

/// Collects bytes until a full command line has arrived.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: heapless::Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte. Returns a parsed command once a newline completes the line.
    ///
    /// An overlong line is dropped whole and reported when its newline arrives.
    pub fn push(&mut self, byte: u8) -> Result<Option<Command>, CommandError> {
        match byte {
            b'\n' => {
                let result = if self.overflowed {
                    Err(CommandError::LineTooLong)
                } else {
                    Command::try_from(self.line.as_slice()).map(Some)
                };
                self.line.clear();
                self.overflowed = false;
                result
            }
            b'\r' => Ok(None),
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
                Ok(None)
            }
        }
    }
}
