//! Running on a Linux host: the I2C character device, Ctrl-C, and options shared by the binaries.

use crate::config::DriveConfig;
use crate::error::Error;
use crate::pca9685::Pca9685;
use crate::rc_control::DriveController;
use clap::Args;
use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::{Delay, I2cdev};
use log::{error, info, warn};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// A controller on a Linux I2C bus.
pub type Car = DriveController<I2cdev>;

/// Errors from a Linux I2C bus.
pub type CarError = Error<LinuxI2CError>;

// How often blocked waits look at the interrupt flag
const POLL: Duration = Duration::from_millis(50);

/// Where to find the PCA9685.
#[derive(Debug, Clone, Args)]
pub struct BusArgs {
    /// I2C character device the PCA9685 is attached to
    #[arg(long, default_value = "/dev/i2c-1")]
    pub bus: PathBuf,

    /// 7-bit I2C address of the PCA9685, decimal or 0x-prefixed hex
    #[arg(long, default_value = "0x40", value_parser = parse_address)]
    pub address: u8,
}

fn parse_address(text: &str) -> Result<u8, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse::<u8>(),
    };

    match parsed {
        Ok(address) if address <= 0x7F => Ok(address),
        Ok(address) => Err(format!("{address:#04x} is not a 7-bit address")),
        Err(e) => Err(format!("invalid address {text:?}: {e}")),
    }
}

/// Opens the I2C character device.
pub fn open_bus(path: &Path, address: u8) -> Result<I2cdev, CarError> {
    I2cdev::new(path).map_err(|cause| Error::DeviceUnavailable { address, cause })
}

/// Opens the bus and builds a controller. `config.address` is replaced by the one in `args`.
pub fn open_car(args: &BusArgs, config: DriveConfig) -> Result<Car, CarError> {
    let config = DriveConfig {
        address: args.address,
        ..config
    };
    let i2c = open_bus(&args.bus, config.address)?;
    info!("opened {}", args.bus.display());
    DriveController::new(i2c, config, &mut Delay)
}

/// Opens the bus for raw channel access, bypassing the drive calibration.
pub fn open_pwm(args: &BusArgs) -> Result<Pca9685<I2cdev>, CarError> {
    let i2c = open_bus(&args.bus, args.address)?;
    info!("opened {}", args.bus.display());
    Pca9685::new(i2c, args.address, DriveConfig::default().frequency, &mut Delay)
}

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Combines the outcome of a session with the outcome of releasing the hardware after it.
///
/// A failed release takes precedence. The session error it replaces is logged first.
pub fn finish<T, R>(
    session: anyhow::Result<T>,
    released: Result<R, CarError>,
    releasing: &'static str,
) -> anyhow::Result<T> {
    match released {
        Ok(_) => session,
        Err(e) => {
            if let Err(primary) = &session {
                error!("{:#}", primary);
            }
            Err(anyhow::Error::new(e).context(releasing))
        }
    }
}

/// Returned by waits that were cut short by Ctrl-C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interrupted by user")]
pub struct Interrupted;

/// Raised once the process receives Ctrl-C.
///
/// Callers poll it while waiting and unwind, which drops the controller and parks the motor.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Installs the process-wide Ctrl-C handler. Can only be done once per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let interrupt = Interrupt::default();
        let flag = interrupt.0.clone();
        ctrlc::set_handler(move || {
            warn!("Ctrl-C received, stopping");
            flag.store(true, Ordering::SeqCst);
        })?;
        Ok(interrupt)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_raised() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration`, waking early if interrupted.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(POLL.min(deadline - now));
        }
    }
}

/// Lines from stdin, read on a helper thread so waiting for input can be interrupted.
pub struct StdinLines {
    rx: mpsc::Receiver<String>,
}

impl StdinLines {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        StdinLines { rx }
    }

    /// Waits for the next line. `None` once stdin is closed.
    pub fn next(&self, interrupt: &Interrupt) -> Result<Option<String>, Interrupted> {
        loop {
            interrupt.check()?;
            match self.rx.recv_timeout(POLL) {
                Ok(line) => return Ok(Some(line)),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_parse_as_hex_or_decimal() {
        assert_eq!(parse_address("0x40"), Ok(0x40));
        assert_eq!(parse_address("0X41"), Ok(0x41));
        assert_eq!(parse_address("64"), Ok(0x40));
        assert!(parse_address("0x80").is_err());
        assert!(parse_address("forty").is_err());
    }

    #[test]
    fn interrupted_sleep_returns_early() {
        let interrupt = Interrupt::default();
        let remote = interrupt.clone();
        let raiser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.raise();
        });

        let start = Instant::now();
        assert_eq!(interrupt.sleep(Duration::from_secs(30)), Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(5));
        raiser.join().unwrap();
    }

    #[test]
    fn uninterrupted_sleep_completes() {
        let interrupt = Interrupt::default();
        assert_eq!(interrupt.sleep(Duration::from_millis(60)), Ok(()));
        assert!(!interrupt.is_raised());
    }

    #[test]
    fn clean_release_keeps_the_session_outcome() {
        let done = finish(Ok(7), Ok::<_, CarError>(()), "releasing");
        assert_eq!(done.unwrap(), 7);

        let failed = finish::<(), _>(Err(Interrupted.into()), Ok::<_, CarError>(()), "releasing");
        assert!(failed.unwrap_err().is::<Interrupted>());
    }

    #[test]
    fn failed_release_is_reported_with_context() {
        let failed = finish::<(), ()>(
            Err(Interrupted.into()),
            Err(Error::ControllerClosed),
            "stopping all channels",
        )
        .unwrap_err();

        assert_eq!(failed.to_string(), "stopping all channels");
        assert!(matches!(
            failed.downcast_ref::<CarError>(),
            Some(Error::ControllerClosed)
        ));
    }

    #[test]
    fn missing_bus_is_device_unavailable() {
        let args = BusArgs {
            bus: PathBuf::from("/dev/does-not-exist-i2c-99"),
            address: 0x40,
        };
        assert!(matches!(
            open_car(&args, DriveConfig::default()),
            Err(Error::DeviceUnavailable { address: 0x40, .. })
        ));
    }
}
