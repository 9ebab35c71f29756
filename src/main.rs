//! Drives the car from command lines on stdin.
//!
//! `T 0.3` sets throttle, `S -0.5` steers, `N` stops, `D` parks the car and exits.
//! Ctrl-C or end of input also parks the car.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use piracer_control::commands::{Command, LineBuffer};
use piracer_control::host::{self, BusArgs, Interrupt, Interrupted, StdinLines};
use piracer_control::DriveConfig;

/// Reads drive commands from stdin and applies them to the car
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    bus: BusArgs,
}

fn main() -> Result<()> {
    host::init_logging();
    let args = Args::parse();

    let interrupt = Interrupt::install().context("installing the Ctrl-C handler")?;
    match run(&args, &interrupt) {
        Err(e) if e.is::<Interrupted>() => {
            info!("stopped by user");
            Ok(())
        }
        result => result,
    }
}

fn run(args: &Args, interrupt: &Interrupt) -> Result<()> {
    let mut car = host::open_car(&args.bus, DriveConfig::default())
        .with_context(|| format!("opening the PCA9685 on {}", args.bus.bus.display()))?;

    let input = StdinLines::spawn();
    let mut buffer = LineBuffer::new();
    info!("ready for commands: T <throttle>, S <steering>, N, D");

    // Event loop
    while let Some(line) = input.next(interrupt)? {
        for byte in line.bytes().chain(Some(b'\n')) {
            match buffer.push(byte) {
                Ok(None) => {}
                Ok(Some(command)) => {
                    command.apply(&mut car)?;
                    info!("applied {:?}", command);
                    if command == Command::Cleanup {
                        return Ok(());
                    }
                }
                Err(e) => warn!("ignoring {:?}: {}", line, e),
            }
        }
    }

    info!("end of input");
    car.cleanup()?;
    Ok(())
}
