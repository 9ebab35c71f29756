//! Drives the car in a slow circle for a fixed time.
//!
//! Give it room to circle, and keep Ctrl-C handy: it parks the car at any point.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use piracer_control::host::{self, BusArgs, Car, Interrupt, Interrupted};
use piracer_control::DriveConfig;
use std::time::{Duration, Instant};

const COUNTDOWN: u64 = 3;
const STATUS_EVERY: Duration = Duration::from_secs(10);

/// Slow forward with a full left turn, then park
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    bus: BusArgs,

    /// How long to circle, in seconds
    #[arg(long, default_value_t = 60)]
    seconds: u64,

    /// Throttle while circling, in [-1, 1]
    #[arg(long, default_value_t = 0.34, allow_negative_numbers = true)]
    throttle: f32,

    /// Steering while circling, in [-1, 1]; negative is left
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    steering: f32,
}

fn main() -> Result<()> {
    host::init_logging();
    let args = Args::parse();

    let interrupt = Interrupt::install().context("installing the Ctrl-C handler")?;
    match run(&args, &interrupt) {
        Err(e) if e.is::<Interrupted>() => {
            info!("demo interrupted, outputs stopped");
            Ok(())
        }
        result => result,
    }
}

fn run(args: &Args, interrupt: &Interrupt) -> Result<()> {
    let mut car = host::open_car(&args.bus, DriveConfig::default())
        .context("opening the PCA9685")?;

    let result = circle(&mut car, args, interrupt);
    host::finish(result, car.shutdown(), "shutting down the car")
}

fn circle(car: &mut Car, args: &Args, interrupt: &Interrupt) -> Result<()> {
    info!("circling for {} s, Ctrl-C stops early", args.seconds);
    for remaining in (1..=COUNTDOWN).rev() {
        info!("{}...", remaining);
        interrupt.sleep(Duration::from_secs(1))?;
    }

    info!(
        "throttle {} ({:.2} ms), steering {} ({:.2} ms)",
        args.throttle,
        car.throttle_pulse_ms(args.throttle),
        args.steering,
        car.steering_pulse_ms(args.steering)
    );
    car.set_throttle(args.throttle)?;
    car.set_steering(args.steering)?;

    let duration = Duration::from_secs(args.seconds);
    let start = Instant::now();
    while let Some(remaining) = duration.checked_sub(start.elapsed()) {
        if remaining.is_zero() {
            break;
        }
        interrupt.sleep(remaining.min(STATUS_EVERY))?;
        if let Some(left) = duration.checked_sub(start.elapsed()) {
            info!("{} s remaining", left.as_secs());
        }
    }

    info!("demo complete, stopping");
    car.park()?;
    interrupt.sleep(Duration::from_secs(2))?;
    Ok(())
}
