//! Finds the pulse width that points the steering straight ahead.
//!
//! Put the car on a stand where you can see the front wheels. The result is printed, not saved:
//! copy it into the steering range of your config.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linux_embedded_hal::I2cdev;
use log::{info, warn};
use piracer_control::codec::Channel;
use piracer_control::host::{self, BusArgs, Interrupt, Interrupted, StdinLines};
use piracer_control::rc_control::calibration::{Adjust, CenterTuner, Tuning, CENTER_CANDIDATES_MS};
use piracer_control::{DriveConfig, Pca9685};
use std::io::Write;
use std::time::Duration;

/// Steering servo calibration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    bus: BusArgs,

    /// Channel the steering servo is wired to
    #[arg(long, default_value_t = DriveConfig::default().steering_channel)]
    channel: u8,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Mode {
    /// Step through candidate centers, then fine tune (the default)
    Full,
    /// Swing left and right around a given center
    Quick {
        /// Center to test, in milliseconds
        #[arg(default_value_t = 1.5)]
        center_ms: f32,
    },
}

struct Session<'a> {
    pwm: Pca9685<I2cdev>,
    channel: Channel,
    interrupt: &'a Interrupt,
    input: StdinLines,
}

impl Session<'_> {
    fn pulse(&mut self, pulse_ms: f32, hold_secs: u64) -> Result<()> {
        self.pwm.set_pulse(self.channel, pulse_ms)?;
        self.interrupt.sleep(Duration::from_secs(hold_secs))?;
        Ok(())
    }

    /// Prints a prompt and waits for a line. `None` once stdin is closed.
    fn ask(&self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        Ok(self.input.next(self.interrupt)?)
    }

    /// Left, center, right, center around `center_ms`.
    fn probe(&mut self, center_ms: f32) -> Result<()> {
        info!("center at {:.3} ms", center_ms);
        self.pulse(center_ms, 2)?;

        let tuner = CenterTuner::new(center_ms);
        for (label, pulse_ms) in ["left", "center", "right", "center"]
            .into_iter()
            .zip(tuner.probe_sequence())
        {
            info!("{} ({:.3} ms)", label, pulse_ms);
            self.pulse(pulse_ms, 1)?;
        }
        Ok(())
    }

    fn full(&mut self) -> Result<()> {
        info!("watch the wheels and note which position points them straight ahead");

        let mut best_ms = None;
        for (i, &pulse_ms) in CENTER_CANDIDATES_MS.iter().enumerate() {
            info!("position {}: {} ms", i + 1, pulse_ms);
            self.pulse(pulse_ms, 2)?;

            let answer = self.ask("Is this centered? (y/n/q to quit): ")?;
            match answer.as_deref().map(str::trim) {
                Some("y") | Some("Y") => {
                    best_ms = Some(pulse_ms);
                    break;
                }
                Some("q") | Some("Q") | None => break,
                _ => {}
            }
        }

        let start_ms = match best_ms {
            Some(ms) => ms,
            None => self.ask_start()?,
        };

        info!("fine tuning in {} ms steps", CenterTuner::STEP_MS);
        let mut tuner = CenterTuner::new(start_ms);
        self.pwm.set_pulse(self.channel, tuner.current_ms())?;
        let center_ms = loop {
            info!("current position: {:.3} ms", tuner.current_ms());
            let Some(line) = self.ask("Adjust: + (increase), - (decrease), c (centered), q (quit): ")? else {
                return Ok(());
            };
            let Some(adjust) = Adjust::parse(&line) else {
                warn!("unknown adjustment {:?}", line);
                continue;
            };
            match tuner.apply(adjust) {
                Tuning::Moved(pulse_ms) => {
                    self.pwm.set_pulse(self.channel, pulse_ms)?;
                }
                Tuning::Centered(pulse_ms) => break pulse_ms,
                Tuning::Abandoned => return Ok(()),
            }
        };

        self.probe(center_ms)?;
        println!("Steering center: {center_ms:.3} ms");
        Ok(())
    }

    fn ask_start(&self) -> Result<f32> {
        const DEFAULT_MS: f32 = 1.5;
        let answer = self.ask("Enter the best position from above (Enter for 1.5): ")?;
        match answer.as_deref().map(str::trim) {
            None | Some("") => Ok(DEFAULT_MS),
            Some(text) => text
                .parse::<f32>()
                .with_context(|| format!("{text:?} is not a pulse width")),
        }
    }
}

fn main() -> Result<()> {
    host::init_logging();
    let args = Args::parse();

    let interrupt = Interrupt::install().context("installing the Ctrl-C handler")?;
    let channel = Channel::new(args.channel)?;
    let pwm = host::open_pwm(&args.bus).context("opening the PCA9685")?;

    let mut session = Session {
        pwm,
        channel,
        interrupt: &interrupt,
        input: StdinLines::spawn(),
    };

    let result = match args.mode.unwrap_or(Mode::Full) {
        Mode::Full => session.full(),
        Mode::Quick { center_ms } => session.probe(center_ms),
    };

    // Release the servo on every path
    let released = session.pwm.set_off(channel);
    match host::finish(result, released, "releasing the servo") {
        Err(e) if e.is::<Interrupted>() => {
            info!("calibration stopped");
            Ok(())
        }
        result => result,
    }
}
