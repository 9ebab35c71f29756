//! Calibrated pulse ranges for the PiRacer's steering servo and ESC.
//!
//! All widths are in milliseconds at the chip's configured PWM frequency.

/// Steering servo range. Full left, center and full right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringRange {
    pub min_ms: f32,
    pub center_ms: f32,
    pub max_ms: f32,
}

impl SteeringRange {
    /// Range measured on the PiRacer Pro servo.
    pub const PIRACER: SteeringRange = SteeringRange {
        min_ms: 1.55,
        center_ms: 1.80,
        max_ms: 2.05,
    };

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.min_ms < self.center_ms && self.center_ms < self.max_ms {
            Ok(())
        } else {
            Err("steering must satisfy min < center < max")
        }
    }

    /// Maps a position in `[-1, 1]` onto the range. `value` must already be clamped.
    pub fn pulse_ms(&self, value: f32) -> f32 {
        if value > 0.0 {
            self.center_ms + value * (self.max_ms - self.center_ms)
        } else if value < 0.0 {
            self.center_ms + value * (self.center_ms - self.min_ms)
        } else {
            self.center_ms
        }
    }
}

/// ESC range. The bands around neutral need not be symmetric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleRange {
    /// Full reverse.
    pub reverse_min_ms: f32,
    /// Slowest reverse the ESC responds to.
    pub reverse_max_ms: f32,
    pub neutral_ms: f32,
    /// Slowest forward the ESC responds to.
    pub forward_min_ms: f32,
    /// Full forward.
    pub forward_max_ms: f32,
}

impl ThrottleRange {
    /// Range measured on the PiRacer Pro ESC.
    pub const PIRACER: ThrottleRange = ThrottleRange {
        reverse_min_ms: 1.1,
        reverse_max_ms: 1.4,
        neutral_ms: 1.5,
        forward_min_ms: 1.61,
        forward_max_ms: 2.0,
    };

    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.reverse_min_ms <= self.reverse_max_ms && self.reverse_max_ms < self.neutral_ms) {
            return Err("reverse band must lie below neutral");
        }
        if !(self.neutral_ms < self.forward_min_ms && self.forward_min_ms <= self.forward_max_ms) {
            return Err("forward band must lie above neutral");
        }
        Ok(())
    }

    /// Maps a throttle in `[-1, 1]` onto the range. `value` must already be clamped.
    ///
    /// Both directions interpolate from neutral, so small commands can land in the dead zone.
    pub fn pulse_ms(&self, value: f32) -> f32 {
        if value > 0.0 {
            self.neutral_ms + value * (self.forward_max_ms - self.neutral_ms)
        } else if value < 0.0 {
            self.neutral_ms + value * (self.neutral_ms - self.reverse_min_ms)
        } else {
            self.neutral_ms
        }
    }

    /// Whether a pulse sits between the two bands, where the ESC holds the motor still.
    pub fn in_dead_zone(&self, pulse_ms: f32) -> bool {
        pulse_ms > self.reverse_max_ms && pulse_ms < self.forward_min_ms
    }
}

/// Clamps a normalized command into `[-1, 1]`. NaN is treated as neutral.
pub fn clamp_command(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Center positions stepped through when searching for straight-ahead.
pub const CENTER_CANDIDATES_MS: [f32; 9] = [1.3, 1.35, 1.4, 1.45, 1.5, 1.55, 1.6, 1.65, 1.7];

/// Offset from center used to check left and right travel.
pub const PROBE_OFFSET_MS: f32 = 0.3;

/// Adjustments accepted while fine tuning the steering center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Increase,
    Decrease,
    Accept,
    Quit,
}

impl Adjust {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "+" => Some(Adjust::Increase),
            "-" => Some(Adjust::Decrease),
            "c" | "C" => Some(Adjust::Accept),
            "q" | "Q" => Some(Adjust::Quit),
            _ => None,
        }
    }
}

/// Fine tuning state for the steering center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterTuner {
    current_ms: f32,
    step_ms: f32,
}

/// Result of applying an [`Adjust`] to a [`CenterTuner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tuning {
    /// Keep going, drive the servo to this width.
    Moved(f32),
    /// The operator accepted this center.
    Centered(f32),
    /// The operator gave up.
    Abandoned,
}

impl CenterTuner {
    pub const STEP_MS: f32 = 0.01;

    pub fn new(start_ms: f32) -> Self {
        CenterTuner {
            current_ms: start_ms,
            step_ms: Self::STEP_MS,
        }
    }

    pub fn current_ms(&self) -> f32 {
        self.current_ms
    }

    pub fn apply(&mut self, adjust: Adjust) -> Tuning {
        match adjust {
            Adjust::Increase => {
                self.current_ms += self.step_ms;
                Tuning::Moved(self.current_ms)
            }
            Adjust::Decrease => {
                // Never walk the pulse below zero
                self.current_ms = (self.current_ms - self.step_ms).max(0.0);
                Tuning::Moved(self.current_ms)
            }
            Adjust::Accept => Tuning::Centered(self.current_ms),
            Adjust::Quit => Tuning::Abandoned,
        }
    }

    /// Left probe, center, right probe, center.
    pub fn probe_sequence(&self) -> [f32; 4] {
        [
            self.current_ms - PROBE_OFFSET_MS,
            self.current_ms,
            self.current_ms + PROBE_OFFSET_MS,
            self.current_ms,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        libm::fabsf(a - b) < 1e-5
    }

    #[test]
    fn piracer_ranges_are_valid() {
        assert!(SteeringRange::PIRACER.validate().is_ok());
        assert!(ThrottleRange::PIRACER.validate().is_ok());
    }

    #[test]
    fn steering_endpoints() {
        let range = SteeringRange::PIRACER;
        assert!(close(range.pulse_ms(-1.0), 1.55));
        assert!(close(range.pulse_ms(0.0), 1.80));
        assert!(close(range.pulse_ms(1.0), 2.05));
        assert!(close(range.pulse_ms(-0.5), 1.675));
    }

    #[test]
    fn throttle_bands_are_asymmetric() {
        let range = ThrottleRange::PIRACER;
        assert!(close(range.pulse_ms(1.0), 2.0));
        assert!(close(range.pulse_ms(-1.0), 1.1));
        assert!(close(range.pulse_ms(0.2), 1.6));
        assert!(close(range.pulse_ms(-0.2), 1.42));
        assert_eq!(range.pulse_ms(0.0), 1.5);
    }

    #[test]
    fn dead_zone() {
        let range = ThrottleRange::PIRACER;
        assert!(range.in_dead_zone(1.5));
        assert!(range.in_dead_zone(1.6));
        assert!(!range.in_dead_zone(1.61));
        assert!(!range.in_dead_zone(1.4));
    }

    #[test]
    fn broken_ranges_are_rejected() {
        let steering = SteeringRange {
            min_ms: 2.0,
            center_ms: 1.8,
            max_ms: 2.05,
        };
        assert!(steering.validate().is_err());

        let throttle = ThrottleRange {
            reverse_max_ms: 1.5,
            ..ThrottleRange::PIRACER
        };
        assert!(throttle.validate().is_err());

        let throttle = ThrottleRange {
            forward_min_ms: 1.45,
            ..ThrottleRange::PIRACER
        };
        assert!(throttle.validate().is_err());
    }

    #[test]
    fn commands_clamp() {
        assert_eq!(clamp_command(1.5), 1.0);
        assert_eq!(clamp_command(-3.0), -1.0);
        assert_eq!(clamp_command(0.25), 0.25);
        assert_eq!(clamp_command(f32::NAN), 0.0);
    }

    #[test]
    fn tuner_steps_and_finishes() {
        let mut tuner = CenterTuner::new(1.5);
        tuner.apply(Adjust::Increase);
        tuner.apply(Adjust::Increase);
        tuner.apply(Adjust::Decrease);
        assert!(close(tuner.current_ms(), 1.51));

        match tuner.apply(Adjust::Accept) {
            Tuning::Centered(ms) => assert!(close(ms, 1.51)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tuner.apply(Adjust::Quit), Tuning::Abandoned);
    }

    #[test]
    fn tuner_probe_sequence() {
        let tuner = CenterTuner::new(1.8);
        let [left, center, right, back] = tuner.probe_sequence();
        assert!(close(left, 1.5));
        assert!(close(center, 1.8));
        assert!(close(right, 2.1));
        assert!(close(back, 1.8));
    }

    #[test]
    fn adjust_parsing() {
        assert_eq!(Adjust::parse("+\n"), Some(Adjust::Increase));
        assert_eq!(Adjust::parse(" - "), Some(Adjust::Decrease));
        assert_eq!(Adjust::parse("C"), Some(Adjust::Accept));
        assert_eq!(Adjust::parse("q"), Some(Adjust::Quit));
        assert_eq!(Adjust::parse("x"), None);
    }
}
