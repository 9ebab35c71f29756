//! rc_control drives the actuators of a PiRacer-style RC car through a PCA9685.
//!
//! The steering servo and the ESC each sit on one PWM channel. [`DriveController`] owns the
//! chip, maps normalized commands onto the calibrated pulse ranges in [`calibration`], and puts
//! the motor back to neutral when it is cleaned up or dropped:
//!
//! ``` no-test
//! let mut car = DriveController::new(i2c, DriveConfig::default(), &mut delay)?;
//! car.set_throttle(0.2)?;
//! car.set_steering(-0.5)?;
//! car.stop()?;
//! ```

pub mod calibration;
pub mod drive;
pub mod traits;
pub use drive::DriveController;
pub use traits::Esc;
pub use traits::Servo;
