//! Abstractions for RC car actuators.

/// A steering servo.
pub trait Servo {
    type Error;

    /// Moves the servo to a position in \[-1,1\]. Negative is left, positive is right.
    ///
    /// Out of range positions are clamped.
    fn set_position(&mut self, position: f32) -> Result<(), Self::Error>;

    /// Points the wheels straight ahead.
    fn center(&mut self) -> Result<(), Self::Error> {
        self.set_position(0.0)
    }
}

/// An Electronic Speed Controller.
pub trait Esc {
    type Error;

    /// Stops the motors.
    fn set_neutral(&mut self) -> Result<(), Self::Error>;

    /// Sets the motors to a percentage of forward power, in a range of \[0,1\].
    fn set_forward(&mut self, percent_power: f32) -> Result<(), Self::Error>;

    /// Sets the motors to a percentage of backwards power, in a range of \[0,1\].
    fn set_reverse(&mut self, percent_power: f32) -> Result<(), Self::Error>;
}
