// Hardware handles.
//
// Every component takes these as injected handles owned by the runtime; no
// process-wide device state. The blocking maneuver helpers on `Drivetrain`
// poll the wheel encoders until a bound is crossed, and ownership of the
// drivetrain is exclusive while one runs.

pub mod colorhead;
pub mod console;
#[cfg(test)]
pub mod mock;

use thiserror::Error;

use crate::color::Rgb;
use crate::motor::BusError;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("servo bus: {0}")]
    Bus(#[from] BusError),

    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} out of range")]
    OutOfRange(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// How a motor comes to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Cut power, roll out freely
    Coast,
    /// Drive the speed target to zero
    Brake,
    /// Brake and latch the position
    Hold,
}

/// Differential drivetrain: independent left/right power commands plus the
/// encoder reads the blocking maneuvers poll.
pub trait Drivetrain {
    /// Run both wheels at the given power percentages until told otherwise.
    fn drive(&mut self, left_power: f32, right_power: f32) -> Result<(), HwError>;

    fn stop(&mut self, policy: StopPolicy) -> Result<(), HwError>;

    /// Cumulative wheel angle in degrees.
    fn wheel_angle(&mut self, side: Side) -> Result<f32, HwError>;

    /// Instantaneous wheel speed in deg/s.
    fn wheel_speed(&mut self, side: Side) -> Result<f32, HwError>;

    /// Drive until either wheel has moved `degrees` from its start, then
    /// stop with `policy`. Blocks for the whole maneuver.
    fn drive_for_degrees(
        &mut self,
        left_power: f32,
        right_power: f32,
        degrees: f32,
        policy: StopPolicy,
    ) -> Result<(), HwError> {
        let left_start = self.wheel_angle(Side::Left)?;
        let right_start = self.wheel_angle(Side::Right)?;
        self.drive(left_power, right_power)?;
        loop {
            let left_delta = (self.wheel_angle(Side::Left)? - left_start).abs();
            let right_delta = (self.wheel_angle(Side::Right)? - right_start).abs();
            if left_delta > degrees || right_delta > degrees {
                break;
            }
        }
        self.stop(policy)
    }

    fn drive_for_rotations(
        &mut self,
        left_power: f32,
        right_power: f32,
        rotations: f32,
        policy: StopPolicy,
    ) -> Result<(), HwError> {
        self.drive_for_degrees(left_power, right_power, rotations * 360.0, policy)
    }

    /// Two-axis steering: speed plus a -100..=100 steering percentage that
    /// scales the inner wheel down through zero and into reverse.
    fn steer(&mut self, speed: f32, steering: f32) -> Result<(), HwError> {
        if !(-100.0..=100.0).contains(&steering) {
            return Err(HwError::OutOfRange("steering"));
        }
        if steering < 0.0 {
            self.drive((speed / 50.0) * steering + speed, speed)
        } else {
            self.drive(speed, -(speed / 50.0) * steering + speed)
        }
    }
}

/// The two downward-facing color sensors.
pub trait ColorSensors {
    fn sample(&mut self, side: Side) -> Result<Rgb, HwError>;
}

/// One arm servo: the lift arm or the bucket.
pub trait ArmMotor {
    fn run(&mut self, power: f32) -> Result<(), HwError>;

    /// Run at `power` until the servo has moved `degrees`, then stop with
    /// `policy`. Blocks for the whole move.
    fn run_angle(&mut self, power: f32, degrees: f32, policy: StopPolicy) -> Result<(), HwError>;

    /// Instantaneous speed in deg/s, for stall detection.
    fn speed(&mut self) -> Result<f32, HwError>;

    fn stop(&mut self, policy: StopPolicy) -> Result<(), HwError>;
}

/// Run start/stop gate.
pub trait Buttons {
    fn any_pressed(&mut self) -> Result<bool, HwError>;
}

/// Audible operator feedback. Tones are best-effort and never fail the run.
pub trait Annunciator {
    fn ready_tone(&mut self);
    fn fault_tone(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::mock::ScriptedDrive;

    #[test]
    fn drive_for_degrees_stops_when_either_wheel_passes_the_bound() {
        let mut drive = ScriptedDrive::new(10.0);
        drive.drive_for_degrees(30.0, 30.0, 45.0, StopPolicy::Brake).unwrap();
        let final_left = drive.wheel_angle(Side::Left).unwrap();
        assert!(final_left > 45.0);
        assert!(final_left < 90.0);
        assert_eq!(drive.stops, vec![StopPolicy::Brake]);
    }

    #[test]
    fn steer_rejects_out_of_range_input() {
        let mut drive = ScriptedDrive::new(10.0);
        assert!(drive.steer(30.0, 120.0).is_err());
        drive.steer(30.0, 50.0).unwrap();
        // steering right: left wheel full speed, right wheel at zero
        assert_eq!(drive.commands.last(), Some(&(30.0, 0.0)));
    }
}
