// Servo bus actuators.
//
// Provides:
// - STS-series bus servo protocol over half-duplex serial
// - Differential drivetrain driver (power percent commands, encoder reads)
// - Arm servo driver for the lift and bucket
// - Unit conversions and multi-turn position unwrapping

mod arm;
pub mod bus;
mod drivetrain;
pub mod units;

pub use arm::ArmServo;
pub use bus::{BusError, Reg, ServoBus};
pub use drivetrain::DifferentialDrive;
