// Course-calibrated constants and deployment configuration.
//
// The control constants are competition-course calibration; changing them
// changes where the robot commits to a turn. Deployment details (ports,
// servo IDs) live in `RunConfig` and can be overridden per robot.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

// Line following
pub const BASE_SPEED: f32 = 30.0;
pub const KP: f32 = 2.2;
pub const KI: f32 = 0.1;
pub const KD: f32 = 0.8;

// Reflectivity bands (second raw channel, 0-100)
pub const BLACK_REFLECT_MAX: f32 = 15.0;
pub const LINE_EDGE_REFLECT_MAX: f32 = 35.0;

// Green marker HSV bands (hue 0-360, saturation 0-100, value 0-255)
pub const MARKER_HUE_MIN: f32 = 120.0;
pub const MARKER_HUE_MAX: f32 = 160.0;
pub const MARKER_SAT_MIN: f32 = 60.0;
pub const MARKER_VAL_MIN: f32 = 20.0;

// Intersection maneuvers, in wheel degrees
pub const TURN_POWER: f32 = 30.0;
pub const VERIFY_WINDOW_DEG: f32 = 50.0;
pub const CENTER_ADVANCE_DEG: f32 = 180.0;
pub const PIVOT_LEFT_DEG: f32 = 160.0;
pub const PIVOT_RIGHT_DEG: f32 = 180.0;
pub const REALIGN_DEG: f32 = 110.0;
pub const CLEAR_NUDGE_DEG: f32 = 50.0;
pub const U_TURN_CREEP_DEG: f32 = 160.0;
pub const U_TURN_PIVOT_DEG: f32 = 540.0;

// Incline base-speed overrides
pub const CLIMB_SPEED: f32 = 80.0;
pub const DESCENT_SPEED: f32 = 20.0;

// Recovery choreography
pub const RECOVERY_TARGET: u8 = 2;
pub const RESCUE_BACKUP_DEG: f32 = 350.0;
pub const ARM_POWER: f32 = 40.0;
pub const ARM_LIFT_DEG: f32 = 250.0;
pub const BUCKET_KICK_DEG: f32 = 50.0;
pub const BUCKET_RELEASE_DEG: f32 = 30.0;
pub const BUCKET_RESET_DEG: f32 = 200.0;
pub const BUCKET_STALL_DEGPS: f32 = 5.0;

// Co-processor link
pub const LINK_RESPONSE_LEN: usize = 4;
pub const LINK_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const LINK_FAULT_THRESHOLD: u32 = 10;

// Inter-tick delay, shortened when the last link exchange needed retries
pub const TICK_DELAY_CLEAN: Duration = Duration::from_millis(15);
pub const TICK_DELAY_DEGRADED: Duration = Duration::from_millis(5);

// Power percentage to wheel angular rate
pub const POWER_FULL_SCALE_DEGPS: f32 = 950.0;

/// Per-robot deployment settings, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Serial port of the servo bus (drivetrain and arm servos)
    pub servo_port: String,
    /// Serial port of the forward-sensing co-processor
    pub coproc_port: String,
    pub coproc_baud: u32,
    /// Serial port of the color sensor head
    pub sensor_port: String,
    pub sensor_baud: u32,
    pub left_wheel_id: u8,
    pub right_wheel_id: u8,
    pub lift_id: u8,
    pub bucket_id: u8,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            servo_port: "/dev/ttyACM0".to_string(),
            coproc_port: "/dev/ttyUSB0".to_string(),
            coproc_baud: 115_200,
            sensor_port: "/dev/ttyUSB1".to_string(),
            sensor_baud: 115_200,
            left_wheel_id: 1,
            right_wheel_id: 2,
            lift_id: 3,
            bucket_id: 4,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(std::io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = RunConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.servo_port, cfg.servo_port);
        assert_eq!(back.bucket_id, cfg.bucket_id);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let back: RunConfig = serde_json::from_str(r#"{"coproc_port":"/dev/ttyAMA1"}"#).unwrap();
        assert_eq!(back.coproc_port, "/dev/ttyAMA1");
        assert_eq!(back.left_wheel_id, RunConfig::default().left_wheel_id);
    }
}
