// Differential steering PID.
//
// Error is the left/right reflectivity difference; the correction is added
// to one wheel's power and subtracted from the other. The integral term is
// the raw two-sample sum and the derivative is unfiltered; both are part
// of the course calibration.

use crate::config;

/// Steering controller state, reset at the start of each run.
#[derive(Debug, Clone)]
pub struct SteeringPid {
    kp: f32,
    ki: f32,
    kd: f32,
    last_error: f32,
    base_speed: f32,
}

impl SteeringPid {
    pub fn new() -> Self {
        Self {
            kp: config::KP,
            ki: config::KI,
            kd: config::KD,
            last_error: 0.0,
            base_speed: config::BASE_SPEED,
        }
    }

    /// One control step. Returns the differential correction in power
    /// percent; callers drive `base_speed + u` / `base_speed - u`.
    pub fn correction(&mut self, left_reflectivity: f32, right_reflectivity: f32) -> f32 {
        let error = left_reflectivity - right_reflectivity;
        let u = self.kp * error
            + self.ki * (error + self.last_error)
            + self.kd * (error - self.last_error);
        self.last_error = error;
        u
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn set_base_speed(&mut self, speed: f32) {
        self.base_speed = speed;
    }
}

impl Default for SteeringPid {
    fn default() -> Self {
        Self::new()
    }
}
