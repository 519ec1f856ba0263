// Differential drivetrain over the servo bus.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use super::bus::{DriveMode, Reg, ServoBus};
use super::units::{degps_to_raw, power_to_degps, raw_to_degps, PositionTracker};
use crate::hw::{Drivetrain, HwError, Side, StopPolicy};

// The right servo is mounted mirrored.
const LEFT_SIGN: f32 = 1.0;
const RIGHT_SIGN: f32 = -1.0;

struct Wheel {
    id: u8,
    sign: f32,
    tracker: PositionTracker,
}

/// Two-wheel drivetrain; both servos run in continuous speed mode.
pub struct DifferentialDrive {
    bus: Rc<RefCell<ServoBus>>,
    left: Wheel,
    right: Wheel,
    torque_on: bool,
}

impl DifferentialDrive {
    /// Checks both servos respond, then configures speed mode with torque
    /// applied.
    pub fn new(bus: Rc<RefCell<ServoBus>>, left_id: u8, right_id: u8) -> Result<Self, HwError> {
        info!(left_id, right_id, "initializing drivetrain");
        {
            let mut bus = bus.borrow_mut();
            for id in [left_id, right_id] {
                if !bus.ping(id)? {
                    return Err(HwError::Bus(super::bus::BusError::NoReply { id }));
                }
                bus.torque(id, false)?;
                bus.set_mode(id, DriveMode::Speed)?;
                bus.torque(id, true)?;
            }
        }
        Ok(Self {
            bus,
            left: Wheel {
                id: left_id,
                sign: LEFT_SIGN,
                tracker: PositionTracker::new(),
            },
            right: Wheel {
                id: right_id,
                sign: RIGHT_SIGN,
                tracker: PositionTracker::new(),
            },
            torque_on: true,
        })
    }

    fn wheel_mut(&mut self, side: Side) -> &mut Wheel {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn ensure_torque(&mut self) -> Result<(), HwError> {
        if !self.torque_on {
            let mut bus = self.bus.borrow_mut();
            bus.torque(self.left.id, true)?;
            bus.torque(self.right.id, true)?;
            self.torque_on = true;
        }
        Ok(())
    }
}

impl Drivetrain for DifferentialDrive {
    fn drive(&mut self, left_power: f32, right_power: f32) -> Result<(), HwError> {
        self.ensure_torque()?;
        let left_raw = degps_to_raw(power_to_degps(left_power) * self.left.sign);
        let right_raw = degps_to_raw(power_to_degps(right_power) * self.right.sign);
        debug!(left_raw, right_raw, "drive");
        self.bus
            .borrow_mut()
            .sync_write_i16(Reg::GoalSpeed, &[(self.left.id, left_raw), (self.right.id, right_raw)])?;
        Ok(())
    }

    fn stop(&mut self, policy: StopPolicy) -> Result<(), HwError> {
        match policy {
            StopPolicy::Coast => {
                let mut bus = self.bus.borrow_mut();
                bus.torque(self.left.id, false)?;
                bus.torque(self.right.id, false)?;
                self.torque_on = false;
            }
            StopPolicy::Brake | StopPolicy::Hold => {
                self.ensure_torque()?;
                let mut bus = self.bus.borrow_mut();
                bus.sync_write_i16(Reg::GoalSpeed, &[(self.left.id, 0), (self.right.id, 0)])?;
                if policy == StopPolicy::Hold {
                    bus.lock(self.left.id, true)?;
                    bus.lock(self.right.id, true)?;
                }
            }
        }
        Ok(())
    }

    fn wheel_angle(&mut self, side: Side) -> Result<f32, HwError> {
        let bus = Rc::clone(&self.bus);
        let wheel = self.wheel_mut(side);
        let raw = bus.borrow_mut().position(wheel.id)?;
        Ok(wheel.tracker.update(raw) * wheel.sign)
    }

    fn wheel_speed(&mut self, side: Side) -> Result<f32, HwError> {
        let wheel = match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        let raw = self.bus.borrow_mut().speed(wheel.id)?;
        Ok(raw_to_degps(raw) * wheel.sign)
    }
}

impl Drop for DifferentialDrive {
    fn drop(&mut self) {
        if let Err(e) = self.stop(StopPolicy::Brake) {
            tracing::warn!("failed to stop drivetrain on drop: {e}");
        }
    }
}
