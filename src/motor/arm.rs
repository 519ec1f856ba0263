// Arm servos: the lift arm and the bucket share the drivetrain's bus.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use super::bus::{BusError, DriveMode, ServoBus};
use super::units::{degps_to_raw, power_to_degps, raw_to_degps, PositionTracker};
use crate::hw::{ArmMotor, HwError, StopPolicy};

pub struct ArmServo {
    bus: Rc<RefCell<ServoBus>>,
    id: u8,
    tracker: PositionTracker,
    torque_on: bool,
}

impl ArmServo {
    pub fn new(bus: Rc<RefCell<ServoBus>>, id: u8) -> Result<Self, HwError> {
        info!(id, "initializing arm servo");
        {
            let mut bus = bus.borrow_mut();
            if !bus.ping(id)? {
                return Err(HwError::Bus(BusError::NoReply { id }));
            }
            bus.torque(id, false)?;
            bus.set_mode(id, DriveMode::Speed)?;
            bus.torque(id, true)?;
        }
        Ok(Self {
            bus,
            id,
            tracker: PositionTracker::new(),
            torque_on: true,
        })
    }

    fn angle(&mut self) -> Result<f32, HwError> {
        let raw = self.bus.borrow_mut().position(self.id)?;
        Ok(self.tracker.update(raw))
    }

    fn ensure_torque(&mut self) -> Result<(), HwError> {
        if !self.torque_on {
            self.bus.borrow_mut().torque(self.id, true)?;
            self.torque_on = true;
        }
        Ok(())
    }
}

impl ArmMotor for ArmServo {
    fn run(&mut self, power: f32) -> Result<(), HwError> {
        self.ensure_torque()?;
        let raw = degps_to_raw(power_to_degps(power));
        debug!(id = self.id, raw, "arm run");
        self.bus.borrow_mut().set_speed(self.id, raw)?;
        Ok(())
    }

    fn run_angle(&mut self, power: f32, degrees: f32, policy: StopPolicy) -> Result<(), HwError> {
        let start = self.angle()?;
        self.run(power)?;
        while (self.angle()? - start).abs() <= degrees {}
        self.stop(policy)
    }

    fn speed(&mut self) -> Result<f32, HwError> {
        let raw = self.bus.borrow_mut().speed(self.id)?;
        Ok(raw_to_degps(raw))
    }

    fn stop(&mut self, policy: StopPolicy) -> Result<(), HwError> {
        match policy {
            StopPolicy::Coast => {
                self.bus.borrow_mut().torque(self.id, false)?;
                self.torque_on = false;
            }
            StopPolicy::Brake | StopPolicy::Hold => {
                self.ensure_torque()?;
                let mut bus = self.bus.borrow_mut();
                bus.set_speed(self.id, 0)?;
                if policy == StopPolicy::Hold {
                    bus.lock(self.id, true)?;
                }
            }
        }
        Ok(())
    }
}
