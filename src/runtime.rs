// Run-gated control loop.
//
// One logical thread: every tick blocks on the sensor reads, a full
// co-processor exchange, and any maneuver the navigator or rescue sequence
// decides to run. Controller state is rebuilt at each run boundary, and the
// stop button is only honored between ticks, never mid-maneuver.

use std::thread;

use thiserror::Error;
use tracing::{debug, info};

use crate::color::{classify, ColorEvent, ColorTag};
use crate::config;
use crate::hw::{Annunciator, ArmMotor, Buttons, ColorSensors, Drivetrain, HwError, Side, StopPolicy};
use crate::incline::InclineAdapter;
use crate::link::{Channel, CoProcessorLink, CornerFlag, LinkError, ReportMode};
use crate::navigator::Navigator;
use crate::pid::SteeringPid;
use crate::rescue;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Hw(#[from] HwError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// The robot: every hardware handle, owned in one place and lent to
/// whichever component is currently in control.
pub struct Robot<D, S, A, B, N, C>
where
    D: Drivetrain,
    S: ColorSensors,
    A: ArmMotor,
    B: Buttons,
    N: Annunciator,
    C: Channel,
{
    pub drive: D,
    pub sensors: S,
    pub lift: A,
    pub bucket: A,
    pub buttons: B,
    pub alarm: N,
    pub link: CoProcessorLink<C>,
}

impl<D, S, A, B, N, C> Robot<D, S, A, B, N, C>
where
    D: Drivetrain,
    S: ColorSensors,
    A: ArmMotor,
    B: Buttons,
    N: Annunciator,
    C: Channel,
{
    /// Run forever, one button-gated run after another.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            self.run_once()?;
        }
    }

    /// A single run: arm, wait for the start press, follow the line until
    /// the next press.
    pub fn run_once(&mut self) -> Result<(), RuntimeError> {
        let mut pid = SteeringPid::new();
        let mut incline = InclineAdapter::new();
        let mut nav = Navigator::new();

        info!("armed, waiting for start");
        self.alarm.ready_tone();
        while !self.buttons.any_pressed()? {}
        while self.buttons.any_pressed()? {}
        info!("run started");

        while !self.buttons.any_pressed()? {
            self.tick(&mut pid, &mut incline, &mut nav)?;
        }

        self.drive.stop(StopPolicy::Brake)?;
        info!("run stopped");
        while self.buttons.any_pressed()? {}
        Ok(())
    }

    fn tick(
        &mut self,
        pid: &mut SteeringPid,
        incline: &mut InclineAdapter,
        nav: &mut Navigator,
    ) -> Result<(), RuntimeError> {
        let left = self.sensors.sample(Side::Left)?;
        let right = self.sensors.sample(Side::Right)?;

        let u = pid.correction(left.reflectivity(), right.reflectivity());
        self.drive
            .drive(pid.base_speed() + u, pid.base_speed() - u)?;

        for event in [
            ColorEvent { tag: classify(left), side: Side::Left },
            ColorEvent { tag: classify(right), side: Side::Right },
        ] {
            if event.tag == ColorTag::GreenMarker {
                debug!(side = ?event.side, "marker under sensor");
                nav.on_marker(event.side, &mut self.drive, &mut self.sensors)?;
            }
        }

        let report =
            self.link
                .exchange(ReportMode::LineFollow, &mut self.drive, &mut self.alarm)?;

        if report.corner != CornerFlag::None {
            nav.on_crossing(
                report.corner,
                &mut self.drive,
                &mut self.sensors,
                &mut self.link,
                &mut self.alarm,
            )?;
        }

        if report.recovery == config::RECOVERY_TARGET {
            rescue::run_recovery(&mut self.drive, &mut self.lift, &mut self.bucket)?;
            // skip pacing; the next tick re-reads everything fresh
            return Ok(());
        }

        pid.set_base_speed(incline.update(report.incline));

        match self.link.last_poll_failures() {
            0 => thread::sleep(config::TICK_DELAY_CLEAN),
            1 => thread::sleep(config::TICK_DELAY_DEGRADED),
            _ => {}
        }
        Ok(())
    }
}
