// Intersection and marker maneuvers.
//
// A marker or forward-crossing report interrupts line following. Before
// committing to a turn the navigator rolls forward a short verification
// window watching the opposite side: a marker on both sides means "turn
// around", a black branch on both sides means an unmarked crossing to drive
// straight through. While a maneuver runs the navigator owns the
// drivetrain; the steering loop resumes only after it returns.

use tracing::{debug, info};

use crate::color::{classify, ColorTag};
use crate::config;
use crate::hw::{Annunciator, ColorSensors, Drivetrain, HwError, Side, StopPolicy};
use crate::link::{Channel, CoProcessorLink, CornerFlag, LinkError, ReportMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Following,
    VerifyingOpposite,
    Turning,
    UTurning,
    PassThrough,
}

/// How a triggered maneuver resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Committed and completed the turn
    Completed,
    /// The opposite side triggered too; turned around instead
    ConflictDetected,
    /// Unmarked crossing, drove straight through
    PassThrough,
}

#[derive(Debug)]
pub struct Navigator {
    state: NavState,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            state: NavState::Following,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// A green marker appeared under `side`. Verify the opposite sensor
    /// over a short roll-forward window, then turn or turn around.
    pub fn on_marker<D, S>(
        &mut self,
        side: Side,
        drive: &mut D,
        sensors: &mut S,
    ) -> Result<NavigationOutcome, HwError>
    where
        D: Drivetrain,
        S: ColorSensors,
    {
        info!(?side, "green marker, checking the opposite side");
        self.state = NavState::VerifyingOpposite;

        let watch = side.opposite();
        let start = drive.wheel_angle(watch)?;
        let mut opposite_marker = false;
        drive.drive(config::TURN_POWER, config::TURN_POWER)?;
        while (drive.wheel_angle(watch)? - start).abs() <= config::VERIFY_WINDOW_DEG {
            if classify(sensors.sample(watch)?) == ColorTag::GreenMarker {
                opposite_marker = true;
            }
        }
        drive.stop(StopPolicy::Brake)?;

        let outcome = if opposite_marker {
            self.u_turn(drive)?;
            NavigationOutcome::ConflictDetected
        } else {
            self.turn(side, drive, sensors, StopPolicy::Brake)?;
            NavigationOutcome::Completed
        };
        self.state = NavState::Following;
        Ok(outcome)
    }

    /// The co-processor reported a black branch ahead. Same verification
    /// shape as markers, but gated on repeated link reports; a branch on
    /// both sides is an unmarked crossing to ignore.
    pub fn on_crossing<D, S, C, A>(
        &mut self,
        corner: CornerFlag,
        drive: &mut D,
        sensors: &mut S,
        link: &mut CoProcessorLink<C>,
        alarm: &mut A,
    ) -> Result<NavigationOutcome, LinkError>
    where
        D: Drivetrain,
        S: ColorSensors,
        C: Channel,
        A: Annunciator,
    {
        let side = match corner {
            CornerFlag::None => return Ok(NavigationOutcome::Completed),
            CornerFlag::Both => {
                self.pass_through(drive)?;
                self.state = NavState::Following;
                return Ok(NavigationOutcome::PassThrough);
            }
            CornerFlag::Left => Side::Left,
            CornerFlag::Right => Side::Right,
        };

        info!(?side, "crossing reported, checking the opposite side");
        self.state = NavState::VerifyingOpposite;

        let left_start = drive.wheel_angle(Side::Left)?;
        let right_start = drive.wheel_angle(Side::Right)?;
        let mut opposite_branch = false;
        drive.drive(config::BASE_SPEED, config::BASE_SPEED)?;
        while (drive.wheel_angle(Side::Left)? - left_start).abs() <= config::VERIFY_WINDOW_DEG
            && (drive.wheel_angle(Side::Right)? - right_start).abs() <= config::VERIFY_WINDOW_DEG
        {
            let report = link.exchange(ReportMode::LineFollow, drive, alarm)?;
            if report.corner.covers(side.opposite()) {
                opposite_branch = true;
            }
        }

        let outcome = if opposite_branch {
            self.pass_through(drive)?;
            NavigationOutcome::PassThrough
        } else {
            // the original rig coasted out of left crossing turns only
            let nudge_stop = match side {
                Side::Left => StopPolicy::Coast,
                Side::Right => StopPolicy::Brake,
            };
            self.turn(side, drive, sensors, nudge_stop)
                .map_err(LinkError::Hw)?;
            NavigationOutcome::Completed
        };
        self.state = NavState::Following;
        Ok(outcome)
    }

    /// Multi-phase turn onto the branch line: advance to the intersection
    /// center, pivot off the line, spin until the turn-side sensor finds it
    /// again (open-ended), re-align, then nudge clear of the marker.
    fn turn<D, S>(
        &mut self,
        side: Side,
        drive: &mut D,
        sensors: &mut S,
        nudge_stop: StopPolicy,
    ) -> Result<(), HwError>
    where
        D: Drivetrain,
        S: ColorSensors,
    {
        self.state = NavState::Turning;
        info!(?side, "turning");

        let (inner, outer, pivot_deg) = match side {
            Side::Left => (-config::TURN_POWER, config::TURN_POWER, config::PIVOT_LEFT_DEG),
            Side::Right => (config::TURN_POWER, -config::TURN_POWER, config::PIVOT_RIGHT_DEG),
        };

        drive.drive_for_degrees(
            config::TURN_POWER,
            config::TURN_POWER,
            config::CENTER_ADVANCE_DEG,
            StopPolicy::Brake,
        )?;
        drive.drive_for_degrees(inner, outer, pivot_deg, StopPolicy::Coast)?;

        drive.drive(inner, outer)?;
        while sensors.sample(side)?.reflectivity() > config::BLACK_REFLECT_MAX {}
        debug!(?side, "line reacquired");

        drive.drive_for_degrees(inner, outer, config::REALIGN_DEG, StopPolicy::Brake)?;
        drive.drive_for_degrees(
            config::TURN_POWER,
            config::TURN_POWER,
            config::CLEAR_NUDGE_DEG,
            nudge_stop,
        )
    }

    /// Markers on both sides: creep to the tile center and pivot half a
    /// turn at fixed power.
    fn u_turn<D: Drivetrain>(&mut self, drive: &mut D) -> Result<(), HwError> {
        self.state = NavState::UTurning;
        info!("markers on both sides, turning around");
        drive.drive_for_degrees(
            config::TURN_POWER,
            config::TURN_POWER,
            config::U_TURN_CREEP_DEG,
            StopPolicy::Brake,
        )?;
        drive.drive_for_degrees(
            config::TURN_POWER,
            -config::TURN_POWER,
            config::U_TURN_PIVOT_DEG,
            StopPolicy::Brake,
        )
    }

    /// Unmarked crossing: hold course straight across.
    fn pass_through<D: Drivetrain>(&mut self, drive: &mut D) -> Result<(), HwError> {
        self.state = NavState::PassThrough;
        info!("unmarked crossing, passing through");
        drive.drive_for_degrees(
            config::TURN_POWER,
            config::TURN_POWER,
            config::CENTER_ADVANCE_DEG,
            StopPolicy::Coast,
        )
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}
