// Scripted hardware handles for tests.
//
// The drivetrain integrates a fixed angle step per encoder query while a
// command is active, so blocking maneuvers terminate deterministically.
// Sensors and arms replay scripted values and record every call.

use std::collections::VecDeque;

use crate::color::Rgb;
use crate::hw::{
    Annunciator, ArmMotor, Buttons, ColorSensors, Drivetrain, HwError, Side, StopPolicy,
};

pub const WHITE: Rgb = Rgb::new(80.0, 70.0, 60.0);
pub const BLACK_LINE: Rgb = Rgb::new(10.0, 10.0, 8.0);
pub const GREEN: Rgb = Rgb::new(30.0, 80.0, 93.0);

pub struct ScriptedDrive {
    step: f32,
    current: (f32, f32),
    left_angle: f32,
    right_angle: f32,
    pub commands: Vec<(f32, f32)>,
    pub stops: Vec<StopPolicy>,
}

impl ScriptedDrive {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            current: (0.0, 0.0),
            left_angle: 0.0,
            right_angle: 0.0,
            commands: Vec::new(),
            stops: Vec::new(),
        }
    }

    /// True if any command drove the wheels in opposite directions.
    pub fn pivoted(&self) -> bool {
        self.commands.iter().any(|&(l, r)| l * r < 0.0)
    }
}

impl Drivetrain for ScriptedDrive {
    fn drive(&mut self, left_power: f32, right_power: f32) -> Result<(), HwError> {
        self.current = (left_power, right_power);
        self.commands.push((left_power, right_power));
        Ok(())
    }

    fn stop(&mut self, policy: StopPolicy) -> Result<(), HwError> {
        self.current = (0.0, 0.0);
        self.stops.push(policy);
        Ok(())
    }

    fn wheel_angle(&mut self, side: Side) -> Result<f32, HwError> {
        // signum(0.0) is 1.0, so gate on an active command explicitly
        match side {
            Side::Left => {
                if self.current.0 != 0.0 {
                    self.left_angle += self.step * self.current.0.signum();
                }
                Ok(self.left_angle)
            }
            Side::Right => {
                if self.current.1 != 0.0 {
                    self.right_angle += self.step * self.current.1.signum();
                }
                Ok(self.right_angle)
            }
        }
    }

    fn wheel_speed(&mut self, side: Side) -> Result<f32, HwError> {
        let power = match side {
            Side::Left => self.current.0,
            Side::Right => self.current.1,
        };
        Ok(power * 9.5)
    }
}

pub struct ScriptedColors {
    left: VecDeque<Rgb>,
    right: VecDeque<Rgb>,
    left_rest: Rgb,
    right_rest: Rgb,
}

impl ScriptedColors {
    /// Both sensors read `rest` once their scripts run out.
    pub fn resting_on(rest: Rgb) -> Self {
        Self {
            left: VecDeque::new(),
            right: VecDeque::new(),
            left_rest: rest,
            right_rest: rest,
        }
    }

    pub fn enqueue(&mut self, side: Side, sample: Rgb, times: usize) {
        let queue = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        for _ in 0..times {
            queue.push_back(sample);
        }
    }

    pub fn settle(&mut self, side: Side, rest: Rgb) {
        match side {
            Side::Left => self.left_rest = rest,
            Side::Right => self.right_rest = rest,
        }
    }
}

impl ColorSensors for ScriptedColors {
    fn sample(&mut self, side: Side) -> Result<Rgb, HwError> {
        Ok(match side {
            Side::Left => self.left.pop_front().unwrap_or(self.left_rest),
            Side::Right => self.right.pop_front().unwrap_or(self.right_rest),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArmCall {
    Run(f32),
    RunAngle(f32, f32, StopPolicy),
    Stop(StopPolicy),
}

pub struct ScriptedArm {
    speeds: VecDeque<f32>,
    pub calls: Vec<ArmCall>,
}

impl ScriptedArm {
    pub fn new() -> Self {
        Self {
            speeds: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    /// Speed readings returned in order; 0.0 once exhausted.
    pub fn with_speeds(speeds: &[f32]) -> Self {
        Self {
            speeds: speeds.iter().copied().collect(),
            calls: Vec::new(),
        }
    }
}

impl ArmMotor for ScriptedArm {
    fn run(&mut self, power: f32) -> Result<(), HwError> {
        self.calls.push(ArmCall::Run(power));
        Ok(())
    }

    fn run_angle(&mut self, power: f32, degrees: f32, policy: StopPolicy) -> Result<(), HwError> {
        self.calls.push(ArmCall::RunAngle(power, degrees, policy));
        Ok(())
    }

    fn speed(&mut self) -> Result<f32, HwError> {
        Ok(self.speeds.pop_front().unwrap_or(0.0))
    }

    fn stop(&mut self, policy: StopPolicy) -> Result<(), HwError> {
        self.calls.push(ArmCall::Stop(policy));
        Ok(())
    }
}

/// Replays a press/release script; repeats the last value when exhausted.
pub struct ScriptedButtons {
    polls: VecDeque<bool>,
    rest: bool,
}

impl ScriptedButtons {
    pub fn with_polls(polls: &[bool]) -> Self {
        Self {
            polls: polls.iter().copied().collect(),
            rest: *polls.last().unwrap_or(&false),
        }
    }
}

impl Buttons for ScriptedButtons {
    fn any_pressed(&mut self) -> Result<bool, HwError> {
        Ok(self.polls.pop_front().unwrap_or(self.rest))
    }
}

#[derive(Default)]
pub struct CountingAlarm {
    pub ready_tones: u32,
    pub fault_tones: u32,
}

impl Annunciator for CountingAlarm {
    fn ready_tone(&mut self) {
        self.ready_tones += 1;
    }

    fn fault_tone(&mut self) {
        self.fault_tones += 1;
    }
}
