// Incline base-speed adaptation.
//
// The co-processor reports the slope ahead; the adapter overrides the base
// speed while climbing or descending. Transitions happen only on a flag
// change: a flag that keeps reporting the same slope does not re-trigger,
// and the override is released only by an explicit "level" report.

use tracing::info;

use crate::config;
use crate::link::InclineFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclineState {
    Normal,
    Ascending,
    Descending,
}

#[derive(Debug)]
pub struct InclineAdapter {
    state: InclineState,
    base_speed: f32,
}

impl InclineAdapter {
    pub fn new() -> Self {
        Self {
            state: InclineState::Normal,
            base_speed: config::BASE_SPEED,
        }
    }

    pub fn state(&self) -> InclineState {
        self.state
    }

    /// Feed one report's incline flag; returns the base speed to use.
    pub fn update(&mut self, flag: InclineFlag) -> f32 {
        match self.state {
            InclineState::Normal => match flag {
                InclineFlag::Up => {
                    info!("incline ahead, climbing speed");
                    self.base_speed = config::CLIMB_SPEED;
                    self.state = InclineState::Ascending;
                }
                InclineFlag::Down => {
                    info!("descent ahead, braking speed");
                    self.base_speed = config::DESCENT_SPEED;
                    self.state = InclineState::Descending;
                }
                InclineFlag::None => {}
            },
            _ => {
                if flag == InclineFlag::None {
                    info!("slope cleared, normal speed");
                    self.base_speed = config::BASE_SPEED;
                    self.state = InclineState::Normal;
                }
            }
        }
        self.base_speed
    }
}

impl Default for InclineAdapter {
    fn default() -> Self {
        Self::new()
    }
}
