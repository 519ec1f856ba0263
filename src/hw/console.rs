// Operator-facing console handles: keyboard as the start/stop button,
// terminal bell as the annunciator.

use std::io::Write;
use std::time::Duration;

use crossterm::event::{self, Event};
use tracing::warn;

use crate::hw::{Annunciator, Buttons, HwError};

/// Any pending key event counts as "a button is pressed"; the event is
/// consumed by the poll.
pub struct KeyButtons;

impl Buttons for KeyButtons {
    fn any_pressed(&mut self) -> Result<bool, HwError> {
        if event::poll(Duration::ZERO)? {
            if let Ok(Event::Key(_)) = event::read() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub struct ConsoleAnnunciator;

impl ConsoleAnnunciator {
    fn bell(times: usize) {
        let mut out = std::io::stdout();
        for _ in 0..times {
            let _ = out.write_all(b"\x07");
        }
        let _ = out.flush();
    }
}

impl Annunciator for ConsoleAnnunciator {
    fn ready_tone(&mut self) {
        Self::bell(1);
    }

    fn fault_tone(&mut self) {
        warn!("co-processor fault");
        Self::bell(2);
    }
}
