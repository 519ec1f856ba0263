// Serial color sensor head.
//
// Both downward-facing sensors hang off one small sensor board: one request
// byte selects the side, the reply is the three raw channel bytes.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::trace;

use crate::color::Rgb;
use crate::hw::{ColorSensors, HwError, Side};

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const REQUEST_LEFT: u8 = 0x01;
const REQUEST_RIGHT: u8 = 0x02;

pub struct ColorHead {
    port: Box<dyn SerialPort>,
}

impl ColorHead {
    pub fn open(path: &str, baudrate: u32) -> Result<Self, HwError> {
        let port = serialport::new(path, baudrate)
            .timeout(READ_TIMEOUT)
            .open()?;
        port.clear(ClearBuffer::Input)?;
        Ok(Self { port })
    }
}

impl ColorSensors for ColorHead {
    fn sample(&mut self, side: Side) -> Result<Rgb, HwError> {
        let request = match side {
            Side::Left => REQUEST_LEFT,
            Side::Right => REQUEST_RIGHT,
        };
        self.port.write_all(&[request])?;
        self.port.flush()?;

        let mut raw = [0u8; 3];
        self.port.read_exact(&mut raw)?;
        trace!(?side, ?raw, "color sample");
        Ok(Rgb::new(
            f32::from(raw[0]),
            f32::from(raw[1]),
            f32::from(raw[2]),
        ))
    }
}
