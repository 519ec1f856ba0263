// STS-series bus servo protocol.
//
// Dynamixel-1.0 family framing: [0xFF, 0xFF, id, len, instr, params..., sum]
// where sum is the inverted byte sum of everything after the header. Speeds
// are sign-magnitude 16-bit (bit 15 = reverse); positions are plain
// little-endian counts, 4096 per revolution.

use serialport::{ClearBuffer, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const HEADER: [u8; 2] = [0xFF, 0xFF];
const BROADCAST_ID: u8 = 0xFE;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Instr {
    Ping = 0x01,
    ReadReg = 0x02,
    WriteReg = 0x03,
    SyncWrite = 0x83,
}

/// RAM registers used by this robot.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Reg {
    /// 0 = position servo, 1 = continuous speed
    OperatingMode = 33,
    TorqueSwitch = 40,
    GoalSpeed = 46,
    Lock = 55,
    PresentPosition = 56,
    PresentSpeed = 58,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Position = 0,
    Speed = 1,
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("servo {id}: malformed reply ({reason})")]
    Malformed { id: u8, reason: String },

    #[error("servo {id}: reply checksum mismatch")]
    Checksum { id: u8 },

    #[error("servo {id}: hardware status 0x{status:02X}")]
    Status { id: u8, status: u8 },

    #[error("servo {id}: no reply")]
    NoReply { id: u8 },
}

/// Half-duplex serial bus shared by the drivetrain and arm servos.
pub struct ServoBus {
    port: Box<dyn SerialPort>,
}

impl ServoBus {
    pub fn open(path: &str) -> Result<Self, BusError> {
        Self::open_at(path, DEFAULT_BAUDRATE)
    }

    pub fn open_at(path: &str, baudrate: u32) -> Result<Self, BusError> {
        let port = serialport::new(path, baudrate)
            .timeout(READ_TIMEOUT)
            .open()?;
        // stale reply bytes from a previous run would desync framing
        port.clear(ClearBuffer::Input)?;
        Ok(Self { port })
    }

    fn checksum(body: &[u8]) -> u8 {
        let sum: u16 = body.iter().map(|&b| u16::from(b)).sum();
        !(sum as u8)
    }

    fn send_frame(&mut self, id: u8, instr: Instr, params: &[u8]) -> Result<(), BusError> {
        let mut frame = Vec::with_capacity(6 + params.len());
        frame.extend_from_slice(&HEADER);
        frame.push(id);
        frame.push(params.len() as u8 + 2);
        frame.push(instr as u8);
        frame.extend_from_slice(params);
        frame.push(Self::checksum(&frame[2..]));

        self.port.write_all(&frame)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one status frame from `id`, returning its parameter bytes.
    fn read_reply(&mut self, id: u8) -> Result<Vec<u8>, BusError> {
        let mut head = [0u8; 4];
        self.port.read_exact(&mut head).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                BusError::NoReply { id }
            } else {
                BusError::Io(e)
            }
        })?;

        if head[..2] != HEADER {
            return Err(BusError::Malformed {
                id,
                reason: format!("bad header {:02X?}", &head[..2]),
            });
        }
        if head[2] != id {
            return Err(BusError::Malformed {
                id,
                reason: format!("reply from servo {}", head[2]),
            });
        }

        // status byte + params + checksum
        if head[3] < 2 {
            return Err(BusError::Malformed {
                id,
                reason: format!("bad length {}", head[3]),
            });
        }
        let mut body = vec![0u8; head[3] as usize];
        self.port.read_exact(&mut body)?;

        let mut summed = vec![head[2], head[3]];
        summed.extend_from_slice(&body[..body.len() - 1]);
        if Self::checksum(&summed) != body[body.len() - 1] {
            return Err(BusError::Checksum { id });
        }

        let status = body[0];
        if status != 0 {
            return Err(BusError::Status { id, status });
        }
        Ok(body[1..body.len() - 1].to_vec())
    }

    pub fn ping(&mut self, id: u8) -> Result<bool, BusError> {
        self.send_frame(id, Instr::Ping, &[])?;
        match self.read_reply(id) {
            Ok(_) => Ok(true),
            Err(BusError::NoReply { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn write_reg(&mut self, id: u8, reg: Reg, data: &[u8]) -> Result<(), BusError> {
        let mut params = vec![reg as u8];
        params.extend_from_slice(data);
        debug!(id, reg = ?reg, ?data, "reg write");
        self.send_frame(id, Instr::WriteReg, &params)?;
        self.read_reply(id)?;
        Ok(())
    }

    fn read_reg(&mut self, id: u8, reg: Reg, len: u8) -> Result<Vec<u8>, BusError> {
        self.send_frame(id, Instr::ReadReg, &[reg as u8, len])?;
        let reply = self.read_reply(id)?;
        if reply.len() != len as usize {
            return Err(BusError::Malformed {
                id,
                reason: format!("expected {} bytes, got {}", len, reply.len()),
            });
        }
        Ok(reply)
    }

    pub fn write_u8(&mut self, id: u8, reg: Reg, value: u8) -> Result<(), BusError> {
        self.write_reg(id, reg, &[value])
    }

    pub fn read_u16(&mut self, id: u8, reg: Reg) -> Result<u16, BusError> {
        let reply = self.read_reg(id, reg, 2)?;
        Ok(u16::from_le_bytes([reply[0], reply[1]]))
    }

    /// Same register written to several servos in one broadcast frame.
    /// Sync writes are unacknowledged.
    pub fn sync_write_i16(&mut self, reg: Reg, targets: &[(u8, i16)]) -> Result<(), BusError> {
        if targets.is_empty() {
            return Ok(());
        }
        let mut params = vec![reg as u8, 2];
        for &(id, value) in targets {
            let raw = encode_sign_magnitude(value);
            params.push(id);
            params.extend_from_slice(&raw.to_le_bytes());
        }
        debug!(reg = ?reg, count = targets.len(), "sync write");
        self.send_frame(BROADCAST_ID, Instr::SyncWrite, &params)
    }

    // Servo-level helpers

    pub fn set_mode(&mut self, id: u8, mode: DriveMode) -> Result<(), BusError> {
        self.write_u8(id, Reg::OperatingMode, mode as u8)
    }

    pub fn torque(&mut self, id: u8, on: bool) -> Result<(), BusError> {
        self.write_u8(id, Reg::TorqueSwitch, on as u8)
    }

    pub fn lock(&mut self, id: u8, on: bool) -> Result<(), BusError> {
        self.write_u8(id, Reg::Lock, on as u8)
    }

    pub fn set_speed(&mut self, id: u8, speed: i16) -> Result<(), BusError> {
        let raw = encode_sign_magnitude(speed);
        self.write_reg(id, Reg::GoalSpeed, &raw.to_le_bytes())
    }

    /// Raw position count, 0..4096 per revolution.
    pub fn position(&mut self, id: u8) -> Result<u16, BusError> {
        self.read_u16(id, Reg::PresentPosition)
    }

    /// Signed speed in counts/s.
    pub fn speed(&mut self, id: u8) -> Result<i16, BusError> {
        let raw = self.read_u16(id, Reg::PresentSpeed)?;
        Ok(decode_sign_magnitude(raw))
    }
}

/// Bit 15 carries the direction, bits 0-14 the magnitude.
pub(crate) fn encode_sign_magnitude(value: i16) -> u16 {
    if value >= 0 {
        value as u16
    } else {
        0x8000 | value.unsigned_abs()
    }
}

pub(crate) fn decode_sign_magnitude(raw: u16) -> i16 {
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_inverts_the_byte_sum() {
        // id 1, len 4, write, reg 40, value 1
        let body = [1u8, 4, 0x03, 40, 1];
        assert_eq!(ServoBus::checksum(&body), !(1u8 + 4 + 3 + 40 + 1));
    }

    #[test]
    fn sign_magnitude_roundtrip() {
        for v in [0i16, 1, 950, -950, -1, 3000, -3000] {
            assert_eq!(decode_sign_magnitude(encode_sign_magnitude(v)), v);
        }
        assert_eq!(encode_sign_magnitude(-100), 0x8064);
        assert_eq!(decode_sign_magnitude(0x8001), -1);
    }
}
