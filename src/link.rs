// Co-processor request/response link.
//
// The forward-sensing microcontroller answers a one-byte request with a
// four-byte report. A short poll loop re-sends the request while the reply
// is incomplete; past the failure threshold the robot brakes and sounds the
// fault tone once, then keeps retrying until the co-processor answers.
// Degraded, never dead.

use std::io::{self, Read, Write};
use std::thread;

use serialport::{ClearBuffer, SerialPort};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config;
use crate::hw::{Annunciator, Drivetrain, HwError, Side, StopPolicy};

/// Request byte, selecting which telemetry set the co-processor returns.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    LineFollow = 10,
    ObstacleAvoid = 20,
}

/// Forward line state: which side(s) show a black branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerFlag {
    None,
    Left,
    Right,
    Both,
}

impl CornerFlag {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => CornerFlag::Left,
            2 => CornerFlag::Right,
            3 => CornerFlag::Both,
            _ => CornerFlag::None,
        }
    }

    /// True if the flag reports a branch on `side`.
    pub fn covers(self, side: Side) -> bool {
        match self {
            CornerFlag::Both => true,
            CornerFlag::Left => side == Side::Left,
            CornerFlag::Right => side == Side::Right,
            CornerFlag::None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclineFlag {
    None,
    Up,
    Down,
}

impl InclineFlag {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => InclineFlag::Up,
            2 => InclineFlag::Down,
            _ => InclineFlag::None,
        }
    }
}

/// One complete telemetry exchange. Reports are fetched fresh every tick
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoProcessorReport {
    pub corner: CornerFlag,
    /// Obstacle/target state for the avoidance telemetry set
    pub obstacle: u8,
    /// Matches `config::RECOVERY_TARGET` when the recovery object is ahead
    pub recovery: u8,
    pub incline: InclineFlag,
}

impl CoProcessorReport {
    pub fn from_bytes(raw: [u8; config::LINK_RESPONSE_LEN]) -> Self {
        Self {
            corner: CornerFlag::from_byte(raw[0]),
            obstacle: raw[1],
            recovery: raw[2],
            incline: InclineFlag::from_byte(raw[3]),
        }
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Hw(#[from] HwError),
}

/// Byte channel the link runs over. Split out so tests can script one.
pub trait Channel {
    fn send(&mut self, byte: u8) -> io::Result<()>;
    /// Bytes buffered and ready to read.
    fn available(&mut self) -> io::Result<usize>;
    fn recv_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;
    fn drain(&mut self) -> io::Result<()>;
}

pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    pub fn open(path: &str, baudrate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baudrate)
            .timeout(config::LINK_POLL_INTERVAL)
            .open()?;
        Ok(Self { port })
    }
}

impl Channel for SerialChannel {
    fn send(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])?;
        self.port.flush()
    }

    fn available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read().map_err(io::Error::other)? as usize)
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.port.read_exact(buf)
    }

    fn drain(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::other)
    }
}

pub struct CoProcessorLink<C: Channel> {
    channel: C,
    last_failures: u32,
    degraded: bool,
}

impl CoProcessorLink<SerialChannel> {
    pub fn open(path: &str, baudrate: u32) -> Result<Self, LinkError> {
        Self::new(SerialChannel::open(path, baudrate)?)
    }
}

impl<C: Channel> CoProcessorLink<C> {
    /// Wraps a channel, discarding any stale bytes first.
    pub fn new(mut channel: C) -> Result<Self, LinkError> {
        channel.drain()?;
        Ok(Self {
            channel,
            last_failures: 0,
            degraded: false,
        })
    }

    /// Failed polls during the most recent exchange; the runtime shortens
    /// its tick delay when this is nonzero.
    pub fn last_poll_failures(&self) -> u32 {
        self.last_failures
    }

    /// One full request/response exchange. Blocks until the co-processor
    /// answers; past the failure threshold the drivetrain brakes and the
    /// fault tone sounds once per degraded episode, but polling never
    /// gives up.
    pub fn exchange<D, A>(
        &mut self,
        mode: ReportMode,
        drive: &mut D,
        alarm: &mut A,
    ) -> Result<CoProcessorReport, LinkError>
    where
        D: Drivetrain + ?Sized,
        A: Annunciator + ?Sized,
    {
        self.channel.send(mode as u8)?;
        self.last_failures = 0;

        while self.channel.available()? < config::LINK_RESPONSE_LEN {
            self.last_failures += 1;
            if self.last_failures > config::LINK_FAULT_THRESHOLD && !self.degraded {
                warn!(
                    failures = self.last_failures,
                    "co-processor silent, braking and retrying"
                );
                drive.stop(StopPolicy::Brake).map_err(LinkError::Hw)?;
                alarm.fault_tone();
                self.degraded = true;
            }
            thread::sleep(config::LINK_POLL_INTERVAL);
            self.channel.send(mode as u8)?;
        }

        let mut raw = [0u8; config::LINK_RESPONSE_LEN];
        self.channel.recv_exact(&mut raw)?;
        if self.degraded {
            debug!("co-processor recovered");
            self.degraded = false;
        }
        Ok(CoProcessorReport::from_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::mock::{CountingAlarm, ScriptedDrive};
    use std::collections::VecDeque;

    /// Reports no buffered bytes for a scripted number of polls, then a
    /// full report.
    struct StutteringChannel {
        short_polls: u32,
        polls: u32,
        reply: VecDeque<u8>,
        pub sent: Vec<u8>,
    }

    impl StutteringChannel {
        fn new(short_polls: u32, reply: [u8; 4]) -> Self {
            Self {
                short_polls,
                polls: 0,
                reply: reply.into_iter().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Channel for StutteringChannel {
        fn send(&mut self, byte: u8) -> io::Result<()> {
            self.sent.push(byte);
            Ok(())
        }

        fn available(&mut self) -> io::Result<usize> {
            self.polls += 1;
            if self.polls <= self.short_polls {
                Ok(0)
            } else {
                Ok(self.reply.len())
            }
        }

        fn recv_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
            for slot in buf.iter_mut() {
                *slot = self.reply.pop_front().unwrap_or(0);
            }
            Ok(())
        }

        fn drain(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn clean_exchange_decodes_the_report() {
        let mut link = CoProcessorLink::new(StutteringChannel::new(0, [1, 0, 2, 2])).unwrap();
        let mut drive = ScriptedDrive::new(10.0);
        let mut alarm = CountingAlarm::default();

        let report = link
            .exchange(ReportMode::LineFollow, &mut drive, &mut alarm)
            .unwrap();
        assert_eq!(report.corner, CornerFlag::Left);
        assert_eq!(report.recovery, 2);
        assert_eq!(report.incline, InclineFlag::Down);
        assert_eq!(link.last_poll_failures(), 0);
        assert_eq!(alarm.fault_tones, 0);
        assert_eq!(link.channel.sent, vec![10]);
    }

    #[test]
    fn ten_short_polls_stay_quiet() {
        let mut link = CoProcessorLink::new(StutteringChannel::new(10, [0; 4])).unwrap();
        let mut drive = ScriptedDrive::new(10.0);
        let mut alarm = CountingAlarm::default();

        link.exchange(ReportMode::LineFollow, &mut drive, &mut alarm)
            .unwrap();
        assert_eq!(link.last_poll_failures(), 10);
        assert_eq!(alarm.fault_tones, 0);
        assert!(drive.stops.is_empty());
    }

    #[test]
    fn fault_fires_once_at_poll_eleven_and_polling_continues() {
        let mut link = CoProcessorLink::new(StutteringChannel::new(12, [0; 4])).unwrap();
        let mut drive = ScriptedDrive::new(10.0);
        let mut alarm = CountingAlarm::default();

        link.exchange(ReportMode::LineFollow, &mut drive, &mut alarm)
            .unwrap();
        assert_eq!(link.last_poll_failures(), 12);
        // alert and brake exactly once, at the eleventh failed poll
        assert_eq!(alarm.fault_tones, 1);
        assert_eq!(drive.stops, vec![StopPolicy::Brake]);
        // the request byte kept going out after the alert: initial send
        // plus one re-send per failed poll
        assert_eq!(link.channel.sent.len(), 13);
    }

    #[test]
    fn recovery_rearms_the_fault_latch() {
        let mut drive = ScriptedDrive::new(10.0);
        let mut alarm = CountingAlarm::default();

        let mut link = CoProcessorLink::new(StutteringChannel::new(12, [0; 4])).unwrap();
        link.exchange(ReportMode::LineFollow, &mut drive, &mut alarm)
            .unwrap();
        assert_eq!(alarm.fault_tones, 1);

        // fresh degradation on a fresh channel fires again
        link.channel = StutteringChannel::new(12, [0; 4]);
        link.exchange(ReportMode::LineFollow, &mut drive, &mut alarm)
            .unwrap();
        assert_eq!(alarm.fault_tones, 2);
    }

    #[test]
    fn obstacle_mode_sends_its_own_request_byte() {
        let mut link = CoProcessorLink::new(StutteringChannel::new(0, [0; 4])).unwrap();
        let mut drive = ScriptedDrive::new(10.0);
        let mut alarm = CountingAlarm::default();

        link.exchange(ReportMode::ObstacleAvoid, &mut drive, &mut alarm)
            .unwrap();
        assert_eq!(link.channel.sent, vec![20]);
    }

    #[test]
    fn corner_flag_coverage() {
        assert!(CornerFlag::Both.covers(Side::Left));
        assert!(CornerFlag::Both.covers(Side::Right));
        assert!(CornerFlag::Left.covers(Side::Left));
        assert!(!CornerFlag::Left.covers(Side::Right));
        assert!(!CornerFlag::None.covers(Side::Left));
    }

    #[test]
    fn unknown_flag_bytes_decode_to_none() {
        let report = CoProcessorReport::from_bytes([9, 7, 0, 9]);
        assert_eq!(report.corner, CornerFlag::None);
        assert_eq!(report.incline, InclineFlag::None);
        assert_eq!(report.obstacle, 7);
    }
}
