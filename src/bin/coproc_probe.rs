// Co-processor probe: one exchange in each report mode.
//
// The link retries forever if the co-processor stays silent; abort with
// Ctrl+C in that case.
//
// Usage: cargo run --bin coproc_probe -- [port]

use rescueline_runtime::config::RunConfig;
use rescueline_runtime::hw::{Annunciator, Drivetrain, HwError, Side, StopPolicy};
use rescueline_runtime::link::{CoProcessorLink, ReportMode};

/// The probe has no drivetrain; the link's degraded-state brake is a no-op.
struct NoDrive;

impl Drivetrain for NoDrive {
    fn drive(&mut self, _left_power: f32, _right_power: f32) -> Result<(), HwError> {
        Ok(())
    }

    fn stop(&mut self, _policy: StopPolicy) -> Result<(), HwError> {
        Ok(())
    }

    fn wheel_angle(&mut self, _side: Side) -> Result<f32, HwError> {
        Ok(0.0)
    }

    fn wheel_speed(&mut self, _side: Side) -> Result<f32, HwError> {
        Ok(0.0)
    }
}

struct PrintAlarm;

impl Annunciator for PrintAlarm {
    fn ready_tone(&mut self) {}

    fn fault_tone(&mut self) {
        println!("  (co-processor silent, still retrying)");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    let cfg = RunConfig::default();
    let port = std::env::args().nth(1).unwrap_or(cfg.coproc_port);

    println!("Co-processor probe on {} ({} baud)", port, cfg.coproc_baud);

    let mut link = CoProcessorLink::open(&port, cfg.coproc_baud)?;
    let mut drive = NoDrive;
    let mut alarm = PrintAlarm;

    for mode in [ReportMode::LineFollow, ReportMode::ObstacleAvoid] {
        let report = link.exchange(mode, &mut drive, &mut alarm)?;
        println!(
            "  {:?}: corner {:?}, obstacle {}, recovery {}, incline {:?} ({} retries)",
            mode,
            report.corner,
            report.obstacle,
            report.recovery,
            report.incline,
            link.last_poll_failures()
        );
    }
    Ok(())
}
