use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rescueline_runtime::config::RunConfig;
use rescueline_runtime::hw::colorhead::ColorHead;
use rescueline_runtime::hw::console::{ConsoleAnnunciator, KeyButtons};
use rescueline_runtime::link::CoProcessorLink;
use rescueline_runtime::motor::{ArmServo, DifferentialDrive, ServoBus};
use rescueline_runtime::runtime::Robot;

#[derive(Parser)]
#[command(name = "rescueline-runtime", about = "Line-rescue robot runtime")]
struct Args {
    /// Deployment config file (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the servo bus serial port
    #[arg(long)]
    servo_port: Option<String>,

    /// Override the co-processor serial port
    #[arg(long)]
    coproc_port: Option<String>,

    /// Override the color sensor head serial port
    #[arg(long)]
    sensor_port: Option<String>,
}

fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(port) = args.servo_port {
        cfg.servo_port = port;
    }
    if let Some(port) = args.coproc_port {
        cfg.coproc_port = port;
    }
    if let Some(port) = args.sensor_port {
        cfg.sensor_port = port;
    }

    let bus = Rc::new(RefCell::new(ServoBus::open(&cfg.servo_port)?));
    let drive = DifferentialDrive::new(Rc::clone(&bus), cfg.left_wheel_id, cfg.right_wheel_id)?;
    let lift = ArmServo::new(Rc::clone(&bus), cfg.lift_id)?;
    let bucket = ArmServo::new(Rc::clone(&bus), cfg.bucket_id)?;
    let sensors = ColorHead::open(&cfg.sensor_port, cfg.sensor_baud)?;
    let link = CoProcessorLink::open(&cfg.coproc_port, cfg.coproc_baud)?;

    let mut robot = Robot {
        drive,
        sensors,
        lift,
        bucket,
        buttons: KeyButtons,
        alarm: ConsoleAnnunciator,
        link,
    };
    robot.run()?;
    Ok(())
}
