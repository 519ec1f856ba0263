// Servo bus check: READ-ONLY sweep of the configured servos.
//
// Reads only - safe to run with the robot on the ground.
//
// Usage: cargo run --bin servo_check -- [port]

use rescueline_runtime::config::RunConfig;
use rescueline_runtime::motor::ServoBus;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    let cfg = RunConfig::default();
    let port = std::env::args().nth(1).unwrap_or(cfg.servo_port);

    let ids = [
        ("left wheel", cfg.left_wheel_id),
        ("right wheel", cfg.right_wheel_id),
        ("lift arm", cfg.lift_id),
        ("bucket", cfg.bucket_id),
    ];

    println!("Servo bus check (read-only) on {}", port);
    println!();

    let mut bus = ServoBus::open(&port)?;
    let mut missing = 0;
    for (name, id) in ids {
        print!("  servo {:2} ({:11}) ... ", id, name);
        if bus.ping(id)? {
            let position = bus.position(id)?;
            let speed = bus.speed(id)?;
            println!("ok, position {:4}, speed {}", position, speed);
        } else {
            println!("NO REPLY");
            missing += 1;
        }
    }
    println!();
    if missing == 0 {
        println!("All servos responding.");
    } else {
        println!("{} servo(s) silent - check wiring and IDs.", missing);
    }
    Ok(())
}
