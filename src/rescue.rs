// Recovery-object pickup choreography.
//
// Triggered by the co-processor's recovery flag. The sequence owns the
// drivetrain and both arm servos from start to finish; the main loop
// resumes at the top of its tick afterwards, re-reading every condition
// fresh. The bucket spin ends on stall, not on time; if the mechanism
// never binds, this blocks.

use tracing::{debug, info};

use crate::config;
use crate::hw::{ArmMotor, Drivetrain, HwError, StopPolicy};

pub fn run_recovery<D, L, B>(drive: &mut D, lift: &mut L, bucket: &mut B) -> Result<(), HwError>
where
    D: Drivetrain,
    L: ArmMotor,
    B: ArmMotor,
{
    info!("recovery target ahead, running pickup");

    // step back and bring the arm down in front of the object
    drive.drive_for_degrees(
        -config::BASE_SPEED,
        -config::BASE_SPEED,
        config::RESCUE_BACKUP_DEG,
        StopPolicy::Brake,
    )?;
    lift.run_angle(config::ARM_POWER, config::ARM_LIFT_DEG, StopPolicy::Coast)?;
    drive.drive_for_degrees(
        config::BASE_SPEED,
        config::BASE_SPEED,
        config::RESCUE_BACKUP_DEG,
        StopPolicy::Brake,
    )?;

    // kick the bucket for starting momentum, then wind it until it binds
    bucket.run_angle(config::ARM_POWER, config::BUCKET_KICK_DEG, StopPolicy::Coast)?;
    bucket.run(config::ARM_POWER)?;
    while bucket.speed()?.abs() >= config::BUCKET_STALL_DEGPS {}
    debug!("bucket stalled, object captured");
    bucket.stop(StopPolicy::Brake)?;

    // lift, release, and re-seat the bucket
    lift.run_angle(-config::ARM_POWER, config::ARM_LIFT_DEG, StopPolicy::Brake)?;
    bucket.run_angle(-config::ARM_POWER, config::BUCKET_RELEASE_DEG, StopPolicy::Coast)?;
    bucket.run_angle(config::ARM_POWER, config::BUCKET_RESET_DEG, StopPolicy::Brake)?;

    info!("pickup complete");
    Ok(())
}
