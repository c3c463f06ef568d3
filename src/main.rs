//! Robot firmware entry point
//!
//! Initializes the board, spawns the sensor tasks and runs the navigation core in
//! its own control loop.

#![no_std]
#![no_main]

use board::resources::{
    AssignedResources, MotorDriverResources, ProximityResources, WatchdogResources,
};
use board::Rp2350;
use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use embassy_time::{Duration, Timer};
use tank_robot::system::hardware::Io;
use tank_robot::system::robot::Robot;
use tank_robot::system::state::StateId;
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// RP2350 facade implementations and sensor tasks
mod board;

/// Pause between control loop ticks
const TICK_INTERVAL: Duration = Duration::from_millis(2);

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());
    let r = split_resources!(p);

    spawner.spawn(board::sensor_bus::sensor_bus(r.sensor_bus)).unwrap();
    spawner.spawn(board::sonar::sonar(r.sonar)).unwrap();
    spawner
        .spawn(control_loop(r.motor_driver, r.proximity, r.watchdog))
        .unwrap();
}

/// Owns the navigation core and ticks it forever
#[embassy_executor::task]
async fn control_loop(
    motor_driver: MotorDriverResources,
    proximity: ProximityResources,
    watchdog: WatchdogResources,
) {
    let motors = match board::motors::DriveMotors::new(motor_driver) {
        Ok(motors) => motors,
        Err(e) => {
            error!("motor driver setup failed: {}", e);
            return;
        }
    };

    let io = Io::<Rp2350>::new(
        board::clock::WatchdogClock::new(watchdog),
        motors,
        board::imu::ImuReadings,
        board::sonar::SonarHandle::new(),
        board::proximity::ProximityInputs::new(proximity),
        board::remote::RemoteReceiver,
    );

    // Wait for the remote before moving
    let mut robot = Robot::new(io);
    robot.start(StateId::Stopped);
    info!("control loop running");

    loop {
        robot.tick();
        Timer::after(TICK_INTERVAL).await;
    }
}
