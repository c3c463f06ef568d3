//! RP2350 bindings for the hardware facades

pub mod clock;
pub mod imu;
pub mod motors;
pub mod proximity;
pub mod remote;
pub mod resources;
pub mod sensor_bus;
pub mod sonar;

use tank_robot::system::hardware::Platform;

/// The robot's Pico 2 board
pub struct Rp2350;

impl Platform for Rp2350 {
    type Clock = clock::WatchdogClock;
    type Motors = motors::DriveMotors;
    type Imu = imu::ImuReadings;
    type Sonar = sonar::SonarHandle;
    type Proximity = proximity::ProximityInputs;
    type Remote = remote::RemoteReceiver;
}
