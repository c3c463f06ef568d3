//! Sensor bus task
//!
//! I2C0 carries both the MPU6500 and the IR remote decoder. A single task owns the
//! bus and interleaves the two, which keeps the control loop free of bus waits.

use defmt::{info, warn};
use embassy_rp::i2c::{Config, I2c};
use embassy_time::{Duration, Instant, Ticker};

use super::imu::Mpu6500;
use super::remote;
use super::resources::{Irqs, SensorBusResources};

const BUS_FREQUENCY_HZ: u32 = 400_000;

/// IMU sampling period
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// The decoder is polled once every this many IMU samples
const REMOTE_POLL_DIVIDER: u32 = 5;

#[embassy_executor::task]
pub async fn sensor_bus(r: SensorBusResources) {
    let mut config = Config::default();
    config.frequency = BUS_FREQUENCY_HZ;
    let mut bus = I2c::new_async(r.i2c, r.scl, r.sda, Irqs, config);

    let mut imu = Mpu6500::new();
    let imu_ok = match imu.init(&mut bus).await {
        Ok(()) => true,
        Err(e) => {
            // Keep serving the remote so the robot can still be stopped
            warn!("imu init failed: {}", e);
            false
        }
    };
    info!("sensor bus running");

    let mut ticker = Ticker::every(SAMPLE_INTERVAL);
    let mut last_sample = Instant::now();
    let mut count: u32 = 0;
    loop {
        ticker.next().await;

        if imu_ok {
            let now = Instant::now();
            let dt = now.saturating_duration_since(last_sample).as_micros() as f32 / 1_000_000.0;
            last_sample = now;
            if let Err(e) = imu.update(&mut bus, dt).await {
                warn!("imu read failed: {}", e);
            }
        }

        count = count.wrapping_add(1);
        if count % REMOTE_POLL_DIVIDER == 0 {
            if let Err(e) = remote::poll_decoder(&mut bus).await {
                warn!("remote decoder read failed: {}", e);
            }
        }
    }
}
