//! MPU6500 inertial measurement unit
//!
//! The sensor is read by the sensor bus task at a fixed rate. Each sample is
//! converted to physical units, corrected for the gyro bias measured at startup and
//! published to a cell the control loop reads without waiting.
//!
//! Heading is integrated from the yaw rate and therefore drifts; pitch and roll are
//! derived from gravity.

use core::cell::Cell;

use embassy_rp::i2c::{self, Async, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Timer};
use libm::{atan2f, sqrtf};
use tank_robot::system::hardware::{Imu, Orientation, Vector3};

pub const ADDRESS: u8 = 0x68;

const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;

const WHO_AM_I_MPU6500: u8 = 0x70;

/// +-500 deg/s full scale
const GYRO_FULL_SCALE_500: u8 = 0x08;
const GYRO_LSB_PER_DPS: f32 = 65.5;

/// +-2 g full scale
const ACCEL_FULL_SCALE_2G: u8 = 0x00;
const ACCEL_LSB_PER_G: f32 = 16384.0;

/// 41 Hz low pass on gyro and temperature, takes the edge off motor vibration
const DLPF_41HZ: u8 = 0x03;

const CALIBRATION_SAMPLES: u16 = 200;
const CALIBRATION_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Clone, Copy)]
struct ImuSample {
    gyro: Vector3,
    accel: Vector3,
    orientation: Orientation,
}

impl ImuSample {
    const fn zero() -> Self {
        Self {
            gyro: Vector3 { x: 0.0, y: 0.0, z: 0.0 },
            // Resting flat until the first sample arrives
            accel: Vector3 { x: 0.0, y: 0.0, z: 1.0 },
            orientation: Orientation {
                heading: 0.0,
                pitch: 0.0,
                roll: 0.0,
            },
        }
    }
}

static LATEST: Mutex<CriticalSectionRawMutex, Cell<ImuSample>> =
    Mutex::new(Cell::new(ImuSample::zero()));

fn latest() -> ImuSample {
    LATEST.lock(|cell| cell.get())
}

/// Register level MPU6500 access, owned by the sensor bus task
pub struct Mpu6500 {
    gyro_bias: Vector3,
    heading: f32,
}

impl Mpu6500 {
    pub const fn new() -> Self {
        Self {
            gyro_bias: Vector3 { x: 0.0, y: 0.0, z: 0.0 },
            heading: 0.0,
        }
    }

    /// Wakes the sensor, configures ranges and filters and measures the gyro bias.
    /// The robot must be standing still.
    pub async fn init(&mut self, bus: &mut I2c<'static, I2C0, Async>) -> Result<(), i2c::Error> {
        let mut who_am_i = [0u8; 1];
        bus.write_read_async(ADDRESS, [REG_WHO_AM_I], &mut who_am_i).await?;
        if who_am_i[0] != WHO_AM_I_MPU6500 {
            defmt::warn!("unexpected imu id {:#04x}", who_am_i[0]);
        }

        bus.write_async(ADDRESS, [REG_PWR_MGMT_1, 0x00]).await?;
        Timer::after_millis(100).await;
        bus.write_async(ADDRESS, [REG_CONFIG, DLPF_41HZ]).await?;
        bus.write_async(ADDRESS, [REG_GYRO_CONFIG, GYRO_FULL_SCALE_500]).await?;
        bus.write_async(ADDRESS, [REG_ACCEL_CONFIG, ACCEL_FULL_SCALE_2G]).await?;

        let mut sum = Vector3::default();
        for _ in 0..CALIBRATION_SAMPLES {
            let (_, gyro) = read_raw(bus).await?;
            sum.x += gyro.x;
            sum.y += gyro.y;
            sum.z += gyro.z;
            Timer::after(CALIBRATION_INTERVAL).await;
        }
        let n = CALIBRATION_SAMPLES as f32;
        self.gyro_bias = Vector3 {
            x: sum.x / n,
            y: sum.y / n,
            z: sum.z / n,
        };
        defmt::info!("imu ready, gyro bias {}", self.gyro_bias);
        Ok(())
    }

    /// Reads one sample, `dt` seconds after the previous one, and publishes it
    pub async fn update(
        &mut self,
        bus: &mut I2c<'static, I2C0, Async>,
        dt: f32,
    ) -> Result<(), i2c::Error> {
        let (accel, raw_gyro) = read_raw(bus).await?;
        let gyro = Vector3 {
            x: raw_gyro.x - self.gyro_bias.x,
            y: raw_gyro.y - self.gyro_bias.y,
            z: raw_gyro.z - self.gyro_bias.z,
        };

        self.heading += gyro.z * dt;
        if self.heading > 180.0 {
            self.heading -= 360.0;
        } else if self.heading < -180.0 {
            self.heading += 360.0;
        }

        let orientation = Orientation {
            heading: self.heading,
            pitch: atan2f(-accel.x, sqrtf(accel.y * accel.y + accel.z * accel.z)).to_degrees(),
            roll: atan2f(accel.y, accel.z).to_degrees(),
        };

        LATEST.lock(|cell| {
            cell.set(ImuSample {
                gyro,
                accel,
                orientation,
            })
        });
        Ok(())
    }
}

/// Acceleration in g and rates in deg/s, straight from the data registers
async fn read_raw(bus: &mut I2c<'static, I2C0, Async>) -> Result<(Vector3, Vector3), i2c::Error> {
    let mut buf = [0u8; 14];
    bus.write_read_async(ADDRESS, [REG_ACCEL_XOUT_H], &mut buf).await?;

    let word = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]) as f32;
    let accel = Vector3 {
        x: word(0) / ACCEL_LSB_PER_G,
        y: word(2) / ACCEL_LSB_PER_G,
        z: word(4) / ACCEL_LSB_PER_G,
    };
    // bytes 6..8 hold the temperature
    let gyro = Vector3 {
        x: word(8) / GYRO_LSB_PER_DPS,
        y: word(10) / GYRO_LSB_PER_DPS,
        z: word(12) / GYRO_LSB_PER_DPS,
    };
    Ok((accel, gyro))
}

/// Control loop view of the latest published sample
pub struct ImuReadings;

impl Imu for ImuReadings {
    fn gyro_rate_z(&mut self) -> f32 {
        latest().gyro.z
    }

    fn gyro_rates(&mut self) -> Vector3 {
        latest().gyro
    }

    fn acceleration(&mut self) -> Vector3 {
        latest().accel
    }

    fn orientation(&mut self) -> Orientation {
        latest().orientation
    }
}
