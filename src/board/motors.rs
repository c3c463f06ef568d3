//! TB6612FNG motor driver adapter
//!
//! Translates signed track speeds into the driver's percentage duty cycle. Left is
//! motor A, right is motor B. Driver errors are logged and otherwise ignored, the
//! next command simply tries again.

use defmt::{info, warn};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::pwm::{self, Pwm};
use tank_robot::system::hardware::{Direction, Motors};
use tank_robot::system::movement::MAX_SPEED;
use tb6612fng::{DriveCommand, Motor};

use super::resources::MotorDriverResources;

/// Cheap DC motors run better at a low PWM frequency
const PWM_FREQUENCY_HZ: u32 = 10_000;

type TrackMotor = Motor<Output<'static>, Output<'static>, Pwm<'static>>;

/// A motor driver pin could not be configured
#[derive(Debug, defmt::Format)]
pub struct MotorSetupError;

pub struct DriveMotors {
    left: TrackMotor,
    right: TrackMotor,
    _standby: Output<'static>,
}

impl DriveMotors {
    pub fn new(r: MotorDriverResources) -> Result<Self, MotorSetupError> {
        let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();

        // Smallest divider that keeps the period within 16 bits
        let divider = ((clock_freq_hz / PWM_FREQUENCY_HZ) / 65535 + 1) as u8;
        let period = (clock_freq_hz / (PWM_FREQUENCY_HZ * divider as u32)) as u16 - 1;

        let mut pwm_config = pwm::Config::default();
        pwm_config.divider = divider.into();
        pwm_config.top = period;

        let left_fwd = Output::new(r.left_forward_pin, Level::Low);
        let left_bckw = Output::new(r.left_backward_pin, Level::Low);
        let left_pwm = Pwm::new_output_a(r.left_slice, r.left_pwm_pin, pwm_config.clone());
        let left = Motor::new(left_fwd, left_bckw, left_pwm).map_err(|_| MotorSetupError)?;

        let right_fwd = Output::new(r.right_forward_pin, Level::Low);
        let right_bckw = Output::new(r.right_backward_pin, Level::Low);
        let right_pwm = Pwm::new_output_b(r.right_slice, r.right_pwm_pin, pwm_config);
        let right = Motor::new(right_fwd, right_bckw, right_pwm).map_err(|_| MotorSetupError)?;

        // Leave standby for good, stopping is done through the duty cycle
        let standby = Output::new(r.standby_pin, Level::High);
        info!("motor driver ready, pwm divider {} top {}", divider, period);

        Ok(Self {
            left,
            right,
            _standby: standby,
        })
    }
}

/// Signed speed to a driver command with a percentage duty cycle
fn command(speed: i16) -> DriveCommand {
    let speed = speed.clamp(-MAX_SPEED, MAX_SPEED);
    let percent = (speed.unsigned_abs() as u32 * 100 / MAX_SPEED as u32) as u8;
    match speed {
        0 => DriveCommand::Stop,
        s if s > 0 => DriveCommand::Forward(percent),
        _ => DriveCommand::Backward(percent),
    }
}

fn drive(motor: &mut TrackMotor, side: Direction, speed: i16) {
    if motor.drive(command(speed)).is_err() {
        warn!("{} motor rejected speed {}", side, speed);
    }
}

impl Motors for DriveMotors {
    fn set_motors(&mut self, left: i16, right: i16) {
        drive(&mut self.left, Direction::Left, left);
        drive(&mut self.right, Direction::Right, right);
    }

    fn set_motor(&mut self, side: Direction, speed: i16) {
        match side {
            Direction::Left => drive(&mut self.left, side, speed),
            Direction::Right => drive(&mut self.right, side, speed),
        }
    }
}
