//! Hardware Resource Assignment
//!
//! Splits the RP2350 peripherals into one group per board task, so each task owns
//! exactly the pins it drives.
//!
//! # Resource Groups
//! - Motor driver: TB6612FNG direction pins, standby and PWM slices
//! - Sensor bus: I2C0 shared by the MPU6500 and the IR remote decoder
//! - Sonar: HC-SR04 trigger/echo plus the pan servo on PIO0
//! - Proximity: the three obstacle sensors and the step sensor

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{self, I2C0, PIO0};
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;
use embassy_rp::Peri;

assign_resources! {
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_22,
        left_slice: PWM_SLICE6,
        left_pwm_pin: PIN_28,
        left_forward_pin: PIN_21,
        left_backward_pin: PIN_20,
        right_slice: PWM_SLICE5,
        right_pwm_pin: PIN_27,
        right_forward_pin: PIN_19,
        right_backward_pin: PIN_18,
    },
    /// I2C0 shared by the MPU6500 and the IR remote decoder
    sensor_bus: SensorBusResources {
        i2c: I2C0,
        scl: PIN_13,
        sda: PIN_12,
    },
    /// HC-SR04 on the pan servo
    sonar: SonarResources {
        trigger_pin: PIN_15,
        echo_pin: PIN_14,
        servo_pin: PIN_5,
        pio: PIO0,
    },
    /// Digital IR proximity sensors
    proximity: ProximityResources {
        left_pin: PIN_26,
        front_pin: PIN_16,
        right_pin: PIN_17,
        step_pin: PIN_10,
    },
    /// Hardware watchdog
    watchdog: WatchdogResources {
        watchdog: WATCHDOG,
    },
}

bind_interrupts!(pub struct Irqs {
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});
