//! HC-SR04 ultrasonic sensor on a pan servo
//!
//! The board was out of PWM slices, so the servo is driven by a PIO state machine
//! running the PWM program from embassy-rp.
//!
//! The sonar task owns the servo and the sensor pins. The control loop asks for a
//! new angle through [`PAN`]; the task moves the servo, waits for it to settle and
//! then pings continuously, publishing raw and median filtered distances. A new
//! angle interrupts the wait between pings.

use core::cell::Cell;
use core::time::Duration as PulseWidth;

use defmt::{debug, info};
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pio::{Instance, Pio};
use embassy_rp::pio_programs::pwm::{PioPwm, PioPwmProgram};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Instant, Timer};
use moving_median::MovingMedian;
use tank_robot::system::hardware::Ranging;

use super::resources::{Irqs, SonarResources};

/// Pan limits, 0 is straight ahead and positive angles point left
const MAX_PAN: i16 = 90;

const SERVO_PERIOD: PulseWidth = PulseWidth::from_micros(20_000);
/// Pulse widths measured for the MG996R at its end stops
const SERVO_MIN_PULSE: PulseWidth = PulseWidth::from_micros(500);
const SERVO_MAX_PULSE: PulseWidth = PulseWidth::from_micros(2400);
const SERVO_RANGE_DEGREES: f32 = 180.0;

/// Fixed settle time plus a share per degree travelled
const SETTLE_BASE: Duration = Duration::from_millis(20);
const SETTLE_PER_DEGREE_US: u64 = 1_000;

/// Echoes from further away than this are dropped
const MAX_RANGE_CM: u64 = 400;
const ECHO_START_TIMEOUT: Duration = Duration::from_millis(5);
/// Round trip for MAX_RANGE_CM plus margin
const ECHO_TIMEOUT: Duration = Duration::from_millis(25);
/// Echo microseconds per centimetre of distance
const US_PER_CM: u64 = 58;

/// Lets the previous echo die out before the next ping
const PING_INTERVAL: Duration = Duration::from_millis(30);

const MEDIAN_WINDOW_SIZE: usize = 5;

/// Requested pan angle
pub static PAN: Signal<CriticalSectionRawMutex, i16> = Signal::new();

#[derive(Clone, Copy)]
struct SonarReading {
    angle: i16,
    settled: bool,
    /// Counts pings since boot, identifies fresh samples
    sample: u32,
    distance: Option<u16>,
    filtered: Option<u16>,
}

static LATEST: Mutex<CriticalSectionRawMutex, Cell<SonarReading>> =
    Mutex::new(Cell::new(SonarReading {
        angle: 0,
        settled: false,
        sample: 0,
        distance: None,
        filtered: None,
    }));

fn latest() -> SonarReading {
    LATEST.lock(|cell| cell.get())
}

fn publish(update: impl FnOnce(&mut SonarReading)) {
    LATEST.lock(|cell| {
        let mut reading = cell.get();
        update(&mut reading);
        cell.set(reading);
    });
}

pub struct Servo<'d, T: Instance, const SM: usize> {
    pwm: PioPwm<'d, T, SM>,
    min_pulse_width: PulseWidth,
    max_pulse_width: PulseWidth,
    max_degree_rotation: f32,
}

impl<'d, T: Instance, const SM: usize> Servo<'d, T, SM> {
    pub fn new(mut pwm: PioPwm<'d, T, SM>) -> Self {
        pwm.set_period(SERVO_PERIOD);
        pwm.start();
        Self {
            pwm,
            min_pulse_width: SERVO_MIN_PULSE,
            max_pulse_width: SERVO_MAX_PULSE,
            max_degree_rotation: SERVO_RANGE_DEGREES,
        }
    }

    /// Moves to `degree` within `0..=max_degree_rotation`
    pub fn rotate(&mut self, degree: f32) {
        let degree = degree.clamp(0.0, self.max_degree_rotation);
        let min = self.min_pulse_width.as_micros() as f32;
        let max = self.max_pulse_width.as_micros() as f32;
        let pulse = min + degree * (max - min) / self.max_degree_rotation;
        self.pwm.write(PulseWidth::from_micros(pulse as u64));
    }

    /// Pan angle to servo position, the servo's centre looks straight ahead
    pub fn pan(&mut self, angle: i16) {
        self.rotate(self.max_degree_rotation / 2.0 + angle as f32);
    }
}

/// One trigger/echo cycle, `None` when the echo never came or was out of range
async fn measure(trigger: &mut Output<'static>, echo: &mut Input<'static>) -> Option<u16> {
    trigger.set_high();
    Timer::after_micros(10).await;
    trigger.set_low();

    with_timeout(ECHO_START_TIMEOUT, echo.wait_for_high()).await.ok()?;
    let start = Instant::now();
    with_timeout(ECHO_TIMEOUT, echo.wait_for_low()).await.ok()?;
    let cm = Instant::now().saturating_duration_since(start).as_micros() / US_PER_CM;

    (cm > 0 && cm <= MAX_RANGE_CM).then_some(cm as u16)
}

fn settle_time(from: i16, to: i16) -> Duration {
    SETTLE_BASE + Duration::from_micros(from.abs_diff(to) as u64 * SETTLE_PER_DEGREE_US)
}

#[embassy_executor::task]
pub async fn sonar(r: SonarResources) {
    let Pio { mut common, sm0, .. } = Pio::new(r.pio, Irqs);
    let program = PioPwmProgram::new(&mut common);
    let mut servo = Servo::new(PioPwm::new(&mut common, sm0, r.servo_pin, &program));

    let mut trigger = Output::new(r.trigger_pin, Level::Low);
    let mut echo = Input::new(r.echo_pin, Pull::None);

    let mut angle: i16 = 0;
    let mut pending = Some(0);
    let mut median = MovingMedian::<f32, MEDIAN_WINDOW_SIZE>::new();
    let mut have_samples = false;
    info!("sonar running");

    loop {
        if let Some(target) = pending.take() {
            publish(|r| {
                r.angle = target;
                r.settled = false;
                r.filtered = None;
            });
            servo.pan(target);
            let settle = settle_time(angle, target);
            angle = target;
            median = MovingMedian::new();
            have_samples = false;

            // A newer request restarts the move from wherever the servo got to
            if let Either::First(next) = select(PAN.wait(), Timer::after(settle)).await {
                pending = Some(next);
                continue;
            }
            debug!("sonar settled at {}", angle);
            publish(|r| r.settled = true);
        }

        let distance = measure(&mut trigger, &mut echo).await;
        if let Some(cm) = distance {
            median.add_value(cm as f32);
            have_samples = true;
        }
        let filtered = have_samples.then(|| median.median() as u16);
        publish(|r| {
            r.sample = r.sample.wrapping_add(1);
            r.distance = distance;
            r.filtered = filtered;
        });

        if let Either::First(next) = select(PAN.wait(), Timer::after(PING_INTERVAL)).await {
            if next != angle {
                pending = Some(next);
            }
        }
    }
}

/// Control loop handle on the sonar task
pub struct SonarHandle {
    target: i16,
    consumed: u32,
}

impl SonarHandle {
    pub const fn new() -> Self {
        Self { target: 0, consumed: 0 }
    }

    fn fresh(&self, reading: &SonarReading) -> bool {
        reading.angle == self.target && reading.settled && reading.sample != self.consumed
    }
}

impl Ranging for SonarHandle {
    fn pan_to(&mut self, angle: i16) {
        let angle = angle.clamp(-MAX_PAN, MAX_PAN);
        if angle != self.target {
            self.target = angle;
            PAN.signal(angle);
        }
    }

    fn ping(&mut self) -> Option<u16> {
        let reading = latest();
        if !self.fresh(&reading) {
            return None;
        }
        self.consumed = reading.sample;
        reading.distance
    }

    fn filtered_ping(&mut self) -> Option<u16> {
        let reading = latest();
        if reading.angle == self.target && reading.settled {
            reading.filtered
        } else {
            None
        }
    }

    fn ready(&self) -> bool {
        self.fresh(&latest())
    }
}
