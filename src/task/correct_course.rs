//! Heading hold
//!
//! While the robot drives straight ahead, a PI controller holds the heading it had
//! when the task resumed. The gyro rate is low-pass filtered and integrated into a
//! heading estimate; the correction trims the right track.

use embassy_time::{Duration, Instant};

use crate::system::hardware::{Direction, Imu, Io, Platform};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

/// Controller period
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Proportional gain
pub const KP: f32 = 20.0;

/// Integral gain, scaled by the controller period
pub const KI: f32 = 2.0 * 0.1;

/// Weight of the previous filtered rate in the low-pass filter
pub const ALPHA: f32 = 0.8;

pub struct CorrectCourse {
    lifecycle: Lifecycle,
    /// Filtered rate (deg/s)
    w0: f32,
    /// Heading estimate (deg), positive to the left
    h0: f32,
    /// Accumulated error
    ei: f32,
    t0: Instant,
    next_sample: Instant,
    correction: i16,
}

impl CorrectCourse {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            w0: 0.0,
            h0: 0.0,
            ei: 0.0,
            t0: Instant::from_ticks(0),
            next_sample: Instant::from_ticks(0),
            correction: 0,
        }
    }

    fn reset(&mut self, now: Instant) {
        self.w0 = 0.0;
        self.h0 = 0.0;
        self.ei = 0.0;
        self.correction = 0;
        self.t0 = now;
        self.next_sample = now + SAMPLE_INTERVAL;
    }

    pub fn heading(&self) -> f32 {
        self.h0
    }

    /// Last trim applied to the right track
    pub fn correction(&self) -> i16 {
        self.correction
    }
}

impl Default for CorrectCourse {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for CorrectCourse {
    fn name(&self) -> &'static str {
        "correct course"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, io: &mut Io<P>) {
        if change == Lifecycle::Resuming {
            self.reset(io.now());
        }
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        let t1 = io.now();
        if t1 < self.next_sample {
            return;
        }

        if !io.movement.is_moving_forward() {
            // Keep the time base fresh so a stop is not integrated
            self.t0 = t1;
            self.next_sample = t1 + SAMPLE_INTERVAL;
            return;
        }

        let dt = t1.saturating_duration_since(self.t0).as_micros() as f32 / 1_000_000.0;
        let wz = io.imu.gyro_rate_z();
        let w1 = ALPHA * self.w0 + (1.0 - ALPHA) * wz;
        let h1 = self.h0 + w1 * dt;
        let e1 = -h1;
        self.ei += e1;

        // Float to int casts saturate
        self.correction = (KP * e1 + KI * self.ei) as i16;
        io.movement.trim(Direction::Right, self.correction);

        trace!(
            "correct course: dt={} wz={} w1={} h1={} ei={} correction={}",
            dt,
            wz,
            w1,
            h1,
            self.ei,
            self.correction
        );

        self.w0 = w1;
        self.h0 = h1;
        self.t0 = t1;
        self.next_sample = t1 + SAMPLE_INTERVAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::movement::CRUISE_SPEED;
    use crate::testing::bench;

    #[test]
    fn left_drift_slows_right_track() {
        let (bench, mut io) = bench();
        let mut task = CorrectCourse::new();
        io.movement.go_forward();
        task.resume(&mut io);
        bench.imu.set_rate(10.0);

        bench.clock.advance_ms(100);
        task.poll(&mut io);

        // w1 = 0.2 * 10 = 2, h1 = 0.2, e = -0.2, ei = -0.2
        assert!((task.heading() - 0.2).abs() < 1e-4);
        assert_eq!(task.correction(), -4);
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, CRUISE_SPEED - 4));
    }

    #[test]
    fn samples_once_per_period() {
        let (bench, mut io) = bench();
        let mut task = CorrectCourse::new();
        io.movement.go_forward();
        task.resume(&mut io);
        bench.imu.set_rate(-50.0);

        bench.clock.advance_ms(60);
        task.poll(&mut io);
        assert_eq!(task.heading(), 0.0);

        bench.clock.advance_ms(40);
        task.poll(&mut io);
        assert!(task.heading() < 0.0);
        assert!(task.correction() > 0);
    }

    #[test]
    fn idle_while_not_driving_forward() {
        let (bench, mut io) = bench();
        let mut task = CorrectCourse::new();
        io.movement.go_backward();
        task.resume(&mut io);
        bench.imu.set_rate(30.0);

        bench.clock.advance_ms(500);
        task.poll(&mut io);

        assert_eq!(task.heading(), 0.0);
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, -CRUISE_SPEED));
    }

    #[test]
    fn resume_resets_controller() {
        let (bench, mut io) = bench();
        let mut task = CorrectCourse::new();
        io.movement.go_forward();
        task.resume(&mut io);
        bench.imu.set_rate(20.0);
        bench.clock.advance_ms(100);
        task.poll(&mut io);
        assert!(task.heading() != 0.0);

        task.suspend(&mut io);
        task.resume(&mut io);
        assert_eq!(task.heading(), 0.0);
        assert_eq!(task.correction(), 0);
    }
}
