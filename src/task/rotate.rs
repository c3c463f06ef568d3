//! Gyro-integrated rotation
//!
//! One integrator serves two maneuvers:
//! - a **spin** rotates in place with the tracks running in opposite directions
//! - a **turn** pivots around the stopped inner track
//!
//! The angle turned is the trapezoidal integral of the gyro's vertical rate. A
//! maneuver completes once the magnitude of that angle reaches the target, and
//! aborts when its time budget runs out. A spin also aborts early when the gyro
//! shows no appreciable rotation for a while, e.g. when a track is jammed.

use embassy_time::{Duration, Instant};

use crate::system::event::{EventId, Payload};
use crate::system::hardware::{Direction, Imu, Io, Platform};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

/// Minimum time between two integration steps
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Time allowed for a spin of any angle
pub const SPIN_TIME_BUDGET: Duration = Duration::from_millis(4000);

/// Time allowed for a turn of any angle
pub const TURN_TIME_BUDGET: Duration = Duration::from_millis(8000);

/// Below this rate (deg/s) the robot counts as not rotating
pub const STALL_RATE: f32 = 3.0;

/// Consecutive still samples after which a spin is stalled
pub const STALL_SAMPLES: u16 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RotationKind {
    Spin,
    Turn,
}

pub struct Rotate {
    kind: RotationKind,
    lifecycle: Lifecycle,
    direction: Direction,
    /// Degrees, always positive
    target_angle: f32,
    current_angle: f32,
    /// Previous gyro sample and its timestamp
    w0: f32,
    t0: Instant,
    deadline: Instant,
    still_samples: u16,
}

impl Rotate {
    pub const fn new(kind: RotationKind) -> Self {
        Self {
            kind,
            lifecycle: Lifecycle::Inactive,
            direction: Direction::Left,
            target_angle: 0.0,
            current_angle: 0.0,
            w0: 0.0,
            t0: Instant::from_ticks(0),
            deadline: Instant::from_ticks(0),
            still_samples: 0,
        }
    }

    pub const fn spin() -> Self {
        Self::new(RotationKind::Spin)
    }

    pub const fn turn() -> Self {
        Self::new(RotationKind::Turn)
    }

    pub fn kind(&self) -> RotationKind {
        self.kind
    }

    /// Degrees turned since the start, signed like the gyro rate
    pub fn current_angle(&self) -> f32 {
        self.current_angle
    }

    /// Starts rotating by `angle` degrees, negative to the right
    ///
    /// A zero angle completes at once without moving. Starting while a rotation is
    /// in progress restarts it with the new target.
    pub fn start<P: Platform>(&mut self, angle: i16, io: &mut Io<P>) {
        self.reset();

        if angle == 0 {
            debug!("{}: zero angle, done", self.name());
            self.suspend(io);
            io.events.raise(self.completed_event());
            return;
        }

        self.direction = Direction::from_angle(angle);
        self.target_angle = f32::from(angle.unsigned_abs());
        info!("{}: {} deg {}", self.name(), self.target_angle, self.direction);

        match self.kind {
            RotationKind::Spin => io.movement.spin(self.direction),
            RotationKind::Turn => io.movement.turn(self.direction),
        }

        self.w0 = io.imu.gyro_rate_z();
        self.t0 = io.now();
        self.deadline = self.t0 + self.time_budget();
        self.resume(io);
    }

    fn reset(&mut self) {
        self.target_angle = 0.0;
        self.current_angle = 0.0;
        self.w0 = 0.0;
        self.still_samples = 0;
    }

    fn time_budget(&self) -> Duration {
        match self.kind {
            RotationKind::Spin => SPIN_TIME_BUDGET,
            RotationKind::Turn => TURN_TIME_BUDGET,
        }
    }

    fn completed_event(&self) -> EventId {
        match self.kind {
            RotationKind::Spin => EventId::SPIN_COMPLETE,
            RotationKind::Turn => EventId::TURN_COMPLETE,
        }
    }

    fn aborted_event(&self) -> EventId {
        match self.kind {
            RotationKind::Spin => EventId::SPIN_ABORT,
            RotationKind::Turn => EventId::TURN_ABORT,
        }
    }

    fn abort<P: Platform>(&mut self, io: &mut Io<P>) {
        let turned = self.current_angle;
        self.suspend(io);
        io.events.raise_with(self.aborted_event(), Payload::Angle(turned));
    }

    /// Integrates one gyro sample, returns false if it is too early for one
    fn integrate<P: Platform>(&mut self, now: Instant, io: &mut Io<P>) -> bool {
        let elapsed = now.saturating_duration_since(self.t0);
        if elapsed < SAMPLE_INTERVAL {
            return false;
        }

        let dt = elapsed.as_micros() as f32 / 1_000_000.0;
        let w1 = io.imu.gyro_rate_z();
        self.current_angle += (self.w0 + (w1 - self.w0) / 2.0) * dt;
        self.w0 = w1;
        self.t0 = now;

        if libm::fabsf(w1) < STALL_RATE {
            self.still_samples = self.still_samples.saturating_add(1);
        } else {
            self.still_samples = 0;
        }
        true
    }
}

impl Task for Rotate {
    fn name(&self) -> &'static str {
        match self.kind {
            RotationKind::Spin => "spin",
            RotationKind::Turn => "turn",
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, _io: &mut Io<P>) {
        if change == Lifecycle::Suspending {
            self.reset();
        }
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        let now = io.now();

        if self.integrate(now, io) {
            if libm::fabsf(self.current_angle) >= self.target_angle {
                info!("{}: done at {} deg", self.name(), self.current_angle);
                io.movement.stop();
                self.suspend(io);
                io.events.raise(self.completed_event());
                return;
            }

            if self.kind == RotationKind::Spin && self.still_samples >= STALL_SAMPLES {
                warn!("{}: stalled at {} deg", self.name(), self.current_angle);
                self.abort(io);
                return;
            }
        }

        if now > self.deadline {
            warn!("{}: timed out at {} deg", self.name(), self.current_angle);
            self.abort(io);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::movement::CRUISE_SPEED;
    use crate::system::scheduler::{Scheduler, TaskId};
    use crate::testing::{bench, drain_events, drain_ids};

    #[test]
    fn zero_angle_completes_immediately() {
        let (bench, mut io) = bench();
        let mut spin = Rotate::spin();

        spin.start(0, &mut io);

        assert_eq!(drain_ids(&mut io), [EventId::SPIN_COMPLETE]);
        assert_eq!(spin.current_angle(), 0.0);
        assert!(!spin.is_active());
        assert!(bench.motors.history().is_empty());
    }

    #[test]
    fn zero_angle_ends_a_running_rotation() {
        let (bench, mut io) = bench();
        let mut tasks = Scheduler::new();
        tasks.set_task_list(&[TaskId::Spin], &mut io);
        bench.imu.set_rate(90.0);

        tasks.spin.start(90, &mut io);
        tasks.spin.start(0, &mut io);
        assert!(!tasks.spin.is_active());
        assert_eq!(drain_ids(&mut io), [EventId::SPIN_COMPLETE]);

        bench.clock.advance_ms(20);
        tasks.tick(&mut io);
        assert!(drain_ids(&mut io).is_empty());
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, CRUISE_SPEED));
    }

    #[test]
    fn constant_rate_integrates_to_rate_times_time() {
        let (bench, mut io) = bench();
        let mut spin = Rotate::spin();
        bench.imu.set_rate(90.0);

        spin.start(360, &mut io);
        for _ in 0..25 {
            bench.clock.advance_ms(20);
            spin.poll(&mut io);
        }

        // 0.5 s at 90 deg/s
        assert!((spin.current_angle() - 45.0).abs() < 0.01);
        assert!(spin.is_active());
        assert!(io.events.is_empty());
    }

    #[test]
    fn samples_closer_than_interval_are_skipped() {
        let (bench, mut io) = bench();
        let mut spin = Rotate::spin();
        bench.imu.set_rate(100.0);

        spin.start(90, &mut io);
        bench.clock.advance_ms(5);
        spin.poll(&mut io);
        assert_eq!(spin.current_angle(), 0.0);

        // The skipped 5 ms is folded into the next step
        bench.clock.advance_ms(5);
        spin.poll(&mut io);
        assert!((spin.current_angle() - 1.0).abs() < 0.001);
    }

    #[test]
    fn spin_right_completes_and_stops() {
        let (bench, mut io) = bench();
        let mut spin = Rotate::spin();
        bench.imu.set_rate(-180.0);

        spin.start(-90, &mut io);
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, -CRUISE_SPEED));

        for _ in 0..60 {
            bench.clock.advance_ms(10);
            spin.poll(&mut io);
            if !spin.is_active() {
                break;
            }
        }

        assert_eq!(drain_ids(&mut io), [EventId::SPIN_COMPLETE]);
        assert_eq!(bench.motors.speeds(), (0, 0));
        assert!(!spin.is_active());
    }

    #[test]
    fn stalled_spin_aborts_before_deadline() {
        let (bench, mut io) = bench();
        let mut spin = Rotate::spin();
        bench.imu.set_rate(0.5);

        spin.start(180, &mut io);
        for _ in 0..STALL_SAMPLES {
            bench.clock.advance_ms(10);
            spin.poll(&mut io);
        }

        let events = drain_events(&mut io);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, EventId::SPIN_ABORT);
        assert!(!spin.is_active());
        // Abort leaves the motors to the caller
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, CRUISE_SPEED));
    }

    #[test]
    fn turn_times_out_without_stall_detection() {
        let (bench, mut io) = bench();
        let mut turn = Rotate::turn();
        io.movement.go_forward();
        bench.imu.set_rate(0.0);

        turn.start(45, &mut io);
        assert_eq!(bench.motors.speeds(), (0, CRUISE_SPEED));

        let mut polls = 0;
        while turn.is_active() && polls < 1000 {
            bench.clock.advance_ms(100);
            turn.poll(&mut io);
            polls += 1;
        }

        assert_eq!(drain_ids(&mut io), [EventId::TURN_ABORT]);
        // 8 s budget at 100 ms per poll
        assert_eq!(polls, 81);
    }
}
