//! ScanForNewDirection
//!
//! Stands still and sweeps the sonar from hard right to hard left. Samples are
//! averaged in consecutive windows of [`WINDOW_SIZE`]; the centre of the window
//! with the longest average becomes the new heading. If even the best window is
//! closer than [`DETECT_DISTANCE`] the robot turns around instead.
//!
//! The sweep is driven from `poll`, one sample per tick. Waiting for the sonar to
//! settle is bounded by [`SETTLE_TIMEOUT`]; past it the sweep carries on without
//! the sample.

use embassy_time::{Duration, Instant};

use crate::state::remote_override;
use crate::system::event::{Event, EventId};
use crate::system::hardware::{Platform, Ranging, DETECT_DISTANCE};
use crate::system::lifecycle::Lifecycle;
use crate::system::scheduler::TaskId;
use crate::system::state::{Behavior, Context, StateId};

const TASKS: &[TaskId] = &[TaskId::Spin];

pub const MAX_SCAN_ANGLE: i16 = 90;
pub const SCAN_INCREMENT: i16 = 5;
pub const WINDOW_SIZE: u16 = 3;
pub const SETTLE_TIMEOUT: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Sweeping,
    Spinning,
}

pub struct ScanForNewDirection {
    lifecycle: Lifecycle,
    phase: Phase,
    scan_angle: i16,
    settle_deadline: Instant,
    window_sum: u32,
    window_count: u16,
    /// Angle of the first sample in the current window
    window_start: i16,
    best_ping: u16,
    best_angle: i16,
}

impl ScanForNewDirection {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            phase: Phase::Sweeping,
            scan_angle: -MAX_SCAN_ANGLE,
            settle_deadline: Instant::from_ticks(0),
            window_sum: 0,
            window_count: 0,
            window_start: -MAX_SCAN_ANGLE,
            best_ping: 0,
            best_angle: 0,
        }
    }

    /// Best window found by the last sweep, (distance, angle)
    pub fn best(&self) -> (u16, i16) {
        (self.best_ping, self.best_angle)
    }

    fn begin<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        self.phase = Phase::Sweeping;
        self.scan_angle = -MAX_SCAN_ANGLE;
        self.window_sum = 0;
        self.window_count = 0;
        self.best_ping = 0;
        self.best_angle = 0;
        cx.io.sonar.pan_to(self.scan_angle);
        self.settle_deadline = cx.io.now() + SETTLE_TIMEOUT;
    }

    /// Closes the current window; `last_angle` is where its last sample was taken.
    /// Failed pings are skipped, so the window may span more than its samples.
    fn close_window(&mut self, last_angle: i16) {
        if self.window_count == 0 {
            return;
        }
        let average = (self.window_sum / u32::from(self.window_count)) as u16;
        if average > self.best_ping {
            self.best_ping = average;
            self.best_angle = (self.window_start + last_angle) / 2;
        }
        self.window_sum = 0;
        self.window_count = 0;
    }

    fn finish<P: Platform>(&mut self, cx: &mut Context<'_, P>) -> Option<StateId> {
        cx.io.sonar.pan_to(self.best_angle);
        info!(
            "scan for new direction: best {} cm at {} deg",
            self.best_ping,
            self.best_angle
        );

        if self.best_ping < DETECT_DISTANCE {
            return Some(StateId::ReversingDirection);
        }

        self.phase = Phase::Spinning;
        cx.tasks.spin.start(self.best_angle, cx.io);
        None
    }
}

impl Default for ScanForNewDirection {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for ScanForNewDirection {
    fn name(&self) -> &'static str {
        "scan for new direction"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, cx: &mut Context<'_, P>) {
        match change {
            Lifecycle::Resuming => {
                cx.tasks.set_task_list(TASKS, cx.io);
                cx.tasks.suspend(TaskId::Spin, cx.io);
                cx.io.movement.stop();
                self.begin(cx);
            }
            Lifecycle::Suspending => {
                cx.tasks.suspend_all(TASKS, cx.io);
                cx.io.sonar.pan_to(0);
            }
            _ => {}
        }
    }

    fn poll<P: Platform>(&mut self, cx: &mut Context<'_, P>) -> Option<StateId> {
        if self.phase != Phase::Sweeping {
            return None;
        }

        let now = cx.io.now();
        if !cx.io.sonar.ready() && now < self.settle_deadline {
            return None;
        }

        let angle = self.scan_angle;
        match cx.io.sonar.ping() {
            Some(distance) => {
                trace!("scan for new direction: {} cm at {}", distance, angle);
                if self.window_count == 0 {
                    self.window_start = angle;
                }
                self.window_sum += u32::from(distance);
                self.window_count += 1;
                if self.window_count >= WINDOW_SIZE {
                    self.close_window(angle);
                }
            }
            None => trace!("scan for new direction: no echo at {}", angle),
        }

        self.scan_angle += SCAN_INCREMENT;
        if self.scan_angle > MAX_SCAN_ANGLE {
            if self.window_count > 1 {
                self.close_window(angle);
            }
            return self.finish(cx);
        }

        cx.io.sonar.pan_to(self.scan_angle);
        self.settle_deadline = now + SETTLE_TIMEOUT;
        None
    }

    fn on_event<P: Platform>(
        &mut self,
        event: &Event,
        _cx: &mut Context<'_, P>,
    ) -> Option<StateId> {
        if let Some(next) = remote_override(event) {
            return Some(next);
        }

        match event.id {
            EventId::SPIN_COMPLETE => Some(StateId::Moving),
            EventId::SPIN_ABORT => Some(StateId::ReversingDirection),
            _ => None,
        }
    }
}
