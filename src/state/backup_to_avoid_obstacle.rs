//! BackupToAvoidObstacle
//!
//! Reverses away from something right in front of the robot until the sonar sees
//! more than [`DANGER_DISTANCE`] ahead or [`MAX_BACKUP_TIME`] has passed, then
//! looks for a new direction.

use embassy_time::{Duration, Instant};

use crate::state::remote_override;
use crate::system::event::Event;
use crate::system::hardware::{Platform, Ranging, DANGER_DISTANCE};
use crate::system::lifecycle::Lifecycle;
use crate::system::state::{Behavior, Context, StateId};

pub const MAX_BACKUP_TIME: Duration = Duration::from_millis(500);

pub struct BackupToAvoidObstacle {
    lifecycle: Lifecycle,
    deadline: Instant,
}

impl BackupToAvoidObstacle {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            deadline: Instant::from_ticks(0),
        }
    }
}

impl Default for BackupToAvoidObstacle {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for BackupToAvoidObstacle {
    fn name(&self) -> &'static str {
        "backup to avoid obstacle"
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
                cx.tasks.set_task_list(&[], cx.io);
                cx.io.movement.go_backward();
                self.deadline = cx.io.now() + MAX_BACKUP_TIME;
                cx.io.sonar.pan_to(0);
            }
            Lifecycle::Suspending => cx.io.movement.stop(),
            _ => {}
        }
    }

    fn poll<P: Platform>(&mut self, cx: &mut Context<'_, P>) -> Option<StateId> {
        if cx.io.now() > self.deadline {
            debug!("backup to avoid obstacle: time is up");
            return Some(StateId::ScanForNewDirection);
        }

        match cx.io.sonar.filtered_ping_at(0) {
            Some(distance) if distance > DANGER_DISTANCE => {
                debug!("backup to avoid obstacle: clear at {} cm", distance);
                Some(StateId::ScanForNewDirection)
            }
            _ => None,
        }
    }

    fn on_event<P: Platform>(
        &mut self,
        event: &Event,
        _cx: &mut Context<'_, P>,
    ) -> Option<StateId> {
        remote_override(event)
    }
}
