//! ReversingDirection: back off, then turn around

use embassy_time::Duration;

use crate::state::remote_override;
use crate::system::event::{Event, EventId};
use crate::system::hardware::Platform;
use crate::system::lifecycle::Lifecycle;
use crate::system::scheduler::TaskId;
use crate::system::state::{Behavior, Context, StateId};

const TASKS: &[TaskId] = &[TaskId::Backup, TaskId::Spin];

/// How long to reverse before turning around
pub const BACKUP_TIME: Duration = Duration::from_millis(500);

/// Turn-around angle
pub const REVERSE_ANGLE: i16 = 180;

pub struct ReversingDirection {
    lifecycle: Lifecycle,
}

impl ReversingDirection {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
        }
    }
}

impl Default for ReversingDirection {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for ReversingDirection {
    fn name(&self) -> &'static str {
        "reversing direction"
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
                // Not needed until the backup is done
                cx.tasks.suspend(TaskId::Spin, cx.io);
                cx.tasks.backup.start(BACKUP_TIME, cx.io);
            }
            Lifecycle::Suspending => cx.tasks.suspend_all(TASKS, cx.io),
            _ => {}
        }
    }

    fn on_event<P: Platform>(&mut self, event: &Event, cx: &mut Context<'_, P>) -> Option<StateId> {
        if let Some(next) = remote_override(event) {
            return Some(next);
        }

        match event.id {
            EventId::BACKUP_COMPLETE => {
                cx.tasks.suspend(TaskId::Backup, cx.io);
                cx.tasks.spin.start(REVERSE_ANGLE, cx.io);
                None
            }
            EventId::SPIN_COMPLETE => Some(StateId::Moving),
            EventId::SPIN_ABORT => {
                warn!("reversing direction: spin failed");
                Some(StateId::Stopped)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::movement::CRUISE_SPEED;
    use crate::task::Task;
    use crate::testing::robot_in;

    #[test]
    fn backs_up_then_turns_around() {
        let (bench, mut robot) = robot_in(StateId::ReversingDirection);
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, -CRUISE_SPEED));
        assert!(!robot.tasks().spin.is_active());

        bench.clock.advance_ms(500);
        robot.tick();
        // Backup done, spin left has started
        assert!(robot.tasks().spin.is_active());
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, CRUISE_SPEED));

        bench.imu.set_rate(360.0);
        for _ in 0..60 {
            bench.clock.advance_ms(10);
            robot.tick();
        }
        assert_eq!(robot.current_state(), Some(StateId::Moving));
    }

    #[test]
    fn failed_spin_stops() {
        let (bench, mut robot) = robot_in(StateId::ReversingDirection);
        bench.clock.advance_ms(500);
        robot.tick();

        // Gyro reads nothing, the spin stalls
        for _ in 0..50 {
            bench.clock.advance_ms(10);
            robot.tick();
        }
        assert_eq!(robot.current_state(), Some(StateId::Stopped));
        assert_eq!(bench.motors.speeds(), (0, 0));
    }

    #[test]
    fn remote_stop_preempts() {
        let (_bench, mut robot) = robot_in(StateId::ReversingDirection);
        robot.dispatch(Event::new(EventId::CMD_STOP));
        assert_eq!(robot.current_state(), Some(StateId::Stopped));
        assert!(!robot.tasks().backup.is_active());
    }
}
