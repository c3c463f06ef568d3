//! Backing: reverse for as long as the remote's backup key is held

use crate::system::event::{Event, EventId};
use crate::system::hardware::Platform;
use crate::system::lifecycle::Lifecycle;
use crate::system::state::{Behavior, Context, StateId};

pub struct Backing {
    lifecycle: Lifecycle,
}

impl Backing {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
        }
    }
}

impl Default for Backing {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Backing {
    fn name(&self) -> &'static str {
        "backing"
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
            }
            Lifecycle::Suspending => cx.io.movement.stop(),
            _ => {}
        }
    }

    fn on_event<P: Platform>(
        &mut self,
        event: &Event,
        _cx: &mut Context<'_, P>,
    ) -> Option<StateId> {
        match event.id {
            EventId::CMD_BACKUP_END | EventId::CMD_STOP => Some(StateId::Stopped),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::system::event::{Event, EventId};
    use crate::system::lifecycle::Lifecycle;
    use crate::system::movement::CRUISE_SPEED;
    use crate::system::state::StateId;
    use crate::testing::robot_in;

    #[test]
    fn reverses_until_backup_end() {
        let (bench, mut robot) = robot_in(StateId::Backing);
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, -CRUISE_SPEED));

        robot.dispatch(Event::new(EventId::OBSTACLE_DANGER));
        assert_eq!(robot.current_state(), Some(StateId::Backing));

        robot.dispatch(Event::new(EventId::CMD_BACKUP_END));
        assert_eq!(robot.current_state(), Some(StateId::Stopped));
        assert_eq!(bench.motors.speeds(), (0, 0));
        assert_eq!(robot.states().lifecycle(StateId::Backing), Lifecycle::Inactive);
    }

    #[test]
    fn reentry_reruns_both_callbacks() {
        let (bench, mut robot) = robot_in(StateId::Backing);
        let before = bench.motors.history().len();

        robot.set_state(StateId::Backing);

        // Suspending stops, resuming reverses again
        let history = bench.motors.history();
        assert_eq!(
            &history[before..],
            [(0, 0), (-CRUISE_SPEED, -CRUISE_SPEED)]
        );
        assert_eq!(robot.states().lifecycle(StateId::Backing), Lifecycle::Active);
    }
}
