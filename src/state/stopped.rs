//! Stopped: idle until the remote says otherwise

use crate::system::event::{Event, EventId, Payload};
use crate::system::hardware::Platform;
use crate::system::lifecycle::Lifecycle;
use crate::system::state::{Behavior, Context, StateId};

pub struct Stopped {
    lifecycle: Lifecycle,
}

impl Stopped {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
        }
    }
}

impl Default for Stopped {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Stopped {
    fn name(&self) -> &'static str {
        "stopped"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, cx: &mut Context<'_, P>) {
        if change == Lifecycle::Resuming {
            cx.tasks.set_task_list(&[], cx.io);
            cx.io.movement.stop();
        }
    }

    fn on_event<P: Platform>(&mut self, event: &Event, cx: &mut Context<'_, P>) -> Option<StateId> {
        match event.id {
            EventId::CMD_MOVE => Some(StateId::Moving),
            EventId::CMD_BACKUP_BEGIN => Some(StateId::Backing),
            EventId::CMD_TURN_BEGIN => {
                if let Payload::Direction(direction) = event.payload {
                    cx.io.movement.spin(direction);
                }
                None
            }
            EventId::CMD_TURN_END => {
                cx.io.movement.stop();
                None
            }
            _ => None,
        }
    }
}
