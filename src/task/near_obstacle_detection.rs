//! IR proximity watch
//!
//! Reports the most specific obstacle condition on every poll while one exists:
//! front, then both sides, then right, then left. Clearing is reported once when
//! the last sensor releases.

use crate::system::event::EventId;
use crate::system::hardware::{Io, Platform, Proximity, ProximitySensor};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

pub struct NearObstacleDetection {
    lifecycle: Lifecycle,
    triggered: bool,
}

impl NearObstacleDetection {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            triggered: false,
        }
    }
}

impl Default for NearObstacleDetection {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for NearObstacleDetection {
    fn name(&self) -> &'static str {
        "near obstacle detection"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, _io: &mut Io<P>) {
        if change == Lifecycle::Resuming {
            self.triggered = false;
        }
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        let right = io.proximity.is_triggered(ProximitySensor::Right);
        let front = io.proximity.is_triggered(ProximitySensor::Front);
        let left = io.proximity.is_triggered(ProximitySensor::Left);

        let event = if front {
            EventId::PROXIMITY_FRONT
        } else if left && right {
            EventId::PROXIMITY_BLOCKED
        } else if right {
            EventId::PROXIMITY_RIGHT
        } else if left {
            EventId::PROXIMITY_LEFT
        } else if self.triggered {
            debug!("near obstacle: clear");
            self.triggered = false;
            io.events.raise(EventId::PROXIMITY_CLEAR);
            return;
        } else {
            return;
        };

        if !self.triggered {
            info!("near obstacle: left={} front={} right={}", left, front, right);
        }
        self.triggered = true;
        io.events.raise(event);
    }
}
