//! Drop-off watch
//!
//! Raises `STEP_DETECTED` on every poll where the downward sensor has lost the floor
//! while the robot is driving.

use crate::system::event::EventId;
use crate::system::hardware::{Io, Platform, Proximity, ProximitySensor};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

pub struct StepDetection {
    lifecycle: Lifecycle,
}

impl StepDetection {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
        }
    }
}

impl Default for StepDetection {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for StepDetection {
    fn name(&self) -> &'static str {
        "step detection"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        if io.proximity.is_triggered(ProximitySensor::Step) && io.movement.is_moving() {
            warn!("step detected");
            io.events.raise(EventId::STEP_DETECTED);
        }
    }
}
