//! Pollable background tasks
//!
//! A task is advanced once per scheduler tick while it is [`Lifecycle::Active`].
//! Tasks never block; anything that has to wait keeps a deadline and checks it on
//! the next poll. Results are reported by raising events on the [`Io`] queue.

use crate::system::hardware::{Io, Platform};
use crate::system::lifecycle::Lifecycle;

pub mod backup;
pub mod correct_course;
pub mod ir_remote;
pub mod near_obstacle_detection;
pub mod rotate;
pub mod scan_sonar;
pub mod step_detection;

/// Contract shared by every task
pub trait Task {
    fn name(&self) -> &'static str;

    fn lifecycle(&self) -> Lifecycle;

    fn set_lifecycle(&mut self, lifecycle: Lifecycle);

    /// Runs once per transition, while the task is `Resuming` or `Suspending`
    fn state_changing<P: Platform>(&mut self, _change: Lifecycle, _io: &mut Io<P>) {}

    /// Advances the task by one step
    fn poll<P: Platform>(&mut self, io: &mut Io<P>);

    fn is_active(&self) -> bool {
        self.lifecycle().is_active()
    }

    /// No-op if the task is already running
    fn resume<P: Platform>(&mut self, io: &mut Io<P>) {
        if let Some(change) = self.lifecycle().resuming() {
            debug!("task {}: resuming", self.name());
            self.set_lifecycle(change);
            self.state_changing(change, io);
            self.set_lifecycle(change.settled());
        }
    }

    /// No-op if the task is already inactive
    fn suspend<P: Platform>(&mut self, io: &mut Io<P>) {
        if let Some(change) = self.lifecycle().suspending() {
            debug!("task {}: suspending", self.name());
            self.set_lifecycle(change);
            self.state_changing(change, io);
            self.set_lifecycle(change.settled());
        }
    }
}
