//! Behavior states
//!
//! Each state installs the task list it needs when it resumes and suspends the
//! tasks it owns when it is left, so no controller or integrator carries stale
//! data into the next activation.

use crate::system::event::{Event, EventId};
use crate::system::state::StateId;

pub mod backing;
pub mod backup_to_avoid_obstacle;
pub mod moving;
pub mod reversing_direction;
pub mod scan_for_new_direction;
pub mod stopped;

/// Remote commands that preempt any autonomous behavior
pub(crate) fn remote_override(event: &Event) -> Option<StateId> {
    match event.id {
        EventId::CMD_STOP => Some(StateId::Stopped),
        EventId::CMD_BACKUP_BEGIN => Some(StateId::Backing),
        _ => None,
    }
}
