//! Behavior State Machine
//!
//! Exactly one behavior state is current at any time. Switching first takes the
//! outgoing state through `Suspending`, then the incoming one through `Resuming`.
//! Setting the state that is already current re-runs both callbacks.
//!
//! Handlers never switch states themselves. `poll` and `on_event` return the state
//! to switch to, and the machine applies the switch before doing anything else.

use crate::state::backing::Backing;
use crate::state::backup_to_avoid_obstacle::BackupToAvoidObstacle;
use crate::state::moving::Moving;
use crate::state::reversing_direction::ReversingDirection;
use crate::state::scan_for_new_direction::ScanForNewDirection;
use crate::state::stopped::Stopped;
use crate::system::event::Event;
use crate::system::hardware::{Io, Platform};
use crate::system::lifecycle::Lifecycle;
use crate::system::scheduler::Scheduler;

/// Names a behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateId {
    Stopped,
    Moving,
    Backing,
    ReversingDirection,
    ScanForNewDirection,
    BackupToAvoidObstacle,
}

/// What a behavior state can act on
pub struct Context<'a, P: Platform> {
    pub io: &'a mut Io<P>,
    pub tasks: &'a mut Scheduler,
}

/// Contract shared by every behavior state
pub trait Behavior {
    fn name(&self) -> &'static str;

    fn lifecycle(&self) -> Lifecycle;

    fn set_lifecycle(&mut self, lifecycle: Lifecycle);

    /// Runs once per transition, while the state is `Resuming` or `Suspending`
    fn state_changing<P: Platform>(&mut self, change: Lifecycle, cx: &mut Context<'_, P>);

    /// Called once per tick while current
    fn poll<P: Platform>(&mut self, _cx: &mut Context<'_, P>) -> Option<StateId> {
        None
    }

    /// Handles one event; unknown events must be ignored
    fn on_event<P: Platform>(&mut self, event: &Event, cx: &mut Context<'_, P>) -> Option<StateId>;

    fn resume<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        if let Some(change) = self.lifecycle().resuming() {
            debug!("state {}: resuming", self.name());
            self.set_lifecycle(change);
            self.state_changing(change, cx);
            self.set_lifecycle(change.settled());
        }
    }

    fn suspend<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        if let Some(change) = self.lifecycle().suspending() {
            debug!("state {}: suspending", self.name());
            self.set_lifecycle(change);
            self.state_changing(change, cx);
            self.set_lifecycle(change.settled());
        }
    }
}

/// Runs `$body` with `$state` bound to the instance named by `$id`
macro_rules! with_state {
    ($machine:expr, $id:expr, |$state:ident| $body:expr) => {
        match $id {
            StateId::Stopped => {
                let $state = &mut $machine.stopped;
                $body
            }
            StateId::Moving => {
                let $state = &mut $machine.moving;
                $body
            }
            StateId::Backing => {
                let $state = &mut $machine.backing;
                $body
            }
            StateId::ReversingDirection => {
                let $state = &mut $machine.reversing_direction;
                $body
            }
            StateId::ScanForNewDirection => {
                let $state = &mut $machine.scan_for_new_direction;
                $body
            }
            StateId::BackupToAvoidObstacle => {
                let $state = &mut $machine.backup_to_avoid_obstacle;
                $body
            }
        }
    };
}

pub struct StateMachine {
    current: Option<StateId>,
    pub stopped: Stopped,
    pub moving: Moving,
    pub backing: Backing,
    pub reversing_direction: ReversingDirection,
    pub scan_for_new_direction: ScanForNewDirection,
    pub backup_to_avoid_obstacle: BackupToAvoidObstacle,
}

impl StateMachine {
    pub const fn new() -> Self {
        Self {
            current: None,
            stopped: Stopped::new(),
            moving: Moving::new(),
            backing: Backing::new(),
            reversing_direction: ReversingDirection::new(),
            scan_for_new_direction: ScanForNewDirection::new(),
            backup_to_avoid_obstacle: BackupToAvoidObstacle::new(),
        }
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    pub fn lifecycle(&self, id: StateId) -> Lifecycle {
        match id {
            StateId::Stopped => self.stopped.lifecycle(),
            StateId::Moving => self.moving.lifecycle(),
            StateId::Backing => self.backing.lifecycle(),
            StateId::ReversingDirection => self.reversing_direction.lifecycle(),
            StateId::ScanForNewDirection => self.scan_for_new_direction.lifecycle(),
            StateId::BackupToAvoidObstacle => self.backup_to_avoid_obstacle.lifecycle(),
        }
    }

    /// Makes `next` the current state, re-entering it if it already is
    pub fn set_current_state<P: Platform>(&mut self, next: StateId, cx: &mut Context<'_, P>) {
        match self.current {
            Some(previous) => {
                info!("state: {} -> {}", previous, next);
                with_state!(self, previous, |state| state.suspend(cx));
            }
            None => info!("state: -> {}", next),
        }
        self.current = Some(next);
        cx.tasks.ir_remote.set_running(next != StateId::Stopped);
        with_state!(self, next, |state| state.resume(cx));
    }

    /// Polls the current state and applies the switch it asks for
    pub fn poll<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        let Some(current) = self.current else {
            return;
        };
        if let Some(next) = with_state!(self, current, |state| state.poll(cx)) {
            self.set_current_state(next, cx);
        }
    }

    /// Delivers `event` to the current state only
    pub fn dispatch<P: Platform>(&mut self, event: &Event, cx: &mut Context<'_, P>) {
        let Some(current) = self.current else {
            return;
        };
        trace!("state {}: event {=u16:#x}", current, event.id.raw());
        if let Some(next) = with_state!(self, current, |state| state.on_event(event, cx)) {
            self.set_current_state(next, cx);
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
