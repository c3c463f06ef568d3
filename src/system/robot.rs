//! Robot
//!
//! Ties the facades, the scheduler and the state machine together and runs the
//! control tick. Everything that mutates navigation state happens inside
//! [`Robot::tick`], called from a single control loop.

use crate::system::event::Event;
use crate::system::hardware::{Clock, Io, Platform};
use crate::system::scheduler::{Scheduler, TaskId};
use crate::system::state::{Context, StateId, StateMachine};

/// Most events delivered in one tick; the rest wait for the next one
pub const MAX_EVENTS_PER_TICK: usize = 32;

pub struct Robot<P: Platform> {
    io: Io<P>,
    tasks: Scheduler,
    states: StateMachine,
}

impl<P: Platform> Robot<P> {
    pub fn new(io: Io<P>) -> Self {
        Self {
            io,
            tasks: Scheduler::new(),
            states: StateMachine::new(),
        }
    }

    /// Starts the resident tasks and enters `initial`
    pub fn start(&mut self, initial: StateId) {
        info!("robot: starting in {}", initial);
        self.tasks.resume(TaskId::IrRemote, &mut self.io);
        self.set_state(initial);
    }

    /// Runs one control cycle
    ///
    /// Feeds the watchdog, polls the resident tasks, the current state and the
    /// current task list, then delivers the queued events to the current state.
    pub fn tick(&mut self) {
        self.io.clock.feed_watchdog();
        self.tasks.tick_resident(&mut self.io);

        let mut cx = Context {
            io: &mut self.io,
            tasks: &mut self.tasks,
        };
        self.states.poll(&mut cx);
        cx.tasks.tick(cx.io);

        for _ in 0..MAX_EVENTS_PER_TICK {
            let Some(event) = cx.io.events.pop() else {
                break;
            };
            self.states.dispatch(&event, &mut cx);
        }
    }

    /// Switches state right away, re-entering it if it is current
    pub fn set_state(&mut self, next: StateId) {
        let mut cx = Context {
            io: &mut self.io,
            tasks: &mut self.tasks,
        };
        self.states.set_current_state(next, &mut cx);
    }

    /// Delivers `event` to the current state right away, bypassing the queue
    pub fn dispatch(&mut self, event: Event) {
        let mut cx = Context {
            io: &mut self.io,
            tasks: &mut self.tasks,
        };
        self.states.dispatch(&event, &mut cx);
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.states.current()
    }

    pub fn io(&self) -> &Io<P> {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Io<P> {
        &mut self.io
    }

    pub fn tasks(&self) -> &Scheduler {
        &self.tasks
    }

    pub fn states(&self) -> &StateMachine {
        &self.states
    }
}
