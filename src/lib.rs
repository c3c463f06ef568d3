//! Tank robot navigation core
//!
//! Cooperative task scheduler and behavior state machine for a small tracked robot.
//! Sensing and actuation are reached only through the facade traits in
//! [`system::hardware`], so the whole core runs unchanged on the RP2350 firmware
//! and in host tests.
//!
//! One control tick ([`system::robot::Robot::tick`]):
//! 1. feeds the watchdog and polls the resident IR remote task
//! 2. polls the active behavior state
//! 3. polls every active task in the state's task list
//! 4. delivers queued events, FIFO, to the active state

#![cfg_attr(not(test), no_std)]

// This must go first so the macros are visible in the other modules.
#[macro_use]
mod fmt;

/// Behavior states
pub mod state;
/// Core system components: events, scheduler, state machine, hardware facades
pub mod system;
/// Pollable background tasks
pub mod task;

#[cfg(test)]
pub(crate) mod testing;
