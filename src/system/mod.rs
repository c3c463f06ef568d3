//! Core system components: events, lifecycle, scheduling, behavior state machine
//! and the hardware facades everything runs on
pub mod event;
pub mod hardware;
pub mod lifecycle;
pub mod movement;
pub mod robot;
pub mod scheduler;
pub mod state;
