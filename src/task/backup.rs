//! Timed reverse

use embassy_time::{Duration, Instant};

use crate::system::event::EventId;
use crate::system::hardware::{Io, Platform};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

/// Reverse time used when resumed without an explicit start
pub const DEFAULT_BACKUP_TIME: Duration = Duration::from_millis(500);

pub struct Backup {
    lifecycle: Lifecycle,
    duration: Duration,
    deadline: Instant,
}

impl Backup {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            duration: DEFAULT_BACKUP_TIME,
            deadline: Instant::from_ticks(0),
        }
    }

    /// Reverses for `duration`, then raises `BACKUP_COMPLETE`
    ///
    /// Restarts the countdown if a backup is already running.
    pub fn start<P: Platform>(&mut self, duration: Duration, io: &mut Io<P>) {
        self.duration = duration;
        self.deadline = io.now() + duration;
        self.resume(io);
    }
}

impl Default for Backup {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for Backup {
    fn name(&self) -> &'static str {
        "backup"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, io: &mut Io<P>) {
        match change {
            Lifecycle::Resuming => {
                self.deadline = io.now() + self.duration;
                io.movement.go_backward();
            }
            Lifecycle::Suspending => io.movement.stop(),
            _ => {}
        }
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        if io.now() >= self.deadline {
            debug!("backup: done");
            self.suspend(io);
            io.events.raise(EventId::BACKUP_COMPLETE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::movement::CRUISE_SPEED;
    use crate::testing::{bench, drain_ids};

    #[test]
    fn reverses_until_deadline() {
        let (bench, mut io) = bench();
        let mut backup = Backup::new();

        backup.start(Duration::from_millis(300), &mut io);
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, -CRUISE_SPEED));

        bench.clock.advance_ms(299);
        backup.poll(&mut io);
        assert!(io.events.is_empty());

        bench.clock.advance_ms(1);
        backup.poll(&mut io);
        assert_eq!(drain_ids(&mut io), [EventId::BACKUP_COMPLETE]);
        assert_eq!(bench.motors.speeds(), (0, 0));
        assert!(!backup.is_active());
    }

    #[test]
    fn restart_extends_running_backup() {
        let (bench, mut io) = bench();
        let mut backup = Backup::new();

        backup.start(Duration::from_millis(200), &mut io);
        bench.clock.advance_ms(150);
        backup.start(Duration::from_millis(200), &mut io);
        bench.clock.advance_ms(150);
        backup.poll(&mut io);

        assert!(backup.is_active());
        assert!(io.events.is_empty());
    }
}
