//! IR remote commands
//!
//! Turns decoded remote frames into command events. Held keys produce a begin event
//! on the first frame and an end event once frames have been absent for
//! [`RELEASE_TIMEOUT`]. The end frame is synthesized here because the decoder only
//! reports what it receives.

use embassy_time::{Duration, Instant};

use crate::system::event::{EventId, Payload};
use crate::system::hardware::{CommandKind, Direction, Io, Platform, RemoteCommand, RemoteSource};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

/// Silence after which a held key counts as released
pub const RELEASE_TIMEOUT: Duration = Duration::from_millis(200);

/// NEC key codes of the remote
pub mod key {
    pub const PLAY: u32 = 0xFF_C2_3D;
    pub const CH: u32 = 0xFF_62_9D;
    pub const PREV: u32 = 0xFF_22_DD;
    pub const NEXT: u32 = 0xFF_02_FD;
    pub const NINE: u32 = 0xFF_52_AD;
    pub const VOL_UP: u32 = 0xFF_A8_57;
    pub const VOL_DOWN: u32 = 0xFF_E0_1F;
    pub const EQ: u32 = 0xFF_90_6F;
}

pub struct IrRemote {
    lifecycle: Lifecycle,
    /// Key currently held down
    held: Option<RemoteCommand>,
    release_deadline: Instant,
    /// Whether PLAY should stop rather than start the robot
    running: bool,
}

impl IrRemote {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            held: None,
            release_deadline: Instant::from_ticks(0),
            running: false,
        }
    }

    /// Keeps the PLAY toggle in step with state changes made by other means
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn process<P: Platform>(&mut self, command: RemoteCommand, io: &mut Io<P>) {
        trace!("ir remote: {=u32:#x} {}", command.code, command.kind);

        let begin = command.kind == CommandKind::Normal;
        let end = command.kind == CommandKind::End;

        match command.code {
            key::PLAY if begin => {
                let event = if self.running {
                    EventId::CMD_STOP
                } else {
                    EventId::CMD_MOVE
                };
                self.running = !self.running;
                io.events.raise(event);
            }
            key::CH if begin => io.events.raise(EventId::CMD_BACKUP_BEGIN),
            key::CH if end => io.events.raise(EventId::CMD_BACKUP_END),
            key::PREV if begin => io
                .events
                .raise_with(EventId::CMD_TURN_BEGIN, Payload::Direction(Direction::Left)),
            key::NEXT if begin => io
                .events
                .raise_with(EventId::CMD_TURN_BEGIN, Payload::Direction(Direction::Right)),
            key::PREV | key::NEXT if end => io.events.raise(EventId::CMD_TURN_END),
            key::NINE if begin => {
                let enabled = io.movement.motors_enabled();
                io.movement.enable_motors(!enabled);
            }
            key::PLAY | key::CH | key::PREV | key::NEXT | key::NINE => {}
            key::VOL_UP | key::VOL_DOWN | key::EQ => {}
            code => debug!("ir remote: unmapped key {=u32:#x}", code),
        }
    }
}

impl Default for IrRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for IrRemote {
    fn name(&self) -> &'static str {
        "ir remote"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, _io: &mut Io<P>) {
        if change == Lifecycle::Resuming {
            self.held = None;
        }
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        let now = io.now();

        match io.remote.read() {
            Some(mut command) => {
                self.release_deadline = now + RELEASE_TIMEOUT;
                match self.held {
                    // Still held: frames after the first are repeats
                    Some(held)
                        if command.kind == CommandKind::Repeat || held.code == command.code =>
                    {
                        command = RemoteCommand {
                            kind: CommandKind::Repeat,
                            ..held
                        };
                    }
                    Some(held) => {
                        // Another key without a gap, release the old one first
                        self.process(
                            RemoteCommand {
                                kind: CommandKind::End,
                                ..held
                            },
                            io,
                        );
                        self.held = Some(command);
                    }
                    None if command.kind == CommandKind::Repeat => return,
                    None => self.held = Some(command),
                }
                self.process(command, io);
            }
            None => {
                if let Some(held) = self.held {
                    if now > self.release_deadline {
                        self.held = None;
                        self.process(
                            RemoteCommand {
                                kind: CommandKind::End,
                                ..held
                            },
                            io,
                        );
                    }
                }
            }
        }
    }
}
