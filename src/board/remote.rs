//! I2C IR remote decoder
//!
//! The decoder buffers the last received frame. Reading it returns a kind byte,
//! the protocol id and the 32 bit command code in little endian order; a kind of
//! zero means nothing new arrived.

use embassy_rp::i2c::{self, Async, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use tank_robot::system::hardware::{CommandKind, RemoteCommand, RemoteSource};

pub const ADDRESS: u8 = 0x45;

const KIND_NONE: u8 = 0x00;
const KIND_NORMAL: u8 = 0x01;
const KIND_REPEAT: u8 = 0x03;
const KIND_END: u8 = 0x80;

const COMMAND_QUEUE_SIZE: usize = 4;

static COMMANDS: Channel<CriticalSectionRawMutex, RemoteCommand, COMMAND_QUEUE_SIZE> =
    Channel::new();

fn decode(frame: &[u8; 6]) -> Option<RemoteCommand> {
    let kind = match frame[0] {
        KIND_NONE => return None,
        KIND_NORMAL => CommandKind::Normal,
        KIND_REPEAT => CommandKind::Repeat,
        KIND_END => CommandKind::End,
        other => {
            defmt::debug!("ignoring remote frame kind {:#04x}", other);
            return None;
        }
    };
    Some(RemoteCommand {
        kind,
        protocol: frame[1],
        code: u32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]),
    })
}

/// Fetches the decoder's pending frame and queues it for the control loop
pub async fn poll_decoder(bus: &mut I2c<'static, I2C0, Async>) -> Result<(), i2c::Error> {
    let mut frame = [0u8; 6];
    bus.read_async(ADDRESS, &mut frame).await?;
    if let Some(command) = decode(&frame) {
        if COMMANDS.try_send(command).is_err() {
            defmt::warn!("remote queue full, dropping {:#010x}", command.code);
        }
    }
    Ok(())
}

/// Control loop end of the command queue
pub struct RemoteReceiver;

impl RemoteSource for RemoteReceiver {
    fn read(&mut self) -> Option<RemoteCommand> {
        COMMANDS.try_receive().ok()
    }
}
