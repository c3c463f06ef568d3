//! System Events
//!
//! Typed notifications raised by tasks and consumed by the active behavior state.
//!
//! An [`EventId`] pairs the [`Source`] that raised the event with the [`Code`] of the
//! condition. The pair packs into a 16-bit identifier (`source | code`) for logging,
//! but handlers match on the typed constants instead of raw bits.

use heapless::Vec;

use crate::system::hardware::Direction;
use crate::task::scan_sonar::ScanRecord;

/// Number of events that can be pending at once
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Subsystem that raised an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Source {
    /// Spin, turn and backup maneuvers
    Movement = 0x0100,
    /// Ultrasonic ranging
    Sonar = 0x0200,
    /// IR proximity and step sensors
    Proximity = 0x0300,
    /// IR remote control
    Remote = 0x0400,
}

/// Condition reported by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Code {
    SpinEnd = 0x01,
    SpinAbort = 0x02,
    TurnBegin = 0x03,
    TurnEnd = 0x04,
    TurnAbort = 0x05,
    BackupBegin = 0x06,
    BackupEnd = 0x07,
    StartMotion = 0x08,
    StopMotion = 0x09,
    ObstacleNone = 0x10,
    ObstacleDetected = 0x11,
    ObstacleDanger = 0x12,
    ScanComplete = 0x13,
    ProximityClear = 0x20,
    ProximityLeft = 0x21,
    ProximityRight = 0x22,
    ProximityBlocked = 0x23,
    ProximityFront = 0x24,
    StepDetected = 0x25,
}

/// Identity of an event: who raised it and why
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventId {
    pub source: Source,
    pub code: Code,
}

impl EventId {
    pub const SPIN_COMPLETE: Self = Self::new(Source::Movement, Code::SpinEnd);
    pub const SPIN_ABORT: Self = Self::new(Source::Movement, Code::SpinAbort);
    pub const TURN_COMPLETE: Self = Self::new(Source::Movement, Code::TurnEnd);
    pub const TURN_ABORT: Self = Self::new(Source::Movement, Code::TurnAbort);
    pub const BACKUP_COMPLETE: Self = Self::new(Source::Movement, Code::BackupEnd);

    pub const OBSTACLE_NONE: Self = Self::new(Source::Sonar, Code::ObstacleNone);
    pub const OBSTACLE_DETECTED: Self = Self::new(Source::Sonar, Code::ObstacleDetected);
    pub const OBSTACLE_DANGER: Self = Self::new(Source::Sonar, Code::ObstacleDanger);
    pub const SCAN_COMPLETE: Self = Self::new(Source::Sonar, Code::ScanComplete);

    pub const PROXIMITY_CLEAR: Self = Self::new(Source::Proximity, Code::ProximityClear);
    pub const PROXIMITY_LEFT: Self = Self::new(Source::Proximity, Code::ProximityLeft);
    pub const PROXIMITY_RIGHT: Self = Self::new(Source::Proximity, Code::ProximityRight);
    pub const PROXIMITY_BLOCKED: Self = Self::new(Source::Proximity, Code::ProximityBlocked);
    pub const PROXIMITY_FRONT: Self = Self::new(Source::Proximity, Code::ProximityFront);
    pub const STEP_DETECTED: Self = Self::new(Source::Proximity, Code::StepDetected);

    pub const CMD_MOVE: Self = Self::new(Source::Remote, Code::StartMotion);
    pub const CMD_STOP: Self = Self::new(Source::Remote, Code::StopMotion);
    pub const CMD_TURN_BEGIN: Self = Self::new(Source::Remote, Code::TurnBegin);
    pub const CMD_TURN_END: Self = Self::new(Source::Remote, Code::TurnEnd);
    pub const CMD_BACKUP_BEGIN: Self = Self::new(Source::Remote, Code::BackupBegin);
    pub const CMD_BACKUP_END: Self = Self::new(Source::Remote, Code::BackupEnd);

    pub const fn new(source: Source, code: Code) -> Self {
        Self { source, code }
    }

    /// Packed 16-bit identifier, `source | code`
    pub const fn raw(&self) -> u16 {
        self.source as u16 | self.code as u16
    }
}

/// Data carried by an event
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    None,
    /// Sonar sample that caused a zone change
    Ping { distance: u16, angle: i16 },
    /// Finished directional scan
    Scan(ScanRecord),
    /// Requested turn direction
    Direction(Direction),
    /// Angle turned so far, in degrees
    Angle(f32),
}

/// A single notification
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub id: EventId,
    pub payload: Payload,
}

impl Event {
    pub const fn new(id: EventId) -> Self {
        Self {
            id,
            payload: Payload::None,
        }
    }

    pub const fn with(id: EventId, payload: Payload) -> Self {
        Self { id, payload }
    }
}

/// Bounded FIFO mailbox between tasks and the active state
///
/// When full, the oldest pending event from the same source as the new one is
/// dropped. If no pending event shares the source, the oldest event is dropped.
pub struct EventQueue {
    pending: Vec<Event, EVENT_QUEUE_CAPACITY>,
    dropped: u32,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            dropped: 0,
        }
    }

    /// Queues an event without payload
    pub fn raise(&mut self, id: EventId) {
        self.push(Event::new(id));
    }

    /// Queues an event with payload
    pub fn raise_with(&mut self, id: EventId, payload: Payload) {
        self.push(Event::with(id, payload));
    }

    /// Queues an event, making room if necessary
    pub fn push(&mut self, event: Event) {
        trace!("queue event {=u16:#x}", event.id.raw());

        if self.pending.is_full() {
            let index = self
                .pending
                .iter()
                .position(|pending| pending.id.source == event.id.source)
                .unwrap_or(0);
            let dropped = self.pending.remove(index);
            self.dropped = self.dropped.wrapping_add(1);
            warn!("event queue full, dropped {=u16:#x}", dropped.id.raw());
        }

        // A slot is always free at this point
        let _ = self.pending.push(event);
    }

    /// Takes the oldest pending event
    pub fn pop(&mut self) -> Option<Event> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of events lost to overflow since startup
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Pending events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.pending.iter()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_fifo_order() {
        let mut queue = EventQueue::new();
        queue.raise(EventId::OBSTACLE_DANGER);
        queue.raise(EventId::STEP_DETECTED);
        queue.raise_with(EventId::CMD_TURN_BEGIN, Payload::Direction(Direction::Left));

        assert_eq!(queue.pop().map(|e| e.id), Some(EventId::OBSTACLE_DANGER));
        assert_eq!(queue.pop().map(|e| e.id), Some(EventId::STEP_DETECTED));
        let last = queue.pop().unwrap();
        assert_eq!(last.id, EventId::CMD_TURN_BEGIN);
        assert_eq!(last.payload, Payload::Direction(Direction::Left));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn overflow_drops_oldest_event_of_same_source() {
        let mut queue = EventQueue::new();
        queue.raise(EventId::OBSTACLE_NONE);
        for _ in 1..EVENT_QUEUE_CAPACITY {
            queue.raise(EventId::PROXIMITY_LEFT);
        }
        assert_eq!(queue.len(), EVENT_QUEUE_CAPACITY);

        queue.raise(EventId::PROXIMITY_RIGHT);

        assert_eq!(queue.len(), EVENT_QUEUE_CAPACITY);
        assert_eq!(queue.dropped(), 1);
        // The sonar event survives, the oldest proximity event made room
        assert_eq!(queue.pop().map(|e| e.id), Some(EventId::OBSTACLE_NONE));
        let last = queue.iter().last().map(|e| e.id);
        assert_eq!(last, Some(EventId::PROXIMITY_RIGHT));
    }

    #[test]
    fn overflow_without_same_source_drops_oldest() {
        let mut queue = EventQueue::new();
        for _ in 0..EVENT_QUEUE_CAPACITY {
            queue.raise(EventId::PROXIMITY_LEFT);
        }
        queue.raise(EventId::CMD_STOP);

        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.iter().last().map(|e| e.id), Some(EventId::CMD_STOP));
    }

    #[test]
    fn raw_ids_keep_source_and_code_apart() {
        assert_eq!(EventId::SPIN_COMPLETE.raw(), 0x0101);
        assert_eq!(EventId::CMD_TURN_END.raw(), 0x0404);
        assert_ne!(EventId::TURN_COMPLETE, EventId::CMD_TURN_END);
        assert_eq!(EventId::TURN_COMPLETE.code, EventId::CMD_TURN_END.code);
    }

    #[test]
    fn ids_can_be_matched_as_patterns() {
        let describe = |id: EventId| match id {
            EventId::SPIN_COMPLETE => "spin",
            EventId::SCAN_COMPLETE => "scan",
            _ => "other",
        };
        assert_eq!(describe(EventId::SCAN_COMPLETE), "scan");
        assert_eq!(describe(EventId::BACKUP_COMPLETE), "other");
    }
}
