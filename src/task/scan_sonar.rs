//! Obstacle sensing with the panning sonar
//!
//! In ping-ahead mode the sonar looks straight ahead and each sample is classified
//! into a [`Zone`]. A zone change is reported only after [`CONFIRM_SAMPLES`]
//! consecutive samples agree, so a single stray echo never moves the robot.
//!
//! In scan mode the sonar sweeps from [`SCAN_START_ANGLE`] to [`SCAN_STOP_ANGLE`]
//! and accumulates a [`ScanRecord`] of how open each side is. The finished record is
//! raised with `SCAN_COMPLETE` and the task falls back to ping-ahead mode.

use embassy_time::{Duration, Instant};

use crate::system::event::{EventId, Payload};
use crate::system::hardware::{Io, Platform, Ranging, DANGER_DISTANCE, DETECT_DISTANCE};
use crate::system::lifecycle::Lifecycle;
use crate::task::Task;

/// Right extreme of the sweep
pub const SCAN_START_ANGLE: i16 = -45;

/// Left extreme of the sweep
pub const SCAN_STOP_ANGLE: i16 = 45;

/// Degrees between two scan positions
pub const SCAN_INCREMENT: i16 = 5;

/// Consecutive agreeing samples needed to confirm a zone change
pub const CONFIRM_SAMPLES: u8 = 3;

/// Longest wait for the sonar to settle before sampling anyway
pub const SETTLE_TIMEOUT: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SonarMode {
    PingAhead,
    Scan,
}

/// Distance class of the obstacle straight ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Zone {
    Clear,
    Detected,
    Danger,
}

impl Zone {
    pub fn classify(distance: u16) -> Self {
        if distance <= DANGER_DISTANCE {
            Zone::Danger
        } else if distance <= DETECT_DISTANCE {
            Zone::Detected
        } else {
            Zone::Clear
        }
    }

    fn event(self) -> EventId {
        match self {
            Zone::Clear => EventId::OBSTACLE_NONE,
            Zone::Detected => EventId::OBSTACLE_DETECTED,
            Zone::Danger => EventId::OBSTACLE_DANGER,
        }
    }
}

/// Openness profile gathered by one sweep
///
/// Positive angles are on the left. Samples taken straight ahead count for
/// neither side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanRecord {
    pub left_area: u32,
    pub right_area: u32,
    pub left_best_ping: u16,
    pub left_best_angle: i16,
    pub right_best_ping: u16,
    pub right_best_angle: i16,
}

impl ScanRecord {
    pub const fn new() -> Self {
        Self {
            left_area: 0,
            right_area: 0,
            left_best_ping: 0,
            left_best_angle: 90,
            right_best_ping: 0,
            right_best_angle: -90,
        }
    }

    /// Adds one sample; on equal pings the angle nearer straight ahead wins
    pub fn record(&mut self, angle: i16, distance: u16) {
        if angle > 0 {
            self.left_area += u32::from(distance);
            if distance > self.left_best_ping
                || (distance == self.left_best_ping && angle < self.left_best_angle)
            {
                self.left_best_ping = distance;
                self.left_best_angle = angle;
            }
        } else if angle < 0 {
            self.right_area += u32::from(distance);
            if distance > self.right_best_ping
                || (distance == self.right_best_ping && angle > self.right_best_angle)
            {
                self.right_best_ping = distance;
                self.right_best_angle = angle;
            }
        }
    }
}

impl Default for ScanRecord {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ScanSonar {
    lifecycle: Lifecycle,
    mode: SonarMode,
    /// Last reported zone
    zone: Zone,
    /// Zone of the current run of agreeing samples
    candidate: Zone,
    candidate_count: u8,
    scan_angle: i16,
    record: ScanRecord,
    settle_deadline: Instant,
}

impl ScanSonar {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            mode: SonarMode::PingAhead,
            zone: Zone::Clear,
            candidate: Zone::Clear,
            candidate_count: 0,
            scan_angle: SCAN_START_ANGLE,
            record: ScanRecord::new(),
            settle_deadline: Instant::from_ticks(0),
        }
    }

    pub fn mode(&self) -> SonarMode {
        self.mode
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Switches mode, discarding everything gathered in the old one
    pub fn set_mode<P: Platform>(&mut self, mode: SonarMode, io: &mut Io<P>) {
        debug!("scan sonar: {} mode", mode);
        self.mode = mode;
        self.candidate = Zone::Clear;
        self.candidate_count = 0;
        match mode {
            SonarMode::PingAhead => {
                self.zone = Zone::Clear;
                io.sonar.pan_to(0);
            }
            SonarMode::Scan => {
                self.record = ScanRecord::new();
                self.scan_angle = SCAN_START_ANGLE;
                io.sonar.pan_to(self.scan_angle);
            }
        }
        self.settle_deadline = io.now() + SETTLE_TIMEOUT;
    }

    fn ping_ahead<P: Platform>(&mut self, io: &mut Io<P>) {
        if !io.sonar.ready() {
            return;
        }

        let Some(distance) = io.sonar.ping() else {
            trace!("scan sonar: ping failed");
            return;
        };

        let zone = Zone::classify(distance);
        if zone == self.candidate {
            self.candidate_count = self.candidate_count.saturating_add(1);
        } else {
            self.candidate = zone;
            self.candidate_count = 1;
        }

        if zone != self.zone && self.candidate_count >= CONFIRM_SAMPLES {
            info!("scan sonar: {} at {} cm", zone, distance);
            self.zone = zone;
            io.events.raise_with(zone.event(), Payload::Ping { distance, angle: 0 });
        }
    }

    fn scan<P: Platform>(&mut self, io: &mut Io<P>) {
        let now = io.now();
        if !io.sonar.ready() && now < self.settle_deadline {
            return;
        }

        match io.sonar.ping() {
            Some(distance) => self.record.record(self.scan_angle, distance),
            None => trace!("scan sonar: no echo at {}", self.scan_angle),
        }

        self.scan_angle += SCAN_INCREMENT;
        if self.scan_angle > SCAN_STOP_ANGLE {
            let record = self.record;
            info!(
                "scan sonar: scan complete, left={} right={}",
                record.left_area,
                record.right_area
            );
            io.events.raise_with(EventId::SCAN_COMPLETE, Payload::Scan(record));
            self.set_mode(SonarMode::PingAhead, io);
        } else {
            io.sonar.pan_to(self.scan_angle);
            self.settle_deadline = now + SETTLE_TIMEOUT;
        }
    }
}

impl Default for ScanSonar {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for ScanSonar {
    fn name(&self) -> &'static str {
        "scan sonar"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, io: &mut Io<P>) {
        match change {
            Lifecycle::Resuming => self.set_mode(SonarMode::PingAhead, io),
            Lifecycle::Suspending => io.sonar.pan_to(0),
            _ => {}
        }
    }

    fn poll<P: Platform>(&mut self, io: &mut Io<P>) {
        match self.mode {
            SonarMode::PingAhead => self.ping_ahead(io),
            SonarMode::Scan => self.scan(io),
        }
    }
}
