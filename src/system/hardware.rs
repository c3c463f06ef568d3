//! Hardware facades
//!
//! The navigation core never touches peripherals directly. Each sensor or actuator
//! is reached through one of the traits below, and a [`Platform`] names the concrete
//! implementation of every facade. The firmware binds them to RP2350 drivers, the
//! tests bind them to scripted mocks.
//!
//! All facade methods are synchronous and must return promptly: they are called
//! from the single control loop, once per tick at most.

use embassy_time::Instant;

use crate::system::event::EventQueue;
use crate::system::movement::Movement;

/// At or below this distance (cm) an obstacle is dangerously close
pub const DANGER_DISTANCE: u16 = 30;

/// At or below this distance (cm) an obstacle has been detected
pub const DETECT_DISTANCE: u16 = 60;

/// A single ping at least this long (cm) counts as a clear way out
pub const CLEAR_DISTANCE: u16 = 100;

/// Side of the robot, or sense of rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Negative angles turn right, everything else turns left
    pub fn from_angle(angle: i16) -> Self {
        if angle < 0 {
            Direction::Right
        } else {
            Direction::Left
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Three-axis reading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Orientation {
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Monotonic time source and watchdog
pub trait Clock {
    fn now(&self) -> Instant;

    /// Signals liveness to the platform watchdog
    fn feed_watchdog(&mut self) {}
}

/// Raw differential drive, speeds in `-MAX_SPEED..=MAX_SPEED`
pub trait Motors {
    fn set_motors(&mut self, left: i16, right: i16);

    fn set_motor(&mut self, side: Direction, speed: i16);
}

/// Inertial measurement unit
pub trait Imu {
    /// Rate of turn about the vertical axis in deg/s, positive to the left
    fn gyro_rate_z(&mut self) -> f32;

    /// Rates of turn about all axes in deg/s
    fn gyro_rates(&mut self) -> Vector3;

    /// Linear acceleration in g
    fn acceleration(&mut self) -> Vector3;

    fn orientation(&mut self) -> Orientation;
}

/// Ultrasonic ranging sensor on a pan servo
///
/// Angles are in degrees, 0 is straight ahead, positive angles point left.
pub trait Ranging {
    /// Starts moving the sensor; `ready` stays false until it has settled
    fn pan_to(&mut self, angle: i16);

    /// One distance sample in cm, `None` if the ping failed
    fn ping(&mut self) -> Option<u16>;

    /// Filtered distance in cm at the current angle, `None` if unavailable
    fn filtered_ping(&mut self) -> Option<u16>;

    /// False while the sensor is still repositioning
    fn ready(&self) -> bool;

    /// Pans to `angle` and pings once the sensor is there
    fn ping_at(&mut self, angle: i16) -> Option<u16> {
        self.pan_to(angle);
        if self.ready() {
            self.ping()
        } else {
            None
        }
    }

    /// Pans to `angle` and returns a filtered sample once the sensor is there
    fn filtered_ping_at(&mut self, angle: i16) -> Option<u16> {
        self.pan_to(angle);
        if self.ready() {
            self.filtered_ping()
        } else {
            None
        }
    }
}

/// Discrete IR proximity sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProximitySensor {
    Left,
    Front,
    Right,
    /// Downward facing, triggered when the floor drops away
    Step,
}

pub trait Proximity {
    fn is_triggered(&mut self, sensor: ProximitySensor) -> bool;
}

/// How a remote command was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    /// First frame of a key press
    Normal,
    /// Key is being held
    Repeat,
    /// Synthesized once the key has been released
    End,
}

/// Decoded IR remote frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteCommand {
    pub kind: CommandKind,
    pub protocol: u8,
    pub code: u32,
}

/// Source of decoded remote commands
pub trait RemoteSource {
    /// Next received command, `None` if nothing arrived since the last call
    fn read(&mut self) -> Option<RemoteCommand>;
}

/// Concrete facade implementations for one target
pub trait Platform {
    type Clock: Clock;
    type Motors: Motors;
    type Imu: Imu;
    type Sonar: Ranging;
    type Proximity: Proximity;
    type Remote: RemoteSource;
}

/// Everything tasks and states act on: facades plus the event queue
pub struct Io<P: Platform> {
    pub clock: P::Clock,
    pub movement: Movement<P::Motors>,
    pub imu: P::Imu,
    pub sonar: P::Sonar,
    pub proximity: P::Proximity,
    pub remote: P::Remote,
    pub events: EventQueue,
}

impl<P: Platform> Io<P> {
    pub fn new(
        clock: P::Clock,
        motors: P::Motors,
        imu: P::Imu,
        sonar: P::Sonar,
        proximity: P::Proximity,
        remote: P::Remote,
    ) -> Self {
        Self {
            clock,
            movement: Movement::new(motors),
            imu,
            sonar,
            proximity,
            remote,
            events: EventQueue::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_sign_selects_direction() {
        assert_eq!(Direction::from_angle(-30), Direction::Right);
        assert_eq!(Direction::from_angle(45), Direction::Left);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn zones_are_ordered() {
        assert!(DANGER_DISTANCE < DETECT_DISTANCE);
        assert!(DETECT_DISTANCE < CLEAR_DISTANCE);
    }
}
