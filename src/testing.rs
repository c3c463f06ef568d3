//! Scripted mock platform for host tests
//!
//! Every mock is a cheap handle around shared state, so a test keeps one clone to
//! script inputs and inspect outputs while the robot owns the other.

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embassy_time::{Duration, Instant};

use crate::system::event::{Event, EventId};
use crate::system::robot::Robot;
use crate::system::state::StateId;
use crate::system::hardware::{
    Clock, CommandKind, Direction, Imu, Io, Motors, Orientation, Platform, Proximity,
    ProximitySensor, Ranging, RemoteCommand, RemoteSource, Vector3,
};

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Clock = MockClock;
    type Motors = MockMotors;
    type Imu = MockImu;
    type Sonar = MockSonar;
    type Proximity = MockProximity;
    type Remote = MockRemote;
}

#[derive(Clone, Default)]
pub struct MockClock {
    micros: Rc<Cell<u64>>,
    feeds: Rc<Cell<u32>>,
}

impl MockClock {
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn advance(&self, duration: Duration) {
        self.micros.set(self.micros.get() + duration.as_micros());
    }

    pub fn feeds(&self) -> u32 {
        self.feeds.get()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }

    fn feed_watchdog(&mut self) {
        self.feeds.set(self.feeds.get() + 1);
    }
}

#[derive(Default)]
struct MotorLog {
    left: i16,
    right: i16,
    history: Vec<(i16, i16)>,
}

#[derive(Clone, Default)]
pub struct MockMotors {
    log: Rc<RefCell<MotorLog>>,
}

impl MockMotors {
    /// Last commanded (left, right) speeds
    pub fn speeds(&self) -> (i16, i16) {
        let log = self.log.borrow();
        (log.left, log.right)
    }

    /// Every command that set both motors, oldest first
    pub fn history(&self) -> Vec<(i16, i16)> {
        self.log.borrow().history.clone()
    }
}

impl Motors for MockMotors {
    fn set_motors(&mut self, left: i16, right: i16) {
        let mut log = self.log.borrow_mut();
        log.left = left;
        log.right = right;
        log.history.push((left, right));
    }

    fn set_motor(&mut self, side: Direction, speed: i16) {
        let mut log = self.log.borrow_mut();
        match side {
            Direction::Left => log.left = speed,
            Direction::Right => log.right = speed,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockImu {
    rate_z: Rc<Cell<f32>>,
}

impl MockImu {
    pub fn set_rate(&self, rate: f32) {
        self.rate_z.set(rate);
    }
}

impl Imu for MockImu {
    fn gyro_rate_z(&mut self) -> f32 {
        self.rate_z.get()
    }

    fn gyro_rates(&mut self) -> Vector3 {
        Vector3 {
            z: self.rate_z.get(),
            ..Vector3::default()
        }
    }

    fn acceleration(&mut self) -> Vector3 {
        Vector3 {
            z: 1.0,
            ..Vector3::default()
        }
    }

    fn orientation(&mut self) -> Orientation {
        Orientation::default()
    }
}

type Profile = Box<dyn Fn(i16) -> Option<u16>>;

struct SonarState {
    angle: i16,
    ready: bool,
    queued: VecDeque<Option<u16>>,
    profile: Option<Profile>,
    distance: Option<u16>,
    pings: u32,
}

#[derive(Clone)]
pub struct MockSonar {
    state: Rc<RefCell<SonarState>>,
}

impl Default for MockSonar {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(SonarState {
                angle: 0,
                ready: true,
                queued: VecDeque::new(),
                profile: None,
                distance: Some(200),
                pings: 0,
            })),
        }
    }
}

impl MockSonar {
    /// Distance returned when nothing is queued and no profile is set
    pub fn set_distance(&self, distance: Option<u16>) {
        self.state.borrow_mut().distance = distance;
    }

    /// Distance as a function of the pan angle
    pub fn set_profile(&self, profile: impl Fn(i16) -> Option<u16> + 'static) {
        self.state.borrow_mut().profile = Some(Box::new(profile));
    }

    /// Queued samples are returned before the profile or fixed distance
    pub fn queue(&self, samples: &[Option<u16>]) {
        self.state.borrow_mut().queued.extend(samples.iter().copied());
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.borrow_mut().ready = ready;
    }

    pub fn angle(&self) -> i16 {
        self.state.borrow().angle
    }

    pub fn pings(&self) -> u32 {
        self.state.borrow().pings
    }
}

impl Ranging for MockSonar {
    fn pan_to(&mut self, angle: i16) {
        self.state.borrow_mut().angle = angle;
    }

    fn ping(&mut self) -> Option<u16> {
        let mut state = self.state.borrow_mut();
        state.pings += 1;
        if let Some(sample) = state.queued.pop_front() {
            return sample;
        }
        match &state.profile {
            Some(profile) => profile(state.angle),
            None => state.distance,
        }
    }

    fn filtered_ping(&mut self) -> Option<u16> {
        self.ping()
    }

    fn ready(&self) -> bool {
        self.state.borrow().ready
    }
}

#[derive(Clone, Default)]
pub struct MockProximity {
    triggered: Rc<Cell<[bool; 4]>>,
}

impl MockProximity {
    pub fn set(&self, sensor: ProximitySensor, triggered: bool) {
        let mut all = self.triggered.get();
        all[sensor as usize] = triggered;
        self.triggered.set(all);
    }
}

impl Proximity for MockProximity {
    fn is_triggered(&mut self, sensor: ProximitySensor) -> bool {
        self.triggered.get()[sensor as usize]
    }
}

#[derive(Clone, Default)]
pub struct MockRemote {
    frames: Rc<RefCell<VecDeque<RemoteCommand>>>,
}

impl MockRemote {
    /// Queues one received frame
    pub fn push(&self, code: u32, kind: CommandKind) {
        self.frames.borrow_mut().push_back(RemoteCommand {
            kind,
            protocol: 0,
            code,
        });
    }
}

impl RemoteSource for MockRemote {
    fn read(&mut self) -> Option<RemoteCommand> {
        self.frames.borrow_mut().pop_front()
    }
}

/// Test-side handles onto every mock
#[derive(Clone, Default)]
pub struct Bench {
    pub clock: MockClock,
    pub motors: MockMotors,
    pub imu: MockImu,
    pub sonar: MockSonar,
    pub proximity: MockProximity,
    pub remote: MockRemote,
}

impl Bench {
    pub fn io(&self) -> Io<MockPlatform> {
        Io::new(
            self.clock.clone(),
            self.motors.clone(),
            self.imu.clone(),
            self.sonar.clone(),
            self.proximity.clone(),
            self.remote.clone(),
        )
    }
}

pub fn bench() -> (Bench, Io<MockPlatform>) {
    let bench = Bench::default();
    let io = bench.io();
    (bench, io)
}

/// Empties the queue and returns the pending events in order
pub fn drain_events(io: &mut Io<MockPlatform>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = io.events.pop() {
        events.push(event);
    }
    events
}

pub fn drain_ids(io: &mut Io<MockPlatform>) -> Vec<EventId> {
    drain_events(io).into_iter().map(|event| event.id).collect()
}

/// A robot on the mock platform, started in `state`
pub fn robot_in(state: StateId) -> (Bench, Robot<MockPlatform>) {
    let bench = Bench::default();
    let mut robot = Robot::new(bench.io());
    robot.start(state);
    (bench, robot)
}
