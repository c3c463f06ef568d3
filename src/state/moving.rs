//! Moving
//!
//! Autonomous cruising. The sonar watches ahead, the proximity and step sensors
//! watch the flanks and the floor, and the course controller keeps the robot
//! straight. When the sonar reports an obstacle the robot scans and picks the
//! most open side with [`determine_new_direction`].

use crate::state::remote_override;
use crate::system::event::{Event, EventId, Payload};
use crate::system::hardware::{Direction, Platform, CLEAR_DISTANCE};
use crate::system::lifecycle::Lifecycle;
use crate::system::scheduler::TaskId;
use crate::system::state::{Behavior, Context, StateId};
use crate::task::scan_sonar::{ScanRecord, SonarMode};

const TASKS: &[TaskId] = &[
    TaskId::ScanSonar,
    TaskId::StepDetection,
    TaskId::NearObstacleDetection,
    TaskId::CorrectCourse,
    TaskId::Spin,
];

/// Area difference, relative to the larger side, that counts as significant
pub const AREA_RATIO_THRESHOLD: f32 = 0.1;

/// Angle of the remote-controlled search spin
pub const SEARCH_SPIN_ANGLE: i16 = 360;

/// Outcome of [`determine_new_direction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NewDirection {
    /// Spin by this many degrees, negative to the right
    Spin(i16),
    /// Boxed in, turn around
    Reverse,
}

/// Picks an escape heading from a finished scan
///
/// The side with clearly more open area wins. If the areas are close, the side
/// with the longer single ping wins as long as that ping reaches
/// [`CLEAR_DISTANCE`]. Otherwise the robot is boxed in.
pub fn determine_new_direction(record: &ScanRecord) -> NewDirection {
    let left = record.left_area;
    let right = record.right_area;
    let larger = left.max(right);
    let ratio = if larger == 0 {
        0.0
    } else {
        (left as f32 - right as f32) / larger as f32
    };

    if libm::fabsf(ratio) > AREA_RATIO_THRESHOLD {
        return if left > right {
            NewDirection::Spin(record.left_best_angle)
        } else {
            NewDirection::Spin(record.right_best_angle)
        };
    }

    let left_ping = record.left_best_ping;
    let right_ping = record.right_best_ping;
    if left_ping > right_ping && left_ping >= CLEAR_DISTANCE {
        NewDirection::Spin(record.left_best_angle)
    } else if right_ping > left_ping && right_ping >= CLEAR_DISTANCE {
        NewDirection::Spin(record.right_best_angle)
    } else {
        NewDirection::Reverse
    }
}

/// What the robot is doing on top of cruising
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Maneuver {
    None,
    /// Steering away from a flank obstacle
    Turning,
    /// Remote-controlled spin in place
    SearchSpin,
    /// Spin toward the heading picked after a scan
    HeadingSpin,
    /// Stopped in front of an obstacle, waiting for the scan
    Scanning,
}

pub struct Moving {
    lifecycle: Lifecycle,
    maneuver: Maneuver,
}

impl Moving {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            maneuver: Maneuver::None,
        }
    }

    fn is_spinning(&self) -> bool {
        matches!(self.maneuver, Maneuver::SearchSpin | Maneuver::HeadingSpin)
    }

    /// Re-arms the flank watch and the course controller
    fn reset<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        self.maneuver = Maneuver::None;
        cx.tasks.resume(TaskId::CorrectCourse, cx.io);
        cx.tasks.resume(TaskId::NearObstacleDetection, cx.io);
    }

    fn go_forward<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        self.reset(cx);
        cx.io.movement.go_forward();
    }

    /// Continues at the speed the robot had before the maneuver
    fn resume_forward<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        self.reset(cx);
        if cx.io.movement.current_speed() > 0 {
            cx.io.movement.go();
        } else {
            cx.io.movement.go_forward();
        }
    }

    fn turn<P: Platform>(&mut self, direction: Direction, cx: &mut Context<'_, P>) {
        self.maneuver = Maneuver::Turning;
        cx.tasks.suspend(TaskId::CorrectCourse, cx.io);
        cx.io.movement.turn(direction);
    }

    fn spin<P: Platform>(&mut self, maneuver: Maneuver, angle: i16, cx: &mut Context<'_, P>) {
        self.maneuver = maneuver;
        cx.tasks.suspend(TaskId::CorrectCourse, cx.io);
        cx.tasks.spin.start(angle, cx.io);
    }

    /// Zone reports made during the spin were dropped, so the sonar starts over
    fn end_spin<P: Platform>(&mut self, cx: &mut Context<'_, P>) {
        cx.tasks.scan_sonar.set_mode(SonarMode::PingAhead, cx.io);
        self.resume_forward(cx);
    }

    fn scan_complete<P: Platform>(
        &mut self,
        record: &ScanRecord,
        cx: &mut Context<'_, P>,
    ) -> Option<StateId> {
        let choice = determine_new_direction(record);
        info!(
            "moving: left={} right={} -> {}",
            record.left_area,
            record.right_area,
            choice
        );
        match choice {
            NewDirection::Spin(angle) => {
                cx.io.movement.go_forward();
                self.spin(Maneuver::HeadingSpin, angle, cx);
                None
            }
            NewDirection::Reverse => Some(StateId::ReversingDirection),
        }
    }
}

impl Default for Moving {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Moving {
    fn name(&self) -> &'static str {
        "moving"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    fn state_changing<P: Platform>(&mut self, change: Lifecycle, cx: &mut Context<'_, P>) {
        match change {
            Lifecycle::Resuming => {
                cx.tasks.set_task_list(TASKS, cx.io);
                // Installed for spins, started on demand
                cx.tasks.suspend(TaskId::Spin, cx.io);
                self.go_forward(cx);
            }
            Lifecycle::Suspending => {
                self.maneuver = Maneuver::None;
                cx.tasks.suspend_all(TASKS, cx.io);
            }
            _ => {}
        }
    }

    fn on_event<P: Platform>(&mut self, event: &Event, cx: &mut Context<'_, P>) -> Option<StateId> {
        if let Some(next) = remote_override(event) {
            return Some(next);
        }

        match event.id {
            EventId::STEP_DETECTED | EventId::PROXIMITY_BLOCKED => {
                Some(StateId::ReversingDirection)
            }

            EventId::SPIN_COMPLETE => {
                self.end_spin(cx);
                None
            }
            EventId::SPIN_ABORT => match self.maneuver {
                Maneuver::HeadingSpin => {
                    warn!("moving: heading spin failed");
                    Some(StateId::Stopped)
                }
                Maneuver::SearchSpin => Some(StateId::ReversingDirection),
                // Left over from a spin that already ended
                Maneuver::None | Maneuver::Turning | Maneuver::Scanning => None,
            },

            EventId::CMD_TURN_BEGIN => {
                let Payload::Direction(direction) = event.payload else {
                    return None;
                };
                let angle = match direction {
                    Direction::Left => SEARCH_SPIN_ANGLE,
                    Direction::Right => -SEARCH_SPIN_ANGLE,
                };
                cx.tasks.suspend(TaskId::NearObstacleDetection, cx.io);
                self.spin(Maneuver::SearchSpin, angle, cx);
                None
            }
            EventId::CMD_TURN_END => {
                if self.maneuver == Maneuver::SearchSpin {
                    cx.tasks.suspend(TaskId::Spin, cx.io);
                    self.end_spin(cx);
                }
                None
            }

            // Sensor reports are stale while the robot spins on purpose
            _ if self.is_spinning() => None,

            EventId::PROXIMITY_FRONT => Some(StateId::BackupToAvoidObstacle),

            // No steering while stopped for a scan
            EventId::PROXIMITY_LEFT | EventId::PROXIMITY_RIGHT | EventId::PROXIMITY_CLEAR
                if self.maneuver == Maneuver::Scanning =>
            {
                None
            }
            EventId::PROXIMITY_LEFT => {
                self.turn(Direction::Right, cx);
                None
            }
            EventId::PROXIMITY_RIGHT => {
                self.turn(Direction::Left, cx);
                None
            }
            EventId::PROXIMITY_CLEAR => {
                if self.maneuver == Maneuver::Turning {
                    self.resume_forward(cx);
                }
                None
            }

            // Obstacles ahead end any flank steering
            EventId::OBSTACLE_DANGER => {
                self.reset(cx);
                self.maneuver = Maneuver::Scanning;
                cx.io.movement.stop();
                cx.tasks.scan_sonar.set_mode(SonarMode::Scan, cx.io);
                None
            }
            EventId::OBSTACLE_DETECTED => {
                self.reset(cx);
                cx.io.movement.go_slow();
                cx.tasks.scan_sonar.set_mode(SonarMode::Scan, cx.io);
                None
            }
            EventId::OBSTACLE_NONE => {
                self.go_forward(cx);
                None
            }
            EventId::SCAN_COMPLETE => match event.payload {
                Payload::Scan(record) => self.scan_complete(&record, cx),
                _ => None,
            },

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::movement::{CRUISE_SPEED, SLOW_SPEED};
    use crate::task::scan_sonar::CONFIRM_SAMPLES;
    use crate::task::Task;
    use crate::testing::robot_in;

    fn record(left_area: u32, right_area: u32, left_ping: u16, right_ping: u16) -> ScanRecord {
        ScanRecord {
            left_area,
            right_area,
            left_best_ping: left_ping,
            left_best_angle: 30,
            right_best_ping: right_ping,
            right_best_angle: -20,
        }
    }

    #[test]
    fn larger_area_wins_when_significant() {
        assert_eq!(
            determine_new_direction(&record(1000, 500, 90, 150)),
            NewDirection::Spin(30)
        );
        assert_eq!(
            determine_new_direction(&record(400, 1000, 150, 90)),
            NewDirection::Spin(-20)
        );
    }

    #[test]
    fn close_areas_fall_back_to_longest_ping() {
        // ratio ~0.038, the right side has the longer clear ping
        assert_eq!(
            determine_new_direction(&record(520, 500, 90, 120)),
            NewDirection::Spin(-20)
        );
        assert_eq!(
            determine_new_direction(&record(520, 500, 100, 99)),
            NewDirection::Spin(30)
        );
    }

    #[test]
    fn boxed_in_reverses() {
        assert_eq!(
            determine_new_direction(&record(600, 600, 80, 70)),
            NewDirection::Reverse
        );
        assert_eq!(
            determine_new_direction(&record(0, 0, 0, 0)),
            NewDirection::Reverse
        );
        // Equal long pings pick neither side
        assert_eq!(
            determine_new_direction(&record(600, 600, 150, 150)),
            NewDirection::Reverse
        );
    }

    #[test]
    fn resumes_with_its_tasks() {
        let (bench, robot) = robot_in(StateId::Moving);
        let tasks = robot.tasks();
        assert!(tasks.scan_sonar.is_active());
        assert!(tasks.step_detection.is_active());
        assert!(tasks.near_obstacle_detection.is_active());
        assert!(tasks.correct_course.is_active());
        assert!(!tasks.spin.is_active());
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, CRUISE_SPEED));
    }

    #[test]
    fn danger_stops_and_scans() {
        let (bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::new(EventId::OBSTACLE_DANGER));
        assert_eq!(bench.motors.speeds(), (0, 0));
        assert_eq!(robot.tasks().scan_sonar.mode(), SonarMode::Scan);

        let (bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::new(EventId::OBSTACLE_DETECTED));
        assert_eq!(bench.motors.speeds(), (SLOW_SPEED, SLOW_SPEED));
        assert_eq!(robot.tasks().scan_sonar.mode(), SonarMode::Scan);
    }

    #[test]
    fn scan_result_starts_heading_spin() {
        let (bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::with(
            EventId::SCAN_COMPLETE,
            Payload::Scan(record(1000, 500, 90, 150)),
        ));

        assert!(robot.tasks().spin.is_active());
        assert!(!robot.tasks().correct_course.is_active());
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, CRUISE_SPEED));

        // Obstacle reports during the spin are ignored
        robot.dispatch(Event::new(EventId::OBSTACLE_DANGER));
        assert_eq!(robot.tasks().scan_sonar.mode(), SonarMode::PingAhead);

        robot.dispatch(Event::new(EventId::SPIN_ABORT));
        assert_eq!(robot.current_state(), Some(StateId::Stopped));
    }

    #[test]
    fn boxed_in_scan_reverses() {
        let (_bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::with(
            EventId::SCAN_COMPLETE,
            Payload::Scan(record(500, 500, 50, 50)),
        ));
        assert_eq!(robot.current_state(), Some(StateId::ReversingDirection));
    }

    #[test]
    fn flank_obstacle_steers_away_until_clear() {
        let (bench, mut robot) = robot_in(StateId::Moving);

        robot.dispatch(Event::new(EventId::PROXIMITY_LEFT));
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, 0));
        assert!(!robot.tasks().correct_course.is_active());

        robot.dispatch(Event::new(EventId::PROXIMITY_CLEAR));
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, CRUISE_SPEED));
        assert!(robot.tasks().correct_course.is_active());
    }

    #[test]
    fn hazards_leave_moving() {
        for (id, next) in [
            (EventId::STEP_DETECTED, StateId::ReversingDirection),
            (EventId::PROXIMITY_BLOCKED, StateId::ReversingDirection),
            (EventId::PROXIMITY_FRONT, StateId::BackupToAvoidObstacle),
            (EventId::CMD_STOP, StateId::Stopped),
            (EventId::CMD_BACKUP_BEGIN, StateId::Backing),
        ] {
            let (_bench, mut robot) = robot_in(StateId::Moving);
            robot.dispatch(Event::new(id));
            assert_eq!(robot.current_state(), Some(next));
            assert!(!robot.tasks().scan_sonar.is_active());
        }
    }

    #[test]
    fn remote_search_spin() {
        let (bench, mut robot) = robot_in(StateId::Moving);

        robot.dispatch(Event::with(
            EventId::CMD_TURN_BEGIN,
            Payload::Direction(Direction::Right),
        ));
        assert!(robot.tasks().spin.is_active());
        assert!(!robot.tasks().near_obstacle_detection.is_active());
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, -CRUISE_SPEED));

        robot.dispatch(Event::new(EventId::CMD_TURN_END));
        assert!(!robot.tasks().spin.is_active());
        assert!(robot.tasks().near_obstacle_detection.is_active());
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, CRUISE_SPEED));
        assert_eq!(robot.current_state(), Some(StateId::Moving));
    }

    #[test]
    fn danger_during_flank_steering_still_stops() {
        let (bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::new(EventId::PROXIMITY_LEFT));
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, 0));

        bench.sonar.set_distance(Some(20));
        for _ in 0..CONFIRM_SAMPLES {
            robot.tick();
        }
        assert_eq!(bench.motors.speeds(), (0, 0));
        assert_eq!(robot.tasks().scan_sonar.mode(), SonarMode::Scan);

        // Clearing the flank does not drive into the wall
        robot.dispatch(Event::new(EventId::PROXIMITY_CLEAR));
        assert_eq!(bench.motors.speeds(), (0, 0));
        assert_eq!(robot.current_state(), Some(StateId::Moving));
    }

    #[test]
    fn scan_result_during_flank_steering_is_used() {
        let (bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::new(EventId::PROXIMITY_RIGHT));
        robot.dispatch(Event::with(
            EventId::SCAN_COMPLETE,
            Payload::Scan(record(1000, 500, 90, 150)),
        ));
        assert!(robot.tasks().spin.is_active());
        assert_eq!(bench.motors.speeds(), (-CRUISE_SPEED, CRUISE_SPEED));
    }

    #[test]
    fn abort_after_search_spin_ended_is_ignored() {
        let (bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::with(
            EventId::CMD_TURN_BEGIN,
            Payload::Direction(Direction::Left),
        ));
        robot.dispatch(Event::new(EventId::CMD_TURN_END));
        robot.dispatch(Event::new(EventId::SPIN_ABORT));
        assert_eq!(robot.current_state(), Some(StateId::Moving));
        assert_eq!(bench.motors.speeds(), (CRUISE_SPEED, CRUISE_SPEED));
    }

    #[test]
    fn search_spin_abort_reverses() {
        let (_bench, mut robot) = robot_in(StateId::Moving);
        robot.dispatch(Event::with(
            EventId::CMD_TURN_BEGIN,
            Payload::Direction(Direction::Left),
        ));
        robot.dispatch(Event::new(EventId::SPIN_ABORT));
        assert_eq!(robot.current_state(), Some(StateId::ReversingDirection));
    }
}
