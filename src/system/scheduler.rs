//! Task Scheduler
//!
//! Owns one instance of every task and the task list of the current behavior
//! state. Each tick polls the active tasks of that list exactly once, in list
//! order. Tasks outside the list keep their lifecycle but are not polled.
//!
//! The IR remote task is resident: it is not part of any task list and is
//! polled every tick by the robot itself.

use crate::system::hardware::{Io, Platform};
use crate::system::lifecycle::Lifecycle;
use crate::task::backup::Backup;
use crate::task::correct_course::CorrectCourse;
use crate::task::ir_remote::IrRemote;
use crate::task::near_obstacle_detection::NearObstacleDetection;
use crate::task::rotate::Rotate;
use crate::task::scan_sonar::ScanSonar;
use crate::task::step_detection::StepDetection;
use crate::task::Task;

/// Names a task instance owned by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskId {
    ScanSonar,
    Spin,
    Turn,
    Backup,
    CorrectCourse,
    NearObstacleDetection,
    StepDetection,
    IrRemote,
}

/// Runs `$body` with `$task` bound to the instance named by `$id`
macro_rules! with_task {
    ($scheduler:expr, $id:expr, |$task:ident| $body:expr) => {
        match $id {
            TaskId::ScanSonar => {
                let $task = &mut $scheduler.scan_sonar;
                $body
            }
            TaskId::Spin => {
                let $task = &mut $scheduler.spin;
                $body
            }
            TaskId::Turn => {
                let $task = &mut $scheduler.turn;
                $body
            }
            TaskId::Backup => {
                let $task = &mut $scheduler.backup;
                $body
            }
            TaskId::CorrectCourse => {
                let $task = &mut $scheduler.correct_course;
                $body
            }
            TaskId::NearObstacleDetection => {
                let $task = &mut $scheduler.near_obstacle_detection;
                $body
            }
            TaskId::StepDetection => {
                let $task = &mut $scheduler.step_detection;
                $body
            }
            TaskId::IrRemote => {
                let $task = &mut $scheduler.ir_remote;
                $body
            }
        }
    };
}

pub struct Scheduler {
    pub scan_sonar: ScanSonar,
    pub spin: Rotate,
    pub turn: Rotate,
    pub backup: Backup,
    pub correct_course: CorrectCourse,
    pub near_obstacle_detection: NearObstacleDetection,
    pub step_detection: StepDetection,
    pub ir_remote: IrRemote,
    task_list: &'static [TaskId],
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            scan_sonar: ScanSonar::new(),
            spin: Rotate::spin(),
            turn: Rotate::turn(),
            backup: Backup::new(),
            correct_course: CorrectCourse::new(),
            near_obstacle_detection: NearObstacleDetection::new(),
            step_detection: StepDetection::new(),
            ir_remote: IrRemote::new(),
            task_list: &[],
        }
    }

    /// Replaces the task list and resumes every task in it, in order
    ///
    /// # Arguments
    ///
    /// * `tasks` - the tasks to poll from now on, possibly empty
    /// * `io` - passed to the resume callbacks
    pub fn set_task_list<P: Platform>(&mut self, tasks: &'static [TaskId], io: &mut Io<P>) {
        debug!("scheduler: task list {}", tasks);
        self.task_list = tasks;
        for &id in tasks {
            self.resume(id, io);
        }
    }

    pub fn task_list(&self) -> &'static [TaskId] {
        self.task_list
    }

    pub fn resume<P: Platform>(&mut self, id: TaskId, io: &mut Io<P>) {
        with_task!(self, id, |task| task.resume(io))
    }

    pub fn suspend<P: Platform>(&mut self, id: TaskId, io: &mut Io<P>) {
        with_task!(self, id, |task| task.suspend(io))
    }

    /// Suspends every task in `tasks`
    pub fn suspend_all<P: Platform>(&mut self, tasks: &[TaskId], io: &mut Io<P>) {
        for &id in tasks {
            self.suspend(id, io);
        }
    }

    pub fn lifecycle(&self, id: TaskId) -> Lifecycle {
        match id {
            TaskId::ScanSonar => self.scan_sonar.lifecycle(),
            TaskId::Spin => self.spin.lifecycle(),
            TaskId::Turn => self.turn.lifecycle(),
            TaskId::Backup => self.backup.lifecycle(),
            TaskId::CorrectCourse => self.correct_course.lifecycle(),
            TaskId::NearObstacleDetection => self.near_obstacle_detection.lifecycle(),
            TaskId::StepDetection => self.step_detection.lifecycle(),
            TaskId::IrRemote => self.ir_remote.lifecycle(),
        }
    }

    pub fn is_active(&self, id: TaskId) -> bool {
        self.lifecycle(id).is_active()
    }

    /// Polls every active task of the current list once
    pub fn tick<P: Platform>(&mut self, io: &mut Io<P>) {
        for &id in self.task_list {
            with_task!(self, id, |task| {
                if task.is_active() {
                    task.poll(io);
                }
            })
        }
    }

    /// Polls the resident tasks
    pub fn tick_resident<P: Platform>(&mut self, io: &mut Io<P>) {
        if self.ir_remote.is_active() {
            self.ir_remote.poll(io);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
