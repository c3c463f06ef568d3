//! Movement
//!
//! Speed bookkeeping on top of the raw [`Motors`] facade. Every drive command in the
//! navigation core goes through here so the current speed, the moving flag and the
//! motor enable switch stay consistent.

use crate::system::hardware::{Direction, Motors};

/// Full scale motor speed
pub const MAX_SPEED: i16 = 255;

/// Default forward speed
pub const CRUISE_SPEED: i16 = 200;

/// Reduced speed used near obstacles
pub const SLOW_SPEED: i16 = 120;

pub struct Movement<M: Motors> {
    motors: M,
    current_speed: i16,
    is_moving: bool,
    going_slow: bool,
    motors_enabled: bool,
}

impl<M: Motors> Movement<M> {
    pub fn new(motors: M) -> Self {
        Self {
            motors,
            current_speed: 0,
            is_moving: false,
            going_slow: false,
            motors_enabled: true,
        }
    }

    /// Stops both motors; the last speed is remembered for `go`
    pub fn stop(&mut self) {
        debug!("movement: stop");
        self.is_moving = false;
        self.drive(0, 0);
    }

    /// Drives straight at the remembered speed
    pub fn go(&mut self) {
        self.is_moving = self.current_speed != 0;
        self.drive(self.current_speed, self.current_speed);
    }

    /// Drives straight at `speed`, clamped to the motor range
    pub fn go_at(&mut self, speed: i16) {
        let speed = speed.clamp(-MAX_SPEED, MAX_SPEED);
        self.current_speed = speed;
        self.going_slow = speed > 0 && speed <= SLOW_SPEED;
        debug!("movement: go {}", speed);
        self.go();
    }

    pub fn go_forward(&mut self) {
        self.go_at(CRUISE_SPEED);
    }

    pub fn go_slow(&mut self) {
        self.go_at(SLOW_SPEED);
    }

    pub fn go_backward(&mut self) {
        self.go_at(-CRUISE_SPEED);
    }

    /// Differential turn: the inner track stops, the outer keeps the current speed
    pub fn turn(&mut self, direction: Direction) {
        let speed = self.current_speed;
        debug!("movement: turn {} at {}", direction, speed);
        match direction {
            Direction::Right => self.drive(speed, 0),
            Direction::Left => self.drive(0, speed),
        }
    }

    /// Rotation in place at cruise speed
    pub fn spin(&mut self, direction: Direction) {
        debug!("movement: spin {}", direction);
        match direction {
            Direction::Right => self.drive(CRUISE_SPEED, -CRUISE_SPEED),
            Direction::Left => self.drive(-CRUISE_SPEED, CRUISE_SPEED),
        }
    }

    /// Offsets one track from the current speed
    pub fn trim(&mut self, side: Direction, delta: i16) {
        if !self.motors_enabled {
            return;
        }
        let speed = self
            .current_speed
            .saturating_add(delta)
            .clamp(-MAX_SPEED, MAX_SPEED);
        self.motors.set_motor(side, speed);
    }

    /// Disabling stops the motors and ignores drive commands until re-enabled
    pub fn enable_motors(&mut self, enabled: bool) {
        info!("movement: motors enabled {}", enabled);
        if !enabled {
            self.stop();
        }
        self.motors_enabled = enabled;
    }

    pub fn motors_enabled(&self) -> bool {
        self.motors_enabled
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn going_slow(&self) -> bool {
        self.going_slow
    }

    pub fn current_speed(&self) -> i16 {
        self.current_speed
    }

    /// True while driving forwards
    pub fn is_moving_forward(&self) -> bool {
        self.is_moving && self.current_speed > 0
    }

    fn drive(&mut self, left: i16, right: i16) {
        if self.motors_enabled {
            self.motors.set_motors(left, right);
        }
    }
}
