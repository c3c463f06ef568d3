//! IR proximity sensors
//!
//! The obstacle sensors have their output inverted in hardware, so a high level
//! means an obstacle is in range. The step sensor looks down at the floor and reads
//! low when nothing reflects, i.e. when the floor has dropped away.

use embassy_rp::gpio::{Input, Pull};
use tank_robot::system::hardware::{Proximity, ProximitySensor};

use super::resources::ProximityResources;

pub struct ProximityInputs {
    left: Input<'static>,
    front: Input<'static>,
    right: Input<'static>,
    step: Input<'static>,
}

impl ProximityInputs {
    pub fn new(r: ProximityResources) -> Self {
        // An unplugged step sensor reads as a drop
        Self {
            left: Input::new(r.left_pin, Pull::Down),
            front: Input::new(r.front_pin, Pull::Down),
            right: Input::new(r.right_pin, Pull::Down),
            step: Input::new(r.step_pin, Pull::Down),
        }
    }
}

impl Proximity for ProximityInputs {
    fn is_triggered(&mut self, sensor: ProximitySensor) -> bool {
        match sensor {
            ProximitySensor::Left => self.left.is_high(),
            ProximitySensor::Front => self.front.is_high(),
            ProximitySensor::Right => self.right.is_high(),
            ProximitySensor::Step => self.step.is_low(),
        }
    }
}
