//! Monotonic clock backed by the embassy time driver, with the RP2350 watchdog

use embassy_rp::watchdog::Watchdog;
use embassy_time::{Duration, Instant};
use tank_robot::system::hardware::Clock;

use super::resources::WatchdogResources;

/// The control loop must feed the watchdog at least this often
const WATCHDOG_PERIOD: Duration = Duration::from_millis(500);

pub struct WatchdogClock {
    watchdog: Watchdog,
}

impl WatchdogClock {
    pub fn new(r: WatchdogResources) -> Self {
        let mut watchdog = Watchdog::new(r.watchdog);
        watchdog.start(WATCHDOG_PERIOD);
        Self { watchdog }
    }
}

impl Clock for WatchdogClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn feed_watchdog(&mut self) {
        self.watchdog.feed();
    }
}
