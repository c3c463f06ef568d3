//! Lifecycle shared by every task and behavior state
//!
//! `Resuming` and `Suspending` are transient: the unit's transition callback runs
//! while it is in one of them, then the unit settles into `Active` or `Inactive`.

/// Activity of a task or behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lifecycle {
    #[default]
    Inactive,
    Resuming,
    Active,
    Suspending,
}

impl Lifecycle {
    /// `Active` or on the way there
    pub fn is_running(self) -> bool {
        matches!(self, Lifecycle::Active | Lifecycle::Resuming)
    }

    /// Only active units are polled
    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }

    /// Transient state to pass through when resuming, or `None` if already running
    pub fn resuming(self) -> Option<Lifecycle> {
        (!self.is_running()).then_some(Lifecycle::Resuming)
    }

    /// Transient state to pass through when suspending, or `None` if already stopped
    pub fn suspending(self) -> Option<Lifecycle> {
        self.is_running().then_some(Lifecycle::Suspending)
    }

    /// Settled state at the end of a transition
    pub fn settled(self) -> Lifecycle {
        match self {
            Lifecycle::Resuming | Lifecycle::Active => Lifecycle::Active,
            Lifecycle::Suspending | Lifecycle::Inactive => Lifecycle::Inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_is_noop_when_running() {
        assert_eq!(Lifecycle::Inactive.resuming(), Some(Lifecycle::Resuming));
        assert_eq!(Lifecycle::Active.resuming(), None);
        assert_eq!(Lifecycle::Resuming.resuming(), None);
    }

    #[test]
    fn suspend_is_noop_when_stopped() {
        assert_eq!(Lifecycle::Active.suspending(), Some(Lifecycle::Suspending));
        assert_eq!(Lifecycle::Inactive.suspending(), None);
        assert_eq!(Lifecycle::Suspending.suspending(), None);
    }

    #[test]
    fn transients_settle() {
        assert_eq!(Lifecycle::Resuming.settled(), Lifecycle::Active);
        assert_eq!(Lifecycle::Suspending.settled(), Lifecycle::Inactive);
        assert!(!Lifecycle::Resuming.is_active());
    }
}
