use std::time::Duration;

use tokio::time::Instant;

/// One-shot expiry deadline for the local typing state.
///
/// Re-arming replaces the deadline, so there is never more than one pending.
#[derive(Debug, Clone)]
pub(crate) struct ExpiryTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl ExpiryTimer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub(crate) fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub(crate) fn clear(&mut self) {
        self.deadline = None;
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_moves_deadline() {
        let now = Instant::now();
        let mut timer = ExpiryTimer::new(Duration::from_secs(3));
        timer.arm(now);
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(3)));

        timer.arm(now + Duration::from_secs(2));
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(5)));
        assert!(!timer.is_due(now + Duration::from_secs(4)));
        assert!(timer.is_due(now + Duration::from_secs(5)));
    }

    #[test]
    fn cleared_timer_is_never_due() {
        let now = Instant::now();
        let mut timer = ExpiryTimer::new(Duration::from_secs(3));
        timer.arm(now);
        timer.clear();
        assert!(timer.deadline().is_none());
        assert!(!timer.is_due(now + Duration::from_secs(60)));
    }
}
