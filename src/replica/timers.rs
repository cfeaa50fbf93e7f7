use rand::Rng;
use std::ops::RangeInclusive;
use tokio::time::{Duration, Instant};

/// ElectionTimer is the follower's countdown to starting an election. Each reset picks a fresh
/// random deadline from the configured range.
pub(crate) struct ElectionTimer {
    timeout_range: RangeInclusive<Duration>,
    deadline: Instant,
}

impl ElectionTimer {
    pub(crate) fn new(min_timeout: Duration, max_timeout: Duration) -> Self {
        let timeout_range = RangeInclusive::new(min_timeout, max_timeout);
        let deadline = Self::random_deadline(&timeout_range);

        ElectionTimer {
            timeout_range,
            deadline,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.deadline = Self::random_deadline(&self.timeout_range);
    }

    /// Cancel safe. Resolves once the current deadline has passed.
    pub(crate) async fn elapsed(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }

    fn random_deadline(timeout_range: &RangeInclusive<Duration>) -> Instant {
        let rand_timeout = rand::thread_rng().gen_range(timeout_range.clone());
        Instant::now() + rand_timeout
    }
}

/// HeartbeatTimer paces the leader's heartbeat rounds.
pub(crate) struct HeartbeatTimer {
    interval: Duration,
    deadline: Instant,
}

impl HeartbeatTimer {
    pub(crate) fn new(interval: Duration) -> Self {
        HeartbeatTimer {
            interval,
            deadline: Instant::now() + interval,
        }
    }

    /// A newly elected leader announces itself right away.
    pub(crate) fn fire_now(&mut self) {
        self.deadline = Instant::now();
    }

    pub(crate) fn reschedule(&mut self) {
        self.deadline = Instant::now() + self.interval;
    }

    pub(crate) async fn elapsed(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}
