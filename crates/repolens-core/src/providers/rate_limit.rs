//! Rolling-window request budget

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Grants at most `capacity` permits within any rolling window of `window`.
///
/// Grant times are kept in a log; a caller that finds the window full sleeps
/// until the oldest grant leaves it, then re-checks.
#[derive(Debug)]
pub struct RateBudget {
    capacity: usize,
    window: Duration,
    granted: Mutex<VecDeque<Instant>>,
}

impl RateBudget {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            granted: Mutex::new(VecDeque::new()),
        }
    }

    /// Acquire one permit, suspending until capacity frees up
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut granted = self.granted.lock().await;
                let now = Instant::now();
                self.expire(&mut granted, now);

                if granted.len() < self.capacity {
                    granted.push_back(now);
                    return;
                }

                match granted.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            tracing::trace!("Rate budget exhausted, waiting {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Acquire a permit only if one is free right now
    pub async fn try_acquire(&self) -> bool {
        let mut granted = self.granted.lock().await;
        let now = Instant::now();
        self.expire(&mut granted, now);
        if granted.len() < self.capacity {
            granted.push_back(now);
            true
        } else {
            false
        }
    }

    /// Permits still available in the current window
    pub async fn available(&self) -> usize {
        let mut granted = self.granted.lock().await;
        self.expire(&mut granted, Instant::now());
        self.capacity - granted.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn expire(&self, granted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = granted.front() {
            if now.duration_since(*oldest) >= self.window {
                granted.pop_front();
            } else {
                break;
            }
        }
    }
}
