//! Spacing of requests shared by every clone of a client.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};

/// Hands out request slots that are at least `min_interval` apart.
///
/// Slots are reserved under the lock and waited for outside of it, so concurrent callers queue up
/// in the order they reserved.
#[derive(Debug, Clone)]
pub(crate) struct RateLimiter {
    min_interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Waits until the caller is allowed to send a request.
    pub(crate) async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.min_interval);
            slot
        };

        sleep_until(slot).await;
    }
}
