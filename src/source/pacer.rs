//! Request pacing for a single remote endpoint
//!
//! Every request first waits for its slot: slots are handed out at least
//! `min_delay` apart, in the order callers ask for them. An HTTP 429 pushes
//! the next free slot past the server's cooldown, so every in-flight caller
//! backs off together rather than only the one that was refused.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out requests and honors rate-limit cooldowns
#[derive(Debug)]
pub struct RequestPacer {
    min_delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Creates a pacer
    ///
    /// # Arguments
    ///
    /// * `min_delay` - Minimum time between the start of two requests
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until a request may be sent, and books the slot after it
    pub async fn wait_turn(&self) {
        let start = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = next_slot.map_or(now, |slot| slot.max(now));
            *next_slot = Some(start + self.min_delay);
            start
        };

        if start > Instant::now() {
            tracing::trace!("Pacing request for {:?}", start - Instant::now());
            tokio::time::sleep_until(start).await;
        }
    }

    /// Holds every request back for `cooldown` from now
    pub async fn mark_rate_limited(&self, cooldown: Duration) {
        let mut next_slot = self.next_slot.lock().await;
        let resume = Instant::now() + cooldown;
        if next_slot.map_or(true, |slot| slot < resume) {
            tracing::warn!("Rate limited, pausing requests for {:?}", cooldown);
            *next_slot = Some(resume);
        }
    }
}
