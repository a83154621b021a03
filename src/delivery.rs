//! Outbound delivery: rate-limited, size-bounded message sending.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{error, info};

use crate::response::Response;
use crate::transport::Messenger;

/// A token bucket: `capacity` tokens, one regained every `refill`. One token
/// is spent per outbound message. Waiting callers that are dropped (request
/// cancelled) never spend their token.
pub struct RateLimiter {
    capacity: u32,
    refill: Duration,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill: Duration) -> Self {
        RateLimiter {
            capacity,
            refill,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for a refill if the bucket is empty.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();

                let elapsed = state.last_refill.elapsed();
                if !self.refill.is_zero() {
                    // Clamped so that arbitrarily long idle periods cannot
                    // overflow the token math.
                    let regained = u32::try_from(elapsed.as_nanos() / self.refill.as_nanos())
                        .unwrap_or(u32::MAX);
                    if regained > 0 {
                        state.tokens = state.tokens.saturating_add(regained).min(self.capacity);
                        state.last_refill += self.refill.saturating_mul(regained);
                    }
                }

                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }

                self.refill.saturating_sub(state.last_refill.elapsed())
            };

            tokio::time::sleep(wait).await;
        }
    }
}

/// Sends a response as one or more bounded messages through the transport.
pub struct Delivery {
    messenger: Arc<dyn Messenger>,
    limiter: RateLimiter,
}

impl Delivery {
    pub fn new(messenger: Arc<dyn Messenger>, limiter: RateLimiter) -> Self {
        Delivery { messenger, limiter }
    }

    /// Deliver every chunk of the response in order. A failed send aborts
    /// the remaining chunks; dropping the future while rate-limited does
    /// the same.
    pub async fn deliver(&self, channel: &str, response: &Response) {
        let chunks = response.split();
        if chunks.is_empty() {
            return;
        }

        info!(channel, count = chunks.len(), "sending message split");

        for chunk in &chunks {
            self.limiter.acquire().await;
            if let Err(err) = self.messenger.send_message(channel, chunk).await {
                error!(channel, error = %err, "could not send message");
                return;
            }
        }
    }
}
