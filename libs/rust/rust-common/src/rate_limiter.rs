//! Keyed sliding-window rate limiter.
//!
//! Each client key keeps the instants of its admitted requests inside the
//! current window. A request is admitted while fewer than `max_requests`
//! instants remain after discarding those older than `window`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Rate limit decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request allowed
    Allowed,
    /// Request denied with retry-after duration
    Denied {
        /// Time until the oldest admitted request leaves the window
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub max_requests: u32,
    /// Window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(1),
        }
    }
}

impl RateLimitConfig {
    /// Set the number of requests per window.
    #[must_use]
    pub const fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Set the window duration.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Sliding-window limiter shared across request handlers.
#[derive(Debug, Clone)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Limiter configuration.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks and records a request for `client_id` at the current instant.
    pub async fn check(&self, client_id: &str) -> RateLimitDecision {
        self.check_at(client_id, Instant::now()).await
    }

    /// Checks and records a request for `client_id` at `now`.
    ///
    /// Denied requests are not recorded, so a client hammering the limiter
    /// regains access as soon as its oldest admitted request slides out.
    pub async fn check_at(&self, client_id: &str, now: Instant) -> RateLimitDecision {
        let mut clients = self.clients.lock().await;
        let hits = clients.entry(client_id.to_string()).or_default();

        while let Some(&oldest) = hits.front() {
            if now.saturating_duration_since(oldest) >= self.config.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.config.max_requests as usize {
            let retry_after = hits
                .front()
                .map(|&oldest| self.config.window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(self.config.window);
            return RateLimitDecision::Denied { retry_after };
        }

        hits.push_back(now);
        RateLimitDecision::Allowed
    }

    /// Drops clients with no requests inside the window.
    pub async fn prune(&self) {
        let now = Instant::now();
        let window = self.config.window;
        let mut clients = self.clients.lock().await;
        clients.retain(|_, hits| {
            hits.back()
                .is_some_and(|&last| now.saturating_duration_since(last) < window)
        });
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::default());
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at("127.0.0.1", now).await.is_allowed());
        }
        assert!(!limiter.check_at("127.0.0.1", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_clients_are_isolated() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::default().with_max_requests(1));
        let now = Instant::now();

        assert!(limiter.check_at("a", now).await.is_allowed());
        assert!(limiter.check_at("b", now).await.is_allowed());
        assert!(!limiter.check_at("a", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_window_slides() {
        let config = RateLimitConfig::default()
            .with_max_requests(2)
            .with_window(Duration::from_millis(100));
        let limiter = SlidingWindowLimiter::new(config);
        let start = Instant::now();

        assert!(limiter.check_at("c", start).await.is_allowed());
        assert!(limiter
            .check_at("c", start + Duration::from_millis(50))
            .await
            .is_allowed());

        let denied = limiter.check_at("c", start + Duration::from_millis(60)).await;
        assert_eq!(
            denied,
            RateLimitDecision::Denied {
                retry_after: Duration::from_millis(40)
            }
        );

        // First hit has slid out, second has not.
        assert!(limiter
            .check_at("c", start + Duration::from_millis(100))
            .await
            .is_allowed());
        assert!(!limiter
            .check_at("c", start + Duration::from_millis(120))
            .await
            .is_allowed());
    }

    #[tokio::test]
    async fn test_prune_drops_idle_clients() {
        let config = RateLimitConfig::default().with_window(Duration::from_millis(1));
        let limiter = SlidingWindowLimiter::new(config);
        let past = Instant::now() - Duration::from_millis(10);

        limiter.check_at("idle", past).await;
        assert_eq!(limiter.tracked_clients().await, 1);

        limiter.prune().await;
        assert_eq!(limiter.tracked_clients().await, 0);
    }
}
