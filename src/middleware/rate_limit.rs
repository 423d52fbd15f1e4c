//! In-memory sliding-window limiter for login attempts.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const MAX_LOGIN_ATTEMPTS: usize = 5;
pub const LOGIN_LOCKOUT_SECS: u64 = 15 * 60;

#[derive(Clone)]
pub struct RateLimiter {
    attempts: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn for_logins() -> Self {
        Self::new(MAX_LOGIN_ATTEMPTS, LOGIN_LOCKOUT_SECS)
    }

    /// Records an attempt for `identifier` and reports whether it is allowed.
    pub async fn check(&self, identifier: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;

        let history = attempts.entry(identifier.to_string()).or_default();
        history.retain(|&at| now.duration_since(at) < self.window);

        if history.len() < self.max_attempts {
            history.push(now);
            true
        } else {
            false
        }
    }

    /// Forgets `identifier`, e.g. after a successful login.
    pub async fn reset(&self, identifier: &str) {
        self.attempts.write().await.remove(identifier);
    }

    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;

        attempts.retain(|_, history| {
            history.retain(|&at| now.duration_since(at) < self.window);
            !history.is_empty()
        });

        tracing::debug!("Rate limiter cleanup: {} active identifiers", attempts.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_the_limit() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check("admin").await);
        assert!(limiter.check("admin").await);
        assert!(limiter.check("admin").await);
        assert!(!limiter.check("admin").await);

        assert!(limiter.check("manager").await);

        limiter.reset("admin").await;
        assert!(limiter.check("admin").await);
    }

    #[tokio::test]
    async fn cleanup_drops_expired_entries() {
        let limiter = RateLimiter::new(5, 1);

        limiter.check("admin").await;
        limiter.check("sales1").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.cleanup().await;

        assert!(limiter.attempts.read().await.is_empty());
    }
}
