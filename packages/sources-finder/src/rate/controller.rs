//! Pacing of outbound searches and page fetches.
//!
//! Searches get a uniform random pause so there is no fixed request
//! cadence; page fetches are spaced by a governor rate limiter. Both sit
//! behind the circuit breaker check.

use governor::{Quota, RateLimiter};
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::breaker::{CircuitBreaker, Gate};
use super::clock::Clock;
use crate::error::Result;
use crate::traits::store::MarkerStore;
use crate::types::config::FinderConfig;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Paces requests and consults the circuit breaker before each search.
#[derive(Clone)]
pub struct RateController {
    breaker: CircuitBreaker,
    max_jitter: Duration,
    fetch_limiter: Arc<DefaultRateLimiter>,
}

impl RateController {
    /// Create a controller.
    ///
    /// # Arguments
    /// * `breaker` - Circuit breaker guarding the search provider
    /// * `max_jitter` - Upper bound of the pre-search pause
    /// * `fetch_requests_per_second` - Page fetch rate (0 is treated as 1)
    pub fn new(breaker: CircuitBreaker, max_jitter: Duration, fetch_requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(fetch_requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            breaker,
            max_jitter,
            fetch_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Build a breaker and controller from the finder configuration.
    pub fn from_config(markers: Arc<dyn MarkerStore>, clock: Arc<dyn Clock>, config: &FinderConfig) -> Self {
        let breaker = CircuitBreaker::new(markers, clock, config.breaker_cooldown());
        Self::new(breaker, config.max_search_jitter(), config.fetch_requests_per_second)
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Check the breaker without pausing.
    pub async fn check(&self) -> Result<Gate> {
        self.breaker.allow().await
    }

    /// Gate a search attempt.
    ///
    /// Returns `Blocked` straight away if the breaker is active; otherwise
    /// sleeps for a random jitter and returns `Allow`.
    pub async fn before_attempt<R: Rng>(&self, rng: &mut R) -> Result<Gate> {
        let gate = self.breaker.allow().await?;
        if let Gate::Blocked { .. } = gate {
            return Ok(gate);
        }

        let delay = self.jitter(rng);
        debug!(delay_ms = delay.as_millis() as u64, "pausing before search");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Gate::Allow)
    }

    /// Draw a uniform random pause in `[0, max_jitter]`.
    pub fn jitter<R: Rng>(&self, rng: &mut R) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(0..=max_ms))
    }

    /// Record that the provider blocked us.
    pub async fn record_blocked(&self, reason: impl Into<String>) -> Result<()> {
        self.breaker.trip(reason).await
    }

    /// Wait for a page-fetch permit.
    pub async fn before_fetch(&self) {
        self.fetch_limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::breaker::BreakerMarker;
    use crate::stores::MemoryMarkerStore;
    use crate::testing::ManualClock;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn controller(max_jitter: Duration) -> (Arc<MemoryMarkerStore>, Arc<ManualClock>, RateController) {
        let store = Arc::new(MemoryMarkerStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let breaker = CircuitBreaker::new(store.clone(), clock.clone(), Duration::from_secs(9 * 3600));
        (store, clock, RateController::new(breaker, max_jitter, 10))
    }

    #[test]
    fn test_jitter_within_bounds() {
        let (_, _, rc) = controller(Duration::from_secs(100));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            assert!(rc.jitter(&mut rng) <= Duration::from_secs(100));
        }
    }

    #[test]
    fn test_zero_jitter() {
        let (_, _, rc) = controller(Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rc.jitter(&mut rng), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_blocked_marker_short_circuits() {
        let (store, clock, rc) = controller(Duration::from_secs(100));
        store.set(BreakerMarker::new(clock.now() - chrono::Duration::hours(1)));

        let mut rng = StdRng::seed_from_u64(1);
        let gate = rc.before_attempt(&mut rng).await.unwrap();
        assert!(matches!(gate, Gate::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_expired_marker_allows_and_clears() {
        let (store, clock, rc) = controller(Duration::ZERO);
        store.set(BreakerMarker::new(clock.now() - chrono::Duration::hours(10)));

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rc.before_attempt(&mut rng).await.unwrap(), Gate::Allow);
        assert!(store.marker().is_none());
    }

    #[tokio::test]
    async fn test_from_config() {
        let store = Arc::new(MemoryMarkerStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = FinderConfig::default().with_max_search_jitter_secs(5);
        let rc = RateController::from_config(store, clock, &config);
        assert_eq!(rc.breaker().cooldown(), Duration::from_secs(9 * 3600));

        let mut rng = StdRng::seed_from_u64(3);
        assert!(rc.jitter(&mut rng) <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_record_blocked_trips_breaker() {
        let (store, _, rc) = controller(Duration::ZERO);
        rc.record_blocked("HTTP 429").await.unwrap();
        assert!(store.marker().is_some());
        assert!(!rc.check().await.unwrap().is_allowed());
    }
}
