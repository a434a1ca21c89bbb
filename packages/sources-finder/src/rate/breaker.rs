//! Circuit breaker for the search provider.
//!
//! When a search call fails in a way that suggests we've been blocked, the
//! breaker persists a marker with the time it tripped. Until the cool-down
//! has passed every check answers [`Gate::Blocked`]; the first check after
//! that removes the marker and answers [`Gate::Allow`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::error::{DiscoveryError, Result};
use crate::traits::store::MarkerStore;

/// Persisted record of a tripped breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerMarker {
    pub tripped_at: DateTime<Utc>,

    #[serde(default)]
    pub reason: Option<String>,
}

impl BreakerMarker {
    pub fn new(tripped_at: DateTime<Utc>) -> Self {
        Self {
            tripped_at,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Answer of a breaker check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allow,
    Blocked { retry_after: Duration },
}

impl Gate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Gate::Allow)
    }
}

/// Time-boxed breaker backed by a [`MarkerStore`].
#[derive(Clone)]
pub struct CircuitBreaker {
    store: Arc<dyn MarkerStore>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(store: Arc<dyn MarkerStore>, clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            store,
            clock,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Check whether searching is allowed, clearing an expired marker.
    pub async fn allow(&self) -> Result<Gate> {
        let marker = self.store.load().await.map_err(breaker_error)?;
        let Some(marker) = marker else {
            return Ok(Gate::Allow);
        };

        let now = self.clock.now();
        let elapsed = (now - marker.tripped_at).to_std().unwrap_or(Duration::ZERO);

        if elapsed < self.cooldown {
            let retry_after = self.cooldown - elapsed;
            debug!(
                tripped_at = %marker.tripped_at,
                retry_after_secs = retry_after.as_secs(),
                "circuit breaker active"
            );
            return Ok(Gate::Blocked { retry_after });
        }

        info!(tripped_at = %marker.tripped_at, "circuit breaker expired, clearing marker");
        self.store.clear().await.map_err(breaker_error)?;
        Ok(Gate::Allow)
    }

    /// Trip the breaker now.
    pub async fn trip(&self, reason: impl Into<String>) -> Result<()> {
        let marker = BreakerMarker::new(self.clock.now()).with_reason(reason);
        warn!(reason = ?marker.reason, "tripping circuit breaker");
        self.store.save(&marker).await.map_err(breaker_error)
    }

    /// Remove any marker.
    pub async fn reset(&self) -> Result<()> {
        self.store.clear().await.map_err(breaker_error)
    }
}

fn breaker_error(e: crate::error::StoreError) -> DiscoveryError {
    DiscoveryError::Breaker(Box::new(e))
}
