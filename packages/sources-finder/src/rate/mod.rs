//! Request pacing and the search-provider circuit breaker.
//!
//! - `Clock` - injectable time source
//! - `CircuitBreaker` - time-boxed stop after the provider blocked us
//! - `RateController` - breaker check, pre-search jitter and fetch pacing

pub mod breaker;
pub mod clock;
pub mod controller;

pub use breaker::{BreakerMarker, CircuitBreaker, Gate};
pub use clock::{Clock, SystemClock};
pub use controller::RateController;
