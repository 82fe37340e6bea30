use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

pub type Limiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// One request per `interval`, shared by every caller holding the handle.
///
/// Returns `None` for a zero interval, which disables pacing.
pub fn request_limiter(interval: Duration) -> Option<Limiter> {
    let quota = Quota::with_period(interval)?;
    Some(Arc::new(RateLimiter::direct(quota)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_disables_pacing() {
        assert!(request_limiter(Duration::ZERO).is_none());
    }

    #[test]
    fn test_first_request_is_immediate() {
        let limiter = request_limiter(Duration::from_secs(60)).unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
