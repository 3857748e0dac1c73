// Per-IP rate limiting for the public and authentication routes

use axum::Router;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};

/// Token bucket settings: `burst` requests up front, then one more every
/// `replenish_secs` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub burst: u32,
    pub replenish_secs: u64,
}

/// 5 login attempts per 15 minutes
pub const LOGIN: RateLimit = RateLimit { burst: 5, replenish_secs: 180 };

/// 10 refreshes per 15 minutes
pub const REFRESH: RateLimit = RateLimit { burst: 10, replenish_secs: 90 };

/// 5 password reset requests per hour
pub const PASSWORD_RESET: RateLimit = RateLimit { burst: 5, replenish_secs: 720 };

/// Public survey submissions
pub const SUBMISSION: RateLimit = RateLimit { burst: 20, replenish_secs: 3 };

/// Wrap every route of `router` in its own limiter keyed by client IP.
///
/// The IP is taken from X-Forwarded-For, X-Real-IP or Forwarded before
/// falling back to the peer address.
pub fn limit<S>(router: Router<S>, limit: RateLimit) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(limit.replenish_secs)
            .burst_size(limit.burst)
            .key_extractor(SmartIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("Rate limiter configuration uses non-zero constants"),
    );

    router.layer(GovernorLayer { config })
}
