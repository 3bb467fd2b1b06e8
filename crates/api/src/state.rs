use std::sync::Arc;

use crate::auth::token::AccessTokens;
use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateLimiter;

/// Shared handler state. Cloning is cheap: the pool is reference-counted and
/// the rest sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: optique_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub tokens: Arc<AccessTokens>,
    /// Per-client buckets, in memory and per process.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(pool: optique_db::DbPool, config: ServerConfig) -> Self {
        Self {
            pool,
            tokens: Arc::new(AccessTokens::new(&config.tokens)),
            config: Arc::new(config),
            rate_limiter: Arc::new(RateLimiter::new()),
        }
    }
}
