//! Process configuration, read once from the environment at startup.
//!
//! | Env Var                        | Default                 |
//! |--------------------------------|-------------------------|
//! | `HOST`                         | `0.0.0.0`               |
//! | `PORT`                         | `3000`                  |
//! | `CORS_ORIGINS`                 | `http://localhost:5173` |
//! | `REQUEST_TIMEOUT_SECS`         | `30`                    |
//! | `JWT_SECRET`                   | required                |
//! | `JWT_ACCESS_EXPIRY_MINS`       | `60`                    |
//! | `CSRF_SECRET`                  | `JWT_SECRET`            |
//! | `CSRF_TOKEN_TTL_SECS`          | `7200`                  |
//! | `RATE_LIMIT_CAPACITY`          | `20`                    |
//! | `RATE_LIMIT_REFILL_PER_MINUTE` | `20`                    |
//! | `TRUSTED_PROXIES`              | none                    |
//!
//! `TRUSTED_PROXIES` lists the reverse-proxy addresses whose
//! `X-Forwarded-For` / `X-Real-IP` headers are believed when keying the
//! anonymous rate limit.
//!
//! Bad values panic: a misconfigured server should not start.

use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;

use crate::auth::token::TokenConfig;
use crate::middleware::csrf::CsrfConfig;
use crate::middleware::rate_limit::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub tokens: TokenConfig,
    pub csrf: CsrfConfig,
    pub rate_limit: RateLimitConfig,
    pub trusted_proxies: Vec<IpAddr>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let tokens = TokenConfig::from_env();
        let csrf = CsrfConfig::from_env(&tokens.secret);

        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            cors_origins: env_list("CORS_ORIGINS", "http://localhost:5173"),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            tokens,
            csrf,
            rate_limit: RateLimitConfig::from_env(),
            trusted_proxies: env_list("TRUSTED_PROXIES", "")
                .iter()
                .map(|raw| {
                    raw.parse::<IpAddr>()
                        .unwrap_or_else(|e| panic!("TRUSTED_PROXIES entry {raw:?}: {e}"))
                })
                .collect(),
        }
    }
}

/// Parse `key` if set and non-empty, else use `default`.
///
/// # Panics
///
/// Panics when the variable is set but does not parse as `T`.
pub(crate) fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value {raw:?}: {e}")),
        _ => default,
    }
}

/// A required, non-empty string variable.
///
/// # Panics
///
/// Panics when the variable is unset or empty.
pub(crate) fn env_required(key: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| panic!("{key} must be set in the environment"))
}

/// Comma-separated list; blank entries are dropped.
fn env_list(key: &str, default: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
