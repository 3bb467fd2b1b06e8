//! Request extractors enforcing authentication and the mutation gate.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`permission::RequirePermission`] -- Requires a `resource:action` permission.
//! - [`gate::Gated`] -- Permission, rate limit, CSRF and field validation for writes.
//! - [`rate_limit::RateLimiter`] -- Per-client token buckets.
//! - [`csrf::CsrfConfig`] -- Token issuing and checking.

pub mod auth;
pub mod csrf;
pub mod gate;
pub mod permission;
pub mod rate_limit;
