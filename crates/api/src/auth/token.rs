//! Signed access tokens (HS256 JWT).
//!
//! A token only says who the caller is. What they may do is looked up per
//! request, so the claims carry no role.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use optique_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{env_or, env_required};

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: DbId,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_expiry_mins: i64,
}

impl TokenConfig {
    /// Reads `JWT_SECRET` (required) and `JWT_ACCESS_EXPIRY_MINS`.
    pub fn from_env() -> Self {
        Self {
            secret: env_required("JWT_SECRET"),
            access_expiry_mins: env_or("JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS),
        }
    }
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Signs and checks access tokens. Keys are derived once and shared through
/// `AppState`.
#[derive(Clone)]
pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime_secs: i64,
}

impl AccessTokens {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            lifetime_secs: config.access_expiry_mins * 60,
        }
    }

    pub fn issue(&self, user_id: DbId, username: &str) -> jsonwebtoken::errors::Result<IssuedToken> {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.lifetime_secs,
            jti: Uuid::new_v4().to_string(),
        };

        Ok(IssuedToken {
            token: encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?,
            expires_in: self.lifetime_secs,
        })
    }

    /// Signature and expiry are both checked.
    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}
