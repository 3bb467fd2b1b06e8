//! Stateless anti-forgery tokens.
//!
//! A token is `<nonce>.<issued_at>.<signature>` where the signature is an
//! HMAC-SHA256 over the subject (the user id), the nonce and the issue time.
//! Nothing is stored server-side: a token is valid for the subject it was
//! issued to until it is older than the configured TTL.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in seconds (2 hours).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Tokens stamped this far in the future are still accepted.
const CLOCK_SKEW_SECS: i64 = 60;

/// Generic message returned to the client on any CSRF failure.
pub const CSRF_ERROR: &str =
    "Jeton de sécurité invalide ou expiré. Veuillez recharger la page et réessayer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("CSRF token is malformed")]
    Malformed,

    #[error("CSRF token signature does not match")]
    BadSignature,

    #[error("CSRF token has expired")]
    Expired,
}

/// Issue a new token for `subject`, stamped with `issued_at` (Unix seconds).
pub fn issue_token(secret: &[u8], subject: &str, issued_at: i64) -> String {
    let nonce = format!("{:032x}", rand::random::<u128>());
    let signature = format!(
        "{:x}",
        mac_for(secret, subject, &nonce, issued_at).finalize().into_bytes()
    );
    format!("{nonce}.{issued_at}.{signature}")
}

/// Verify that `token` was issued for `subject` and is not older than `ttl_secs`.
pub fn verify_token(
    secret: &[u8],
    subject: &str,
    token: &str,
    now: i64,
    ttl_secs: i64,
) -> Result<(), CsrfError> {
    let mut parts = token.trim().split('.');
    let (Some(nonce), Some(issued_at), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CsrfError::Malformed);
    };

    if nonce.is_empty() {
        return Err(CsrfError::Malformed);
    }
    let issued_at: i64 = issued_at.parse().map_err(|_| CsrfError::Malformed)?;
    let signature = decode_hex(signature).ok_or(CsrfError::Malformed)?;

    mac_for(secret, subject, nonce, issued_at)
        .verify_slice(&signature)
        .map_err(|_| CsrfError::BadSignature)?;

    if issued_at > now + CLOCK_SKEW_SECS || now - issued_at > ttl_secs {
        return Err(CsrfError::Expired);
    }
    Ok(())
}

fn mac_for(secret: &[u8], subject: &str, nonce: &str, issued_at: i64) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(subject.as_bytes());
    mac.update(b":");
    mac.update(nonce.as_bytes());
    mac.update(b":");
    mac.update(issued_at.to_string().as_bytes());
    mac
}

/// `None` on odd length or non-hex characters.
fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET: &[u8] = b"test-csrf-secret";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn issued_token_verifies_for_same_subject() {
        let token = issue_token(SECRET, "42", NOW);
        assert_eq!(verify_token(SECRET, "42", &token, NOW + 5, 3600), Ok(()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(issue_token(SECRET, "42", NOW), issue_token(SECRET, "42", NOW));
    }

    #[test]
    fn other_subject_is_rejected() {
        let token = issue_token(SECRET, "42", NOW);
        assert_matches!(
            verify_token(SECRET, "43", &token, NOW, 3600),
            Err(CsrfError::BadSignature)
        );
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = issue_token(SECRET, "42", NOW);
        assert_matches!(
            verify_token(b"another-secret", "42", &token, NOW, 3600),
            Err(CsrfError::BadSignature)
        );
    }

    #[test]
    fn tampered_timestamp_is_rejected() {
        let token = issue_token(SECRET, "42", NOW);
        let forged = token.replacen(&NOW.to_string(), &(NOW + 10_000).to_string(), 1);
        assert_matches!(
            verify_token(SECRET, "42", &forged, NOW + 10_000, 3600),
            Err(CsrfError::BadSignature)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(SECRET, "42", NOW);
        assert_matches!(
            verify_token(SECRET, "42", &token, NOW + 3601, 3600),
            Err(CsrfError::Expired)
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", "abc", "a.b", "a.b.c.d", "ab.notanumber.00", "ab.1.zz", ".1.00"] {
            assert_matches!(
                verify_token(SECRET, "42", token, NOW, 3600),
                Err(CsrfError::Malformed),
                "token {token:?}"
            );
        }
    }
}
