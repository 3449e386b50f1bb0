//! Reads the expiry of a JWT access token.
//!
//! A JWT is three base64url segments joined by dots:
//! `header.payload.signature`. The session layer only needs one claim
//! from the payload, `exp` (seconds since the Unix epoch), to decide
//! whether a token is worth sending or should be refreshed first.
//!
//! Nothing here verifies the signature; the backend does that on every
//! request.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;

use crate::TokenError;

/// The one claim we read from the payload. Everything else is ignored.
#[derive(Deserialize)]
struct ExpiryClaim {
    exp: f64,
}

/// Returns the absolute instant encoded in the token's `exp` claim.
///
/// Padding on the payload segment is tolerated even though JWTs are
/// supposed to be unpadded.
///
/// # Errors
/// Returns [`TokenError::Malformed`] if the token doesn't have three
/// segments, the payload isn't base64url JSON, or `exp` is missing,
/// negative, or not finite.
pub fn expiry(token: &str) -> Result<SystemTime, TokenError> {
    let mut segments = token.split('.');
    let payload = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => {
            payload
        }
        _ => {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".into(),
            ));
        }
    };

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
        .map_err(|_| {
            TokenError::Malformed("payload is not valid base64url".into())
        })?;

    let claim: ExpiryClaim = serde_json::from_slice(&bytes).map_err(|e| {
        TokenError::Malformed(format!("payload has no usable exp claim: {e}"))
    })?;

    Duration::try_from_secs_f64(claim.exp)
        .ok()
        .and_then(|exp| UNIX_EPOCH.checked_add(exp))
        .ok_or_else(|| {
            TokenError::Malformed(format!(
                "exp claim out of range: {}",
                claim.exp
            ))
        })
}

/// Whether `token` should be treated as expired at `now`.
///
/// Computes `now + skew >= expiry(token)`. A positive `skew` makes tokens
/// count as expired slightly before the server would reject them, so a
/// refresh starts proactively instead of after a failed request.
///
/// A malformed token is always expired: callers force a refresh or fall
/// back to an anonymous session rather than erroring out.
pub fn is_expired(token: &str, now: SystemTime, skew: Duration) -> bool {
    match expiry(token) {
        // A skew past the end of time expires everything.
        Ok(exp) => now.checked_add(skew).is_none_or(|t| t >= exp),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an unsigned JWT-shaped token with the given payload JSON.
    fn token_with_payload(payload: &str) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256"}"#);
        let body = Base64UrlUnpadded::encode_string(payload.as_bytes());
        format!("{header}.{body}.signature")
    }

    fn token_expiring_at(at: SystemTime) -> String {
        let secs = at.duration_since(UNIX_EPOCH).unwrap().as_secs();
        token_with_payload(&format!(r#"{{"sub":"u-1","exp":{secs}}}"#))
    }

    // =====================================================================
    // expiry()
    // =====================================================================

    #[test]
    fn test_expiry_reads_exp_claim() {
        let token = token_with_payload(r#"{"exp":1700000000}"#);
        let exp = expiry(&token).expect("should decode");
        assert_eq!(exp, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn test_expiry_accepts_fractional_exp() {
        let token = token_with_payload(r#"{"exp":10.5}"#);
        let exp = expiry(&token).expect("should decode");
        assert_eq!(exp, UNIX_EPOCH + Duration::from_millis(10_500));
    }

    #[test]
    fn test_expiry_tolerates_padding() {
        let header = Base64UrlUnpadded::encode_string(b"{}");
        // `{"exp":1}` is 9 bytes → 12 base64 chars, pad artificially.
        let body = format!(
            "{}==",
            Base64UrlUnpadded::encode_string(br#"{"exp":1}"#)
        );
        let token = format!("{header}.{body}.sig");
        assert!(expiry(&token).is_ok());
    }

    #[test]
    fn test_expiry_wrong_segment_count_is_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            assert!(
                matches!(expiry(token), Err(TokenError::Malformed(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_expiry_bad_base64_is_malformed() {
        let result = expiry("aGVhZGVy.!!!not-base64!!!.sig");
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_expiry_missing_exp_is_malformed() {
        let token = token_with_payload(r#"{"sub":"u-1"}"#);
        assert!(matches!(expiry(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_expiry_negative_exp_is_malformed() {
        let token = token_with_payload(r#"{"exp":-5}"#);
        assert!(matches!(expiry(&token), Err(TokenError::Malformed(_))));
    }

    // =====================================================================
    // is_expired()
    // =====================================================================

    #[test]
    fn test_is_expired_past_token_is_expired() {
        let now = SystemTime::now();
        let token = token_expiring_at(now - Duration::from_secs(1));
        assert!(is_expired(&token, now, Duration::ZERO));
    }

    #[test]
    fn test_is_expired_future_token_is_valid() {
        let now = SystemTime::now();
        let token = token_expiring_at(now + Duration::from_secs(3600));
        assert!(!is_expired(&token, now, Duration::ZERO));
    }

    #[test]
    fn test_is_expired_malformed_token_is_expired() {
        assert!(is_expired("not-a-jwt", SystemTime::now(), Duration::ZERO));
    }

    #[test]
    fn test_is_expired_skew_expires_early() {
        // Valid for another 5s, but a 10s skew treats it as expired now.
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let token = token_expiring_at(now + Duration::from_secs(5));
        assert!(!is_expired(&token, now, Duration::ZERO));
        assert!(is_expired(&token, now, Duration::from_secs(10)));
    }

    #[test]
    fn test_is_expired_exact_boundary_is_expired() {
        let now = UNIX_EPOCH + Duration::from_secs(2_000);
        let token = token_expiring_at(now);
        assert!(is_expired(&token, now, Duration::ZERO));
    }

    #[test]
    fn test_is_expired_overflowing_skew_is_expired() {
        let now = SystemTime::now();
        let token = token_expiring_at(now + Duration::from_secs(3600));
        assert!(is_expired(&token, now, Duration::MAX));
    }
}
