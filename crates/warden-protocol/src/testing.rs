//! Helpers for minting tokens in tests.
//!
//! The tokens produced here have a real JWT shape and a real `exp` claim
//! but a dummy signature, which is all the client-side codec looks at.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64ct::{Base64UrlUnpadded, Encoding};

use crate::AccessToken;

/// An unsigned token whose `exp` is `exp` and whose `sub` is `subject`.
pub fn unsigned_token(subject: &str, exp: SystemTime) -> AccessToken {
    let secs = exp
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(
        format!(r#"{{"sub":"{subject}","exp":{secs}}}"#).as_bytes(),
    );
    AccessToken::new(format!("{header}.{payload}.unsigned"))
}

/// A token that expires `secs` seconds from now.
pub fn token_expiring_in(subject: &str, secs: u64) -> AccessToken {
    unsigned_token(subject, SystemTime::now() + Duration::from_secs(secs))
}

/// A token that expired `secs` seconds ago.
pub fn token_expired_for(subject: &str, secs: u64) -> AccessToken {
    unsigned_token(subject, SystemTime::now() - Duration::from_secs(secs))
}
