//! Session identifiers
//!
//! Identifiers are 84 characters of URL-safe base64 (`[A-Za-z0-9_-]`). They are
//! built by hashing a nanosecond timestamp together with 64 bytes of OS
//! randomness through SHA-512, then encoding the first 63 bytes of the digest.
//! 63 bytes encode to exactly 84 characters, so no padding is ever produced.
//!
//! Uniqueness is not checked against the store: with ~500 bits of hashed input
//! the collision probability is negligible, and checking would cost a round-trip.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::{Result, SessionError};

/// Length of every valid session identifier
pub const SESSION_ID_LEN: usize = 84;

/// Bytes of OS randomness mixed into each identifier
const RANDOM_BYTES: usize = 64;

/// Check whether `candidate` has the exact identifier format
///
/// True iff it is 84 characters long and every character is in `[A-Za-z0-9_-]`.
pub fn is_valid_session_id(candidate: &str) -> bool {
    candidate.len() == SESSION_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// A validated session identifier
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Validate a raw token (typically a cookie value)
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid_session_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(SessionError::InvalidIdentifier(format!(
                "expected {} URL-safe base64 characters, got {} characters",
                SESSION_ID_LEN,
                raw.len()
            )))
        }
    }

    /// Mint a fresh identifier
    pub fn generate() -> Result<Self> {
        IdentifierGenerator::generate()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix that is safe to put in logs
    pub fn redacted(&self) -> String {
        format!("{}…", &self.0[..6])
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Identifiers are bearer secrets; keep them out of debug output.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionId").field(&self.redacted()).finish()
    }
}

/// Produces high-entropy session identifiers
pub struct IdentifierGenerator;

impl IdentifierGenerator {
    /// Generate a new identifier
    ///
    /// Fails with [`SessionError::EntropyUnavailable`] only if the OS random
    /// source cannot be read. There is no fallback source.
    pub fn generate() -> Result<SessionId> {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));

        let mut random = [0u8; RANDOM_BYTES];
        OsRng
            .try_fill_bytes(&mut random)
            .map_err(|e| SessionError::EntropyUnavailable(e.to_string()))?;

        let mut hasher = Sha512::new();
        hasher.update(nanos.to_be_bytes());
        hasher.update(random);
        let digest = hasher.finalize();

        // Drop the last byte so the base64 output needs no padding
        let encoded = URL_SAFE_NO_PAD.encode(&digest[..digest.len() - 1]);
        debug_assert_eq!(encoded.len(), SESSION_ID_LEN);
        Ok(SessionId(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_format() {
        for _ in 0..100 {
            let id = IdentifierGenerator::generate().unwrap();
            assert_eq!(id.as_str().len(), SESSION_ID_LEN);
            assert!(is_valid_session_id(id.as_str()));
        }
    }

    #[test]
    fn test_no_duplicates() {
        let ids: HashSet<String> = (0..10_000)
            .map(|_| SessionId::generate().unwrap().into_string())
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_validation() {
        // 40-char hex, the format of older filesystem-backed stores
        assert!(!is_valid_session_id(
            "0123456789abcdef0123456789abcdef01234567"
        ));

        let valid = "A".repeat(80) + "b-_9";
        assert!(is_valid_session_id(&valid));

        let with_plus = "A".repeat(83) + "+";
        assert!(!is_valid_session_id(&with_plus));

        let with_pad = "A".repeat(83) + "=";
        assert!(!is_valid_session_id(&with_pad));

        assert!(!is_valid_session_id(&"A".repeat(83)));
        assert!(!is_valid_session_id(&"A".repeat(85)));
        assert!(!is_valid_session_id(""));
    }

    #[test]
    fn test_parse() {
        let id = SessionId::generate().unwrap();
        let parsed = SessionId::parse(id.as_str()).unwrap();
        assert_eq!(parsed, id);

        let err = SessionId::parse("short").unwrap_err();
        assert!(matches!(err, SessionError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_debug_is_redacted() {
        let id = SessionId::generate().unwrap();
        let debug = format!("{:?}", id);
        assert!(!debug.contains(id.as_str()));
        assert!(debug.contains(&id.as_str()[..6]));
    }
}
