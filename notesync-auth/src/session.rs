//! Session token issuance and resolution.

use crate::error::{AuthError, AuthResult};
use chrono::Utc;
use notesync_storage::SessionStore;
use notesync_types::UserId;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Default session duration: 30 days (seconds).
const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 24 * 3600;

/// Token byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

/// An opaque session token. Revealed to the client once at login; the
/// server keeps only its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Issues and resolves session tokens backed by the sessions table.
#[derive(Clone)]
pub struct SessionManager {
    sessions: SessionStore,
    ttl_secs: i64,
}

impl SessionManager {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }

    pub fn with_ttl_secs(sessions: SessionStore, ttl_secs: i64) -> Self {
        Self { sessions, ttl_secs }
    }

    /// Creates a session for an authenticated user and returns the
    /// plaintext token (only revealed here).
    pub fn issue(&self, user: &UserId, user_agent: Option<&str>) -> AuthResult<SessionToken> {
        let token = generate_token();
        let expires_at = Utc::now().timestamp_millis() + self.ttl_secs * 1000;
        self.sessions
            .insert(&hash_token(&token), user, expires_at, user_agent)?;
        debug!(user = %user, "session issued");
        Ok(SessionToken(token))
    }

    /// Resolves a presented token to the user it authenticates. Unknown
    /// and expired tokens are indistinguishable to the caller.
    pub fn resolve(&self, token: &SessionToken) -> AuthResult<UserId> {
        let now = Utc::now().timestamp_millis();
        match self.sessions.lookup(&hash_token(token.as_str()), now)? {
            Some(record) => Ok(record.user_id),
            None => Err(AuthError::Unauthenticated),
        }
    }

    /// Revokes one session. Returns whether it existed.
    pub fn revoke(&self, token: &SessionToken) -> AuthResult<bool> {
        Ok(self.sessions.revoke(&hash_token(token.as_str()))?)
    }

    /// Revokes every session for a user.
    pub fn revoke_all(&self, user: &UserId) -> AuthResult<usize> {
        Ok(self.sessions.revoke_all(user)?)
    }

    /// Removes expired sessions; returns the number swept.
    pub fn sweep_expired(&self) -> AuthResult<usize> {
        Ok(self.sessions.sweep_expired(Utc::now().timestamp_millis())?)
    }
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a session token (SHA-256, single pass — tokens are already
/// high-entropy).
fn hash_token(token: &str) -> String {
    let mut h = Sha256::new();
    h.update(token.as_bytes());
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_digest_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
