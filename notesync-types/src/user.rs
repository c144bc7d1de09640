//! User accounts and password-derivation parameters.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// Parameters describing how a client derives its login key.
///
/// The server stores these opaquely and returns them pre-auth so key
/// derivation is reproducible on every device; it never runs the derivation
/// itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationParams {
    pub pw_func: Option<String>,
    pub pw_alg: Option<String>,
    pub pw_cost: Option<u32>,
    pub pw_key_size: Option<u32>,
    pub pw_nonce: Option<String>,
    pub pw_salt: Option<String>,
    pub version: Option<String>,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Client-derived secret; compared, never decoded.
    pub encrypted_password: String,
    pub params: DerivationParams,
    pub num_failed_attempts: u32,
    /// While this is in the future, authentication fails with a lockout
    /// error regardless of credential correctness (epoch ms).
    pub locked_until: Option<i64>,
    pub updated_with_user_agent: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Whether the account is locked out as of `now_ms`.
    pub fn is_locked_at(&self, now_ms: i64) -> bool {
        self.locked_until.is_some_and(|until| until > now_ms)
    }
}
