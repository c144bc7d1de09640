//! Credential store: registration, derivation-parameter lookup,
//! authentication with lockout, password change.

use crate::error::{AuthError, AuthResult};
use crate::lockout::LockoutPolicy;
use chrono::Utc;
use notesync_storage::{NewUser, UserStore};
use notesync_types::{DerivationParams, UserId};
use tracing::{debug, info, warn};

/// Owns user identity, password-derivation parameters, and brute-force
/// lockout counters.
#[derive(Clone)]
pub struct CredentialStore {
    users: UserStore,
    policy: LockoutPolicy,
}

impl CredentialStore {
    pub fn new(users: UserStore, policy: LockoutPolicy) -> Self {
        Self { users, policy }
    }

    pub fn user_store(&self) -> &UserStore {
        &self.users
    }

    /// Registers a new account.
    ///
    /// The password arrives already derived by the client; the server only
    /// checks it is present. Fails with `DuplicateEmail` when the email is
    /// taken (case-insensitive).
    pub fn register(
        &self,
        email: &str,
        encrypted_password: &str,
        params: DerivationParams,
        user_agent: Option<&str>,
    ) -> AuthResult<UserId> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("email must not be empty".into()));
        }
        if encrypted_password.is_empty() {
            return Err(AuthError::Validation(
                "encrypted_password must not be empty".into(),
            ));
        }

        let user = self.users.create(NewUser {
            email: email.to_owned(),
            encrypted_password: encrypted_password.to_owned(),
            params,
            user_agent: user_agent.map(str::to_owned),
        })?;
        info!(user = %user.id, "registered new account");
        Ok(user.id)
    }

    /// Returns the password-derivation parameters for an email, pre-auth.
    ///
    /// This lookup is intentionally public — a client needs the parameters
    /// before it can compute its login key. Fails with `NotFound` for
    /// unknown emails.
    pub fn derivation_params(&self, email: &str) -> AuthResult<DerivationParams> {
        match self.users.find_by_email(email)? {
            Some(user) => Ok(user.params),
            None => Err(AuthError::NotFound(format!("no account for {email}"))),
        }
    }

    /// Validates credentials and returns the account identity.
    ///
    /// While `locked_until` is in the future the call fails with
    /// `LockedOut` before any comparison. Mismatches increment the failure
    /// counter and, past the policy threshold, set a new lockout deadline;
    /// both unknown email and wrong password surface as
    /// `InvalidCredentials` with matched timing.
    pub fn authenticate(
        &self,
        email: &str,
        encrypted_password: &str,
        user_agent: Option<&str>,
    ) -> AuthResult<UserId> {
        let now = Utc::now().timestamp_millis();
        let user = match self.users.find_by_email(email)? {
            Some(user) => user,
            None => {
                // Burn a comparison so the unknown-account path costs the
                // same as the known-account path.
                let _ = constant_time_eq(
                    encrypted_password.as_bytes(),
                    DUMMY_COMPARISON_TARGET.as_bytes(),
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        if let Some(until) = user.locked_until {
            if until > now {
                warn!(user = %user.id, "authentication rejected: account locked");
                return Err(AuthError::LockedOut { until_ms: until });
            }
        }

        if !constant_time_eq(
            encrypted_password.as_bytes(),
            user.encrypted_password.as_bytes(),
        ) {
            let (count, deadline) = self
                .users
                .record_login_failure(&user.id, |n| self.policy.deadline_after(n, now))?;
            if deadline.is_some() {
                warn!(user = %user.id, failed_attempts = count, "account locked after repeated failures");
            } else {
                debug!(user = %user.id, failed_attempts = count, "authentication failed");
            }
            return Err(AuthError::InvalidCredentials);
        }

        self.users.record_login_success(&user.id, user_agent)?;
        debug!(user = %user.id, "authentication succeeded");
        Ok(user.id)
    }

    /// Replaces the password and derivation parameters atomically. Lockout
    /// counters are not affected.
    pub fn change_password(
        &self,
        user_id: &UserId,
        new_encrypted_password: &str,
        new_params: DerivationParams,
        user_agent: Option<&str>,
    ) -> AuthResult<()> {
        if new_encrypted_password.is_empty() {
            return Err(AuthError::Validation(
                "encrypted_password must not be empty".into(),
            ));
        }
        self.users
            .update_password(user_id, new_encrypted_password, &new_params, user_agent)?;
        info!(user = %user_id, "password changed");
        Ok(())
    }
}

/// Placeholder the dummy comparison runs against; length-typical for a
/// client-derived password token.
const DUMMY_COMPARISON_TARGET: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
