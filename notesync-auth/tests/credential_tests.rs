use chrono::Duration;
use notesync_auth::{AuthError, CredentialStore, LockoutPolicy};
use notesync_storage::UserStore;
use notesync_types::DerivationParams;
use pretty_assertions::assert_eq;

fn credentials_with(policy: LockoutPolicy) -> CredentialStore {
    let db = notesync_storage::open_in_memory().unwrap();
    CredentialStore::new(UserStore::new(db), policy)
}

fn credentials() -> CredentialStore {
    credentials_with(LockoutPolicy::default())
}

fn pbkdf2_params() -> DerivationParams {
    DerivationParams {
        pw_func: Some("pbkdf2".into()),
        pw_cost: Some(110_000),
        ..Default::default()
    }
}

// ── Registration & derivation params ─────────────────────────────

#[test]
fn derivation_params_available_pre_auth() {
    let creds = credentials();
    creds
        .register("a@x.com", "derived-secret", pbkdf2_params(), None)
        .unwrap();

    // No authentication has happened; the params must come back verbatim
    let params = creds.derivation_params("a@x.com").unwrap();
    assert_eq!(params, pbkdf2_params());
}

#[test]
fn derivation_params_unknown_email_is_not_found() {
    let creds = credentials();
    let err = creds.derivation_params("ghost@x.com").unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
}

#[test]
fn duplicate_registration_always_fails() {
    let creds = credentials();
    creds
        .register("dup@x.com", "pw", pbkdf2_params(), None)
        .unwrap();

    for _ in 0..3 {
        let err = creds
            .register("Dup@X.com", "pw2", pbkdf2_params(), None)
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail(_)));
    }
}

#[test]
fn empty_password_rejected_before_mutation() {
    let creds = credentials();
    let err = creds
        .register("v@x.com", "", pbkdf2_params(), None)
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    // The failed registration left nothing behind
    assert!(matches!(
        creds.derivation_params("v@x.com").unwrap_err(),
        AuthError::NotFound(_)
    ));
}

#[test]
fn empty_email_rejected() {
    let creds = credentials();
    let err = creds
        .register("   ", "pw", pbkdf2_params(), None)
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

// ── Authentication ───────────────────────────────────────────────

#[test]
fn authenticate_returns_identity_on_match() {
    let creds = credentials();
    let id = creds
        .register("ok@x.com", "secret", pbkdf2_params(), None)
        .unwrap();

    let resolved = creds
        .authenticate("ok@x.com", "secret", Some("device-ua"))
        .unwrap();
    assert_eq!(resolved, id);

    let user = creds.user_store().get(&id).unwrap().unwrap();
    assert_eq!(user.updated_with_user_agent.as_deref(), Some("device-ua"));
}

#[test]
fn wrong_password_and_unknown_email_are_indistinguishable() {
    let creds = credentials();
    creds
        .register("real@x.com", "secret", pbkdf2_params(), None)
        .unwrap();

    let wrong_pw = creds
        .authenticate("real@x.com", "guess", None)
        .unwrap_err();
    let unknown = creds.authenticate("fake@x.com", "guess", None).unwrap_err();
    assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
}

#[test]
fn failures_accumulate_until_lockout() {
    let creds = credentials_with(LockoutPolicy {
        max_attempts: 3,
        base_lockout: Duration::minutes(5),
        max_backoff_doublings: 10,
    });
    let id = creds
        .register("brute@x.com", "secret", pbkdf2_params(), None)
        .unwrap();

    for _ in 0..3 {
        let err = creds.authenticate("brute@x.com", "wrong", None).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    // Threshold crossed: even correct credentials are rejected now
    let err = creds.authenticate("brute@x.com", "secret", None).unwrap_err();
    assert!(matches!(err, AuthError::LockedOut { .. }));

    let user = creds.user_store().get(&id).unwrap().unwrap();
    assert_eq!(user.num_failed_attempts, 3);
    assert!(user.locked_until.is_some());
}

#[test]
fn lockout_clears_once_deadline_elapses() {
    // Zero-length window: the deadline is already in the past by the next
    // call, so the account unlocks immediately after the threshold.
    let creds = credentials_with(LockoutPolicy {
        max_attempts: 2,
        base_lockout: Duration::zero(),
        max_backoff_doublings: 0,
    });
    let id = creds
        .register("expiry@x.com", "secret", pbkdf2_params(), None)
        .unwrap();

    for _ in 0..2 {
        let _ = creds.authenticate("expiry@x.com", "wrong", None).unwrap_err();
    }

    let resolved = creds.authenticate("expiry@x.com", "secret", None).unwrap();
    assert_eq!(resolved, id);

    // Success reset the counters
    let user = creds.user_store().get(&id).unwrap().unwrap();
    assert_eq!(user.num_failed_attempts, 0);
    assert_eq!(user.locked_until, None);
}

#[test]
fn successful_login_resets_failure_count() {
    let creds = credentials();
    creds
        .register("counter@x.com", "secret", pbkdf2_params(), None)
        .unwrap();

    let _ = creds.authenticate("counter@x.com", "wrong", None).unwrap_err();
    let _ = creds.authenticate("counter@x.com", "wrong", None).unwrap_err();
    let id = creds.authenticate("counter@x.com", "secret", None).unwrap();

    let user = creds.user_store().get(&id).unwrap().unwrap();
    assert_eq!(user.num_failed_attempts, 0);
}

// ── Password change ──────────────────────────────────────────────

#[test]
fn change_password_swaps_secret_and_params() {
    let creds = credentials();
    let id = creds
        .register("rotate@x.com", "old-secret", pbkdf2_params(), None)
        .unwrap();

    let new_params = DerivationParams {
        pw_func: Some("argon2id".into()),
        pw_cost: Some(3),
        ..Default::default()
    };
    creds
        .change_password(&id, "new-secret", new_params.clone(), Some("rotator"))
        .unwrap();

    assert!(matches!(
        creds.authenticate("rotate@x.com", "old-secret", None).unwrap_err(),
        AuthError::InvalidCredentials
    ));
    assert_eq!(creds.authenticate("rotate@x.com", "new-secret", None).unwrap(), id);
    assert_eq!(creds.derivation_params("rotate@x.com").unwrap(), new_params);
}

#[test]
fn change_password_does_not_touch_lockout_counters() {
    let creds = credentials();
    let id = creds
        .register("keep@x.com", "secret", pbkdf2_params(), None)
        .unwrap();
    let _ = creds.authenticate("keep@x.com", "wrong", None).unwrap_err();

    creds
        .change_password(&id, "next", DerivationParams::default(), None)
        .unwrap();

    let user = creds.user_store().get(&id).unwrap().unwrap();
    assert_eq!(user.num_failed_attempts, 1);
}

#[test]
fn change_password_rejects_empty_secret() {
    let creds = credentials();
    let id = creds
        .register("e@x.com", "secret", pbkdf2_params(), None)
        .unwrap();
    let err = creds
        .change_password(&id, "", DerivationParams::default(), None)
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}
