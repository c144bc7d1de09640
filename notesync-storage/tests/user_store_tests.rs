use notesync_storage::{NewUser, UserStore};
use notesync_types::DerivationParams;
use pretty_assertions::assert_eq;

fn store() -> UserStore {
    UserStore::new(notesync_storage::open_in_memory().unwrap())
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.into(),
        encrypted_password: "client-derived-secret".into(),
        params: DerivationParams {
            pw_func: Some("pbkdf2".into()),
            pw_alg: Some("sha512".into()),
            pw_cost: Some(110_000),
            pw_key_size: Some(512),
            pw_nonce: Some("nonce".into()),
            pw_salt: Some("salt".into()),
            version: Some("002".into()),
        },
        user_agent: Some("test-agent".into()),
    }
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn create_and_find_by_email() {
    let store = store();
    let created = store.create(new_user("a@x.com")).unwrap();

    let found = store.find_by_email("a@x.com").unwrap().unwrap();
    assert_eq!(found, created);
    assert_eq!(found.num_failed_attempts, 0);
    assert_eq!(found.locked_until, None);
}

#[test]
fn email_lookup_is_case_insensitive() {
    let store = store();
    store.create(new_user("Mixed@Case.Org")).unwrap();

    assert!(store.find_by_email("mixed@case.org").unwrap().is_some());
    assert!(store.find_by_email("MIXED@CASE.ORG").unwrap().is_some());
}

#[test]
fn duplicate_email_rejected() {
    let store = store();
    store.create(new_user("dup@x.com")).unwrap();

    let err = store.create(new_user("DUP@x.com")).unwrap_err();
    assert!(matches!(
        err,
        notesync_storage::StorageError::DuplicateEmail(_)
    ));

    // No second row was created
    let found = store.find_by_email("dup@x.com").unwrap().unwrap();
    assert_eq!(found.email, "dup@x.com");
}

#[test]
fn get_unknown_user_is_none() {
    let store = store();
    assert!(store.get(&notesync_types::UserId::generate()).unwrap().is_none());
    assert!(store.find_by_email("nobody@x.com").unwrap().is_none());
}

// ── Lockout counters ─────────────────────────────────────────────

#[test]
fn login_failure_increments_counter() {
    let store = store();
    let user = store.create(new_user("fail@x.com")).unwrap();

    let (count, deadline) = store.record_login_failure(&user.id, |_| None).unwrap();
    assert_eq!(count, 1);
    assert_eq!(deadline, None);

    let (count, _) = store.record_login_failure(&user.id, |_| None).unwrap();
    assert_eq!(count, 2);

    let reloaded = store.get(&user.id).unwrap().unwrap();
    assert_eq!(reloaded.num_failed_attempts, 2);
    assert_eq!(reloaded.locked_until, None);
}

#[test]
fn failure_decision_sets_lockout_deadline() {
    let store = store();
    let user = store.create(new_user("lock@x.com")).unwrap();

    let (count, deadline) = store
        .record_login_failure(&user.id, |n| Some(9_999_999_999_999 + n as i64))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(deadline, Some(9_999_999_999_999 + 1));

    let reloaded = store.get(&user.id).unwrap().unwrap();
    assert_eq!(reloaded.locked_until, deadline);
}

#[test]
fn login_success_resets_counters() {
    let store = store();
    let user = store.create(new_user("reset@x.com")).unwrap();
    store
        .record_login_failure(&user.id, |_| Some(9_999_999_999_999))
        .unwrap();

    store
        .record_login_success(&user.id, Some("new-device"))
        .unwrap();

    let reloaded = store.get(&user.id).unwrap().unwrap();
    assert_eq!(reloaded.num_failed_attempts, 0);
    assert_eq!(reloaded.locked_until, None);
    assert_eq!(reloaded.updated_with_user_agent.as_deref(), Some("new-device"));
}

#[test]
fn failure_on_unknown_user_is_not_found() {
    let store = store();
    let err = store
        .record_login_failure(&notesync_types::UserId::generate(), |_| None)
        .unwrap_err();
    assert!(matches!(err, notesync_storage::StorageError::NotFound(_)));
}

// ── Password change ──────────────────────────────────────────────

#[test]
fn update_password_replaces_secret_and_params() {
    let store = store();
    let user = store.create(new_user("pw@x.com")).unwrap();
    store.record_login_failure(&user.id, |_| None).unwrap();

    let new_params = DerivationParams {
        pw_func: Some("argon2".into()),
        pw_cost: Some(3),
        ..Default::default()
    };
    store
        .update_password(&user.id, "new-secret", &new_params, Some("rotator"))
        .unwrap();

    let reloaded = store.get(&user.id).unwrap().unwrap();
    assert_eq!(reloaded.encrypted_password, "new-secret");
    assert_eq!(reloaded.params, new_params);
    // Lockout counters are untouched by a password change
    assert_eq!(reloaded.num_failed_attempts, 1);
}

#[test]
fn update_password_unknown_user_is_not_found() {
    let store = store();
    let err = store
        .update_password(
            &notesync_types::UserId::generate(),
            "x",
            &DerivationParams::default(),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, notesync_storage::StorageError::NotFound(_)));
}
