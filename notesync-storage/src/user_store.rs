//! User account store.
//!
//! Email uniqueness is case-insensitive and enforced under the connection
//! lock (check-then-insert in one hold). Lockout counter updates go through
//! [`UserStore::record_login_failure`], which performs the whole
//! read-increment-decide-write sequence under the same lock so concurrent
//! failed attempts cannot lose updates.

use crate::error::{StorageError, StorageResult};
use crate::Database;
use duckdb::params;
use notesync_types::{DerivationParams, User, UserId};

/// Fields required to register a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub encrypted_password: String,
    pub params: DerivationParams,
    pub user_agent: Option<String>,
}

/// DuckDB-backed user store.
#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a new account. Fails with `DuplicateEmail` if the email is
    /// already registered (case-insensitive).
    pub fn create(&self, new_user: NewUser) -> StorageResult<User> {
        let conn = self.db.lock().unwrap();

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE lower(email) = lower(?)",
            params![new_user.email],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(StorageError::DuplicateEmail(new_user.email));
        }

        let id = UserId::generate();
        let now = crate::now_ms();
        let p = &new_user.params;
        conn.execute(
            r#"
            INSERT INTO users (
                uuid, email, encrypted_password,
                pw_func, pw_alg, pw_cost, pw_key_size, pw_nonce, pw_salt, version,
                num_failed_attempts, locked_until, updated_with_user_agent,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?, ?)
            "#,
            params![
                id.to_string(),
                new_user.email,
                new_user.encrypted_password,
                p.pw_func,
                p.pw_alg,
                p.pw_cost,
                p.pw_key_size,
                p.pw_nonce,
                p.pw_salt,
                p.version,
                new_user.user_agent,
                now,
                now,
            ],
        )?;

        Ok(User {
            id,
            email: new_user.email,
            encrypted_password: new_user.encrypted_password,
            params: new_user.params,
            num_failed_attempts: 0,
            locked_until: None,
            updated_with_user_agent: new_user.user_agent,
            created_at: now,
            updated_at: now,
        })
    }

    /// Looks up an account by email, case-insensitively.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.db.lock().unwrap();
        let result = conn.query_row(
            &format!("{SELECT_USER} WHERE lower(email) = lower(?)"),
            params![email],
            row_to_user,
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: &UserId) -> StorageResult<Option<User>> {
        let conn = self.db.lock().unwrap();
        let result = conn.query_row(
            &format!("{SELECT_USER} WHERE uuid = ?"),
            params![id.to_string()],
            row_to_user,
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the password and derivation parameters in one statement.
    /// Lockout counters are deliberately untouched.
    pub fn update_password(
        &self,
        id: &UserId,
        new_encrypted_password: &str,
        new_params: &DerivationParams,
        user_agent: Option<&str>,
    ) -> StorageResult<()> {
        let conn = self.db.lock().unwrap();
        let updated = conn.execute(
            r#"
            UPDATE users SET
                encrypted_password = ?,
                pw_func = ?, pw_alg = ?, pw_cost = ?, pw_key_size = ?,
                pw_nonce = ?, pw_salt = ?, version = ?,
                updated_with_user_agent = ?,
                updated_at = ?
            WHERE uuid = ?
            "#,
            params![
                new_encrypted_password,
                new_params.pw_func,
                new_params.pw_alg,
                new_params.pw_cost,
                new_params.pw_key_size,
                new_params.pw_nonce,
                new_params.pw_salt,
                new_params.version,
                user_agent,
                crate::now_ms(),
                id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// Records a failed login attempt.
    ///
    /// Reads the current counter, increments it, asks `decide` for an
    /// optional new lockout deadline given the new count, and writes both
    /// back — all under one connection lock hold, so concurrent failures
    /// serialize. Returns the new count and the deadline that was set.
    pub fn record_login_failure<F>(
        &self,
        id: &UserId,
        decide: F,
    ) -> StorageResult<(u32, Option<i64>)>
    where
        F: FnOnce(u32) -> Option<i64>,
    {
        let conn = self.db.lock().unwrap();
        let current: u32 = conn
            .query_row(
                "SELECT num_failed_attempts FROM users WHERE uuid = ?",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => {
                    StorageError::NotFound(format!("user {id}"))
                }
                other => other.into(),
            })?;

        let new_count = current + 1;
        let locked_until = decide(new_count);
        conn.execute(
            "UPDATE users SET num_failed_attempts = ?, locked_until = ?, updated_at = ? \
             WHERE uuid = ?",
            params![new_count, locked_until, crate::now_ms(), id.to_string()],
        )?;
        Ok((new_count, locked_until))
    }

    /// Records a successful login: resets the failure counter, clears any
    /// lockout, and stamps the user agent.
    pub fn record_login_success(
        &self,
        id: &UserId,
        user_agent: Option<&str>,
    ) -> StorageResult<()> {
        let conn = self.db.lock().unwrap();
        let updated = conn.execute(
            "UPDATE users SET num_failed_attempts = 0, locked_until = NULL, \
             updated_with_user_agent = ?, updated_at = ? WHERE uuid = ?",
            params![user_agent, crate::now_ms(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

const SELECT_USER: &str = "SELECT uuid, email, encrypted_password, \
    pw_func, pw_alg, pw_cost, pw_key_size, pw_nonce, pw_salt, version, \
    num_failed_attempts, locked_until, updated_with_user_agent, \
    created_at, updated_at FROM users";

fn row_to_user(row: &duckdb::Row<'_>) -> duckdb::Result<User> {
    let id_str: String = row.get(0)?;
    let id: UserId = id_str.parse().map_err(|e: uuid::Error| {
        duckdb::Error::FromSqlConversionFailure(0, duckdb::types::Type::Text, Box::new(e))
    })?;
    Ok(User {
        id,
        email: row.get(1)?,
        encrypted_password: row.get(2)?,
        params: DerivationParams {
            pw_func: row.get(3)?,
            pw_alg: row.get(4)?,
            pw_cost: row.get(5)?,
            pw_key_size: row.get(6)?,
            pw_nonce: row.get(7)?,
            pw_salt: row.get(8)?,
            version: row.get(9)?,
        },
        num_failed_attempts: row.get(10)?,
        locked_until: row.get(11)?,
        updated_with_user_agent: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
