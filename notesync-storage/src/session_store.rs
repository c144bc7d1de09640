//! Session persistence.
//!
//! Only the SHA-256 digest of a token is ever stored; the plaintext token
//! lives with the client. Expiry is checked in the lookup predicate so an
//! expired session is indistinguishable from an unknown one.

use crate::error::StorageResult;
use crate::Database;
use duckdb::params;
use notesync_types::UserId;

/// A persisted session row.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub created_at: i64,
    pub expires_at: i64,
    pub last_user_agent: Option<String>,
}

/// DuckDB-backed session store, keyed by token digest.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn insert(
        &self,
        token_hash: &str,
        user: &UserId,
        expires_at: i64,
        user_agent: Option<&str>,
    ) -> StorageResult<()> {
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (token_hash, user_uuid, last_user_agent, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                token_hash,
                user.to_string(),
                user_agent,
                crate::now_ms(),
                expires_at,
            ],
        )?;
        Ok(())
    }

    /// Resolves a token digest to its session, if the session exists and
    /// has not expired as of `now_ms`.
    pub fn lookup(&self, token_hash: &str, now_ms: i64) -> StorageResult<Option<SessionRecord>> {
        let conn = self.db.lock().unwrap();
        let result = conn.query_row(
            "SELECT user_uuid, created_at, expires_at, last_user_agent FROM sessions \
             WHERE token_hash = ? AND expires_at > ?",
            params![token_hash, now_ms],
            |row| {
                let user_str: String = row.get(0)?;
                let user_id: UserId = user_str.parse().map_err(|e: uuid::Error| {
                    duckdb::Error::FromSqlConversionFailure(
                        0,
                        duckdb::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(SessionRecord {
                    user_id,
                    created_at: row.get(1)?,
                    expires_at: row.get(2)?,
                    last_user_agent: row.get(3)?,
                })
            },
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes one session. Returns whether a row was removed.
    pub fn revoke(&self, token_hash: &str) -> StorageResult<bool> {
        let conn = self.db.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?",
            params![token_hash],
        )?;
        Ok(deleted > 0)
    }

    /// Deletes every session belonging to `user` (e.g. after a password
    /// change). Returns the number removed.
    pub fn revoke_all(&self, user: &UserId) -> StorageResult<usize> {
        let conn = self.db.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE user_uuid = ?",
            params![user.to_string()],
        )?;
        Ok(deleted)
    }

    /// Removes sessions that expired at or before `now_ms`.
    pub fn sweep_expired(&self, now_ms: i64) -> StorageResult<usize> {
        let conn = self.db.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            params![now_ms],
        )?;
        Ok(deleted)
    }
}
