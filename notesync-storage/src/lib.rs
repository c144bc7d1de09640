//! DuckDB storage layer for notesync.
//!
//! All four tables (`users`, `items`, `sessions`, `extension_settings`)
//! live in one database file behind a shared connection. The connection
//! mutex is what serializes the read-modify-write sequences the upper
//! layers depend on: lockout counter updates and the sync conflict
//! comparison are each performed under a single lock hold.
//!
//! # Architecture
//!
//! - Items are opaque ciphertext rows; soft delete keeps a tombstone row
//!   and clears the payload columns
//! - `updated_at` is assigned from a [`WriteClock`] so it strictly
//!   increases across writes, making the `(updated_at, id)` cursor total
//! - Stores are cheap clones over the shared connection

mod clock;
mod error;
mod item_store;
mod session_store;
mod settings_store;
mod user_store;

pub use clock::WriteClock;
pub use error::{StorageError, StorageResult};
pub use item_store::{IncomingOutcome, ItemStore, ItemWrite};
pub use session_store::{SessionRecord, SessionStore};
pub use settings_store::ExtensionSettingsStore;
pub use user_store::{NewUser, UserStore};

use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle to the backing database connection.
pub type Database = Arc<Mutex<duckdb::Connection>>;

/// Open the notesync database with stale WAL recovery and resource limits,
/// creating the schema if needed.
///
/// If the initial open fails and a `.wal` file exists alongside the
/// database, it is removed and the open is retried once. This handles the
/// common case where an unclean shutdown leaves a WAL file that prevents
/// reopening.
///
/// `memory_limit` and `threads` cap per-database resource usage (DuckDB
/// defaults to ~80% of system RAM and all cores, which is far too
/// aggressive for a store that serves point queries).
pub fn open_database(
    path: &Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<Database> {
    let conn = match duckdb::Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                tracing::warn!(
                    "database open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    let c = duckdb::Connection::open(path)?;
                    apply_resource_limits(&c, memory_limit, threads)?;
                    initialize_schema(&c)?;
                    return Ok(Arc::new(Mutex::new(c)));
                }
            }
            return Err(first_err.into());
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    initialize_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Open an in-memory database (for testing).
pub fn open_in_memory() -> StorageResult<Database> {
    let conn = duckdb::Connection::open_in_memory()?;
    initialize_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn apply_resource_limits(
    conn: &duckdb::Connection,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{}'; PRAGMA threads={};",
        memory_limit, threads
    ))?;
    Ok(())
}

fn initialize_schema(conn: &duckdb::Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            uuid VARCHAR PRIMARY KEY,
            email VARCHAR NOT NULL,
            encrypted_password VARCHAR NOT NULL,
            pw_func VARCHAR,
            pw_alg VARCHAR,
            pw_cost INTEGER,
            pw_key_size INTEGER,
            pw_nonce VARCHAR,
            pw_salt VARCHAR,
            version VARCHAR,
            num_failed_attempts INTEGER NOT NULL DEFAULT 0,
            locked_until BIGINT,
            updated_with_user_agent TEXT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        CREATE TABLE IF NOT EXISTS items (
            uuid VARCHAR PRIMARY KEY,
            user_uuid VARCHAR NOT NULL,
            content TEXT,
            content_type VARCHAR,
            enc_item_key TEXT,
            auth_hash VARCHAR,
            deleted BOOLEAN NOT NULL DEFAULT FALSE,
            last_user_agent TEXT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_user ON items(user_uuid);
        CREATE INDEX IF NOT EXISTS idx_items_user_type ON items(user_uuid, content_type);
        CREATE INDEX IF NOT EXISTS idx_items_updated ON items(updated_at);

        CREATE TABLE IF NOT EXISTS sessions (
            token_hash VARCHAR PRIMARY KEY,
            user_uuid VARCHAR NOT NULL,
            last_user_agent TEXT,
            created_at BIGINT NOT NULL,
            expires_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_uuid);

        CREATE TABLE IF NOT EXISTS extension_settings (
            uuid VARCHAR PRIMARY KEY,
            extension_id VARCHAR,
            mute_emails BOOLEAN NOT NULL DEFAULT FALSE,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_extension_settings_ext ON extension_settings(extension_id);
        "#,
    )?;
    Ok(())
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
