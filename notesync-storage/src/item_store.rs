//! Encrypted item store.
//!
//! All operations are scoped to an owning user; ownership is immutable
//! after creation and a write referencing someone else's item fails with
//! `Forbidden` before any mutation. Soft delete keeps the row as a
//! tombstone (clients still need to learn of the deletion through sync)
//! but clears the payload columns so stale ciphertext is not retained.

use crate::clock::WriteClock;
use crate::error::{StorageError, StorageResult};
use crate::Database;
use duckdb::params;
use notesync_types::{Item, ItemId, ItemState, SyncCursor, UserId};

/// Client-supplied fields of an item write. Audit fields are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct ItemWrite {
    pub id: ItemId,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub enc_item_key: Option<String>,
    pub auth_hash: Option<String>,
    pub state: ItemState,
}

/// Result of applying one incoming sync item.
#[derive(Debug, Clone)]
pub enum IncomingOutcome {
    /// The write was applied; this is the stored copy.
    Applied(Item),
    /// The server row is newer than the client's declared base. The server
    /// copy (returned here) prevails; nothing was written.
    Conflict(Item),
}

/// DuckDB-backed item store.
#[derive(Clone)]
pub struct ItemStore {
    db: Database,
    clock: WriteClock,
}

impl ItemStore {
    /// Creates a store over the shared database, seeding the write clock
    /// from the largest stored `updated_at` so timestamps keep increasing
    /// across restarts.
    pub fn new(db: Database) -> StorageResult<Self> {
        let floor: i64 = {
            let conn = db.lock().unwrap();
            conn.query_row(
                "SELECT COALESCE(MAX(updated_at), 0) FROM items",
                [],
                |row| row.get(0),
            )?
        };
        Ok(Self {
            db,
            clock: WriteClock::seeded(floor),
        })
    }

    /// Inserts or updates an item for `user`.
    ///
    /// Fails with `Forbidden` if the id exists under a different owner.
    /// Inserts stamp `created_at = updated_at`; updates preserve
    /// `created_at` and advance `updated_at`.
    pub fn upsert(
        &self,
        user: &UserId,
        write: ItemWrite,
        user_agent: Option<&str>,
    ) -> StorageResult<Item> {
        let conn = self.db.lock().unwrap();
        let existing = fetch_item(&conn, &write.id)?;
        match existing {
            Some(ex) if ex.user_id != *user => Err(StorageError::Forbidden(format!(
                "item {} belongs to another user",
                write.id
            ))),
            Some(ex) => self.update_row(&conn, user, write, ex.created_at, user_agent),
            None => self.insert_row(&conn, user, write, user_agent),
        }
    }

    /// Applies one incoming sync item, comparing the server row against the
    /// client's declared base `updated_at`. The comparison and the write
    /// happen under a single connection lock hold, so concurrent pushes to
    /// the same item serialize.
    pub fn apply_incoming(
        &self,
        user: &UserId,
        write: ItemWrite,
        base_updated_at: Option<i64>,
        user_agent: Option<&str>,
    ) -> StorageResult<IncomingOutcome> {
        let conn = self.db.lock().unwrap();
        let existing = fetch_item(&conn, &write.id)?;
        match existing {
            Some(ex) if ex.user_id != *user => Err(StorageError::Forbidden(format!(
                "item {} belongs to another user",
                write.id
            ))),
            Some(ex) if ex.updated_at > base_updated_at.unwrap_or(0) => {
                Ok(IncomingOutcome::Conflict(ex))
            }
            Some(ex) => {
                let item = self.update_row(&conn, user, write, ex.created_at, user_agent)?;
                Ok(IncomingOutcome::Applied(item))
            }
            None => {
                let item = self.insert_row(&conn, user, write, user_agent)?;
                Ok(IncomingOutcome::Applied(item))
            }
        }
    }

    /// Tombstones an item and scrubs its payload.
    pub fn soft_delete(
        &self,
        user: &UserId,
        id: &ItemId,
        user_agent: Option<&str>,
    ) -> StorageResult<Item> {
        let conn = self.db.lock().unwrap();
        let existing = fetch_item(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("item {id}")))?;
        if existing.user_id != *user {
            return Err(StorageError::Forbidden(format!(
                "item {id} belongs to another user"
            )));
        }

        let now = self.clock.tick();
        conn.execute(
            "UPDATE items SET deleted = TRUE, content = NULL, enc_item_key = NULL, \
             auth_hash = NULL, last_user_agent = ?, updated_at = ? WHERE uuid = ?",
            params![user_agent, now, id.to_string()],
        )?;

        Ok(Item {
            content: None,
            enc_item_key: None,
            auth_hash: None,
            state: ItemState::Tombstoned,
            last_user_agent: user_agent.map(str::to_owned),
            updated_at: now,
            ..existing
        })
    }

    /// Fetches one item owned by `user`.
    pub fn get(&self, user: &UserId, id: &ItemId) -> StorageResult<Item> {
        let conn = self.db.lock().unwrap();
        let item = fetch_item(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("item {id}")))?;
        if item.user_id != *user {
            return Err(StorageError::Forbidden(format!(
                "item {id} belongs to another user"
            )));
        }
        Ok(item)
    }

    /// Keyset page of a user's items strictly after `cursor`, ordered
    /// ascending by `(updated_at, uuid)`.
    ///
    /// `updated_at` alone is not unique, so the item id breaks ties: a row
    /// qualifies when `updated_at > cursor.updated_at`, or when it equals
    /// it and the id is lexicographically greater than `cursor.item_id`.
    pub fn list_since(
        &self,
        user: &UserId,
        cursor: &SyncCursor,
        content_type: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Item>> {
        let conn = self.db.lock().unwrap();

        let mut sql = format!(
            "{SELECT_ITEM} WHERE user_uuid = ? \
             AND (updated_at > ? OR (updated_at = ? AND uuid > ?))"
        );
        if content_type.is_some() {
            sql.push_str(" AND content_type = ?");
        }
        sql.push_str(&format!(" ORDER BY updated_at ASC, uuid ASC LIMIT {limit}"));

        let mut stmt = conn.prepare(&sql)?;
        let items = match content_type {
            Some(ct) => stmt
                .query_map(
                    params![
                        user.to_string(),
                        cursor.updated_at,
                        cursor.updated_at,
                        cursor.item_id,
                        ct,
                    ],
                    row_to_item,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(
                    params![
                        user.to_string(),
                        cursor.updated_at,
                        cursor.updated_at,
                        cursor.item_id,
                    ],
                    row_to_item,
                )?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(items)
    }

    /// Number of items (including tombstones) owned by `user`.
    pub fn count(&self, user: &UserId) -> StorageResult<usize> {
        let conn = self.db.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE user_uuid = ?",
            params![user.to_string()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn insert_row(
        &self,
        conn: &duckdb::Connection,
        user: &UserId,
        write: ItemWrite,
        user_agent: Option<&str>,
    ) -> StorageResult<Item> {
        let now = self.clock.tick();
        let (content, enc_item_key, auth_hash) = payload_for_state(&write);
        conn.execute(
            r#"
            INSERT INTO items (
                uuid, user_uuid, content, content_type, enc_item_key, auth_hash,
                deleted, last_user_agent, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                write.id.to_string(),
                user.to_string(),
                content,
                write.content_type,
                enc_item_key,
                auth_hash,
                write.state.as_deleted_flag(),
                user_agent,
                now,
                now,
            ],
        )?;
        Ok(assembled(user, write, user_agent, now, now))
    }

    fn update_row(
        &self,
        conn: &duckdb::Connection,
        user: &UserId,
        write: ItemWrite,
        created_at: i64,
        user_agent: Option<&str>,
    ) -> StorageResult<Item> {
        let now = self.clock.tick();
        let (content, enc_item_key, auth_hash) = payload_for_state(&write);
        conn.execute(
            "UPDATE items SET content = ?, content_type = ?, enc_item_key = ?, \
             auth_hash = ?, deleted = ?, last_user_agent = ?, updated_at = ? \
             WHERE uuid = ?",
            params![
                content,
                write.content_type,
                enc_item_key,
                auth_hash,
                write.state.as_deleted_flag(),
                user_agent,
                now,
                write.id.to_string(),
            ],
        )?;
        Ok(assembled(user, write, user_agent, created_at, now))
    }
}

/// Tombstone writes carry no payload: clear ciphertext fields so the row
/// holds nothing but the deletion marker.
fn payload_for_state(
    write: &ItemWrite,
) -> (Option<&String>, Option<&String>, Option<&String>) {
    if write.state.is_tombstoned() {
        (None, None, None)
    } else {
        (
            write.content.as_ref(),
            write.enc_item_key.as_ref(),
            write.auth_hash.as_ref(),
        )
    }
}

fn assembled(
    user: &UserId,
    write: ItemWrite,
    user_agent: Option<&str>,
    created_at: i64,
    updated_at: i64,
) -> Item {
    let tombstoned = write.state.is_tombstoned();
    Item {
        id: write.id,
        user_id: *user,
        content: if tombstoned { None } else { write.content },
        content_type: write.content_type,
        enc_item_key: if tombstoned { None } else { write.enc_item_key },
        auth_hash: if tombstoned { None } else { write.auth_hash },
        state: write.state,
        last_user_agent: user_agent.map(str::to_owned),
        created_at,
        updated_at,
    }
}

const SELECT_ITEM: &str = "SELECT uuid, user_uuid, content, content_type, \
    enc_item_key, auth_hash, deleted, last_user_agent, created_at, updated_at \
    FROM items";

fn fetch_item(conn: &duckdb::Connection, id: &ItemId) -> StorageResult<Option<Item>> {
    let result = conn.query_row(
        &format!("{SELECT_ITEM} WHERE uuid = ?"),
        params![id.to_string()],
        row_to_item,
    );
    match result {
        Ok(item) => Ok(Some(item)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn row_to_item(row: &duckdb::Row<'_>) -> duckdb::Result<Item> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let id: ItemId = id_str.parse().map_err(|e: uuid::Error| {
        duckdb::Error::FromSqlConversionFailure(0, duckdb::types::Type::Text, Box::new(e))
    })?;
    let user_id: UserId = user_str.parse().map_err(|e: uuid::Error| {
        duckdb::Error::FromSqlConversionFailure(1, duckdb::types::Type::Text, Box::new(e))
    })?;
    let deleted: bool = row.get(6)?;
    Ok(Item {
        id,
        user_id,
        content: row.get(2)?,
        content_type: row.get(3)?,
        enc_item_key: row.get(4)?,
        auth_hash: row.get(5)?,
        state: ItemState::from_deleted_flag(deleted),
        last_user_agent: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
