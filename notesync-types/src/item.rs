//! Encrypted item records.

use crate::{ItemId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an item.
///
/// A tombstoned item is retained as a row so that clients who have not yet
/// seen the deletion learn of it through sync; it is never physically
/// removed from the delta stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Active,
    Tombstoned,
}

impl ItemState {
    pub fn is_tombstoned(&self) -> bool {
        matches!(self, ItemState::Tombstoned)
    }

    /// Maps to/from the persisted `deleted` boolean column.
    pub fn from_deleted_flag(deleted: bool) -> Self {
        if deleted {
            ItemState::Tombstoned
        } else {
            ItemState::Active
        }
    }

    pub fn as_deleted_flag(&self) -> bool {
        self.is_tombstoned()
    }
}

/// An opaque, client-encrypted record (note, tag, ...) owned by one user.
///
/// `content` and `enc_item_key` are ciphertext the server cannot parse;
/// `content_type` is a client-defined tag (e.g. "note"); `auth_hash` is a
/// legacy integrity field carried verbatim. Ownership never transfers after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub user_id: UserId,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub enc_item_key: Option<String>,
    pub auth_hash: Option<String>,
    pub state: ItemState,
    pub last_user_agent: Option<String>,
    /// Immutable creation time (epoch ms).
    pub created_at: i64,
    /// Monotonic write time (epoch ms) — the sync cursor field. Strictly
    /// increases on every write to the same item.
    pub updated_at: i64,
}

impl Item {
    /// The cursor position this item occupies in the delta stream.
    pub fn cursor(&self) -> crate::SyncCursor {
        crate::SyncCursor::new(self.updated_at, self.id)
    }
}
