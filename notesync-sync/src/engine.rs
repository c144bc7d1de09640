//! Sync engine: push, pull, exchange.

use crate::error::SyncResult;
use notesync_storage::{IncomingOutcome, ItemStore, ItemWrite};
use notesync_types::{Item, ItemId, ItemState, SyncCursor, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sync pagination bounds.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Page size used when the caller asks for 0.
    pub default_page_size: usize,
    /// Hard ceiling on a single pull page; keeps responses bounded and
    /// hands backpressure control to the caller.
    pub max_page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 500,
        }
    }
}

/// One client-submitted item in a push.
///
/// `base_updated_at` is the server `updated_at` the client last saw for
/// this item (`None` when the client believes it is creating the item).
/// The payload fields mirror the item record and stay opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingItem {
    pub id: ItemId,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub enc_item_key: Option<String>,
    pub auth_hash: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    pub base_updated_at: Option<i64>,
}

impl IncomingItem {
    fn into_write(self) -> (ItemWrite, Option<i64>) {
        let base = self.base_updated_at;
        let write = ItemWrite {
            id: self.id,
            content: self.content,
            content_type: self.content_type,
            enc_item_key: self.enc_item_key,
            auth_hash: self.auth_hash,
            state: ItemState::from_deleted_flag(self.deleted),
        };
        (write, base)
    }
}

/// A push rejection: the server row was newer than the client's base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    /// The prevailing server copy.
    pub server_item: Item,
    /// The rejected client submission, echoed back for re-resolution.
    pub client_item: IncomingItem,
}

/// Result of a push: what was applied, and what conflicted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushOutcome {
    pub saved: Vec<Item>,
    pub conflicts: Vec<SyncConflict>,
}

/// One page of a user's delta stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    pub items: Vec<Item>,
    /// Cursor to resume from: the last returned `(updated_at, id)`, or the
    /// request cursor unchanged when `items` is empty (sync complete).
    pub cursor: SyncCursor,
}

impl Delta {
    /// Whether the stream is exhausted at this cursor.
    pub fn is_complete(&self) -> bool {
        self.items.is_empty()
    }
}

/// Computes deltas and applies client pushes against the item store.
///
/// The engine is stateless between calls: sync progress lives entirely in
/// the cursor the client holds, so an abandoned pagination needs no
/// server-side cleanup.
#[derive(Clone)]
pub struct SyncEngine {
    items: ItemStore,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(items: ItemStore, config: SyncConfig) -> Self {
        Self { items, config }
    }

    pub fn item_store(&self) -> &ItemStore {
        &self.items
    }

    /// Applies client-submitted items one at a time.
    ///
    /// An item whose server row is newer than the client's declared base is
    /// recorded as a conflict — the server copy prevails and the client
    /// copy is echoed back. Ids unknown to the server are new creations.
    pub fn push(
        &self,
        user: &UserId,
        incoming: Vec<IncomingItem>,
        user_agent: Option<&str>,
    ) -> SyncResult<PushOutcome> {
        let mut outcome = PushOutcome::default();
        for item in incoming {
            let echo = item.clone();
            let (write, base) = item.into_write();
            match self.items.apply_incoming(user, write, base, user_agent)? {
                IncomingOutcome::Applied(saved) => outcome.saved.push(saved),
                IncomingOutcome::Conflict(server_item) => {
                    outcome.conflicts.push(SyncConflict {
                        server_item,
                        client_item: echo,
                    });
                }
            }
        }
        if !outcome.conflicts.is_empty() {
            info!(
                user = %user,
                saved = outcome.saved.len(),
                conflicts = outcome.conflicts.len(),
                "push completed with conflicts"
            );
        } else {
            debug!(user = %user, saved = outcome.saved.len(), "push completed");
        }
        Ok(outcome)
    }

    /// Returns the next page of items after `cursor`.
    ///
    /// Repeated pulls with the returned cursor never skip an item; an item
    /// whose `updated_at` collides with the cursor boundary may be
    /// re-delivered, and clients de-duplicate by id.
    pub fn pull(
        &self,
        user: &UserId,
        cursor: &SyncCursor,
        content_type: Option<&str>,
        limit: usize,
    ) -> SyncResult<Delta> {
        let limit = self.clamp_limit(limit);
        let items = self.items.list_since(user, cursor, content_type, limit)?;
        let next = items
            .last()
            .map(Item::cursor)
            .unwrap_or_else(|| cursor.clone());
        debug!(user = %user, page = items.len(), "pull page computed");
        Ok(Delta {
            items,
            cursor: next,
        })
    }

    /// One full sync exchange: apply the client's changes, then hand back
    /// the delta since its cursor. Items applied here may appear in the
    /// returned delta; clients de-duplicate by id.
    pub fn exchange(
        &self,
        user: &UserId,
        incoming: Vec<IncomingItem>,
        cursor: &SyncCursor,
        content_type: Option<&str>,
        limit: usize,
        user_agent: Option<&str>,
    ) -> SyncResult<(PushOutcome, Delta)> {
        let outcome = self.push(user, incoming, user_agent)?;
        let delta = self.pull(user, cursor, content_type, limit)?;
        Ok((outcome, delta))
    }

    fn clamp_limit(&self, limit: usize) -> usize {
        if limit == 0 {
            self.config.default_page_size
        } else {
            limit.min(self.config.max_page_size)
        }
    }
}
