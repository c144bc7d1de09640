//! Sync cursor.

use crate::ItemId;
use serde::{Deserialize, Serialize};

/// A position in a user's delta stream: the `(updated_at, id)` pair of the
/// last item a client has seen.
///
/// `updated_at` alone is not strictly unique across items, so the item id
/// breaks ties. Field order gives the derived `Ord` the pagination order:
/// `updated_at` first, id string second.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash,
)]
pub struct SyncCursor {
    pub updated_at: i64,
    /// Canonical string form of the item id; empty for the initial cursor.
    pub item_id: String,
}

impl SyncCursor {
    /// The cursor a client starts from: everything is newer than this.
    pub fn initial() -> Self {
        Self::default()
    }

    pub fn new(updated_at: i64, item_id: ItemId) -> Self {
        Self {
            updated_at,
            item_id: item_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_timestamp_then_id() {
        let a = SyncCursor {
            updated_at: 10,
            item_id: "b".into(),
        };
        let b = SyncCursor {
            updated_at: 10,
            item_id: "c".into(),
        };
        let c = SyncCursor {
            updated_at: 11,
            item_id: "a".into(),
        };
        assert!(a < b);
        assert!(b < c);
        assert!(SyncCursor::initial() < a);
    }
}
