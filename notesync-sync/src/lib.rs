//! Incremental sync for notesync.
//!
//! A sync exchange first applies client-submitted changes (push), then
//! computes the delta of items the client has not yet seen (pull), keyed
//! by an `(updated_at, id)` cursor. Conflicts resolve last-writer-wins at
//! item granularity: the server copy prevails and the rejected client copy
//! is reported back per item, never silently dropped.
//!
//! Every operation is gated by [`AccessGuard`] behind a session token.

mod engine;
mod error;
mod guard;

pub use engine::{Delta, IncomingItem, PushOutcome, SyncConfig, SyncConflict, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use guard::AccessGuard;
