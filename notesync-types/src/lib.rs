//! Shared domain types for the notesync backend.
//!
//! The server stores opaque, client-encrypted items per user. Nothing in
//! this crate interprets item content — payload fields are ciphertext (or
//! client-defined tags) passed through verbatim.
//!
//! All persisted timestamps are epoch milliseconds (`i64`).

mod cursor;
mod ids;
mod item;
mod settings;
mod user;

pub use cursor::SyncCursor;
pub use ids::{ItemId, UserId};
pub use item::{Item, ItemState};
pub use settings::ExtensionSettings;
pub use user::{DerivationParams, User};
