//! Per-browser-extension settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settings for one installed browser extension. Independent lifecycle;
/// no cross-entity invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSettings {
    pub id: Uuid,
    pub extension_id: Option<String>,
    pub mute_emails: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
