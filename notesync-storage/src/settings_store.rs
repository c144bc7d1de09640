//! Extension settings store. A trivial per-extension flag store with an
//! independent lifecycle.

use crate::error::{StorageError, StorageResult};
use crate::Database;
use duckdb::params;
use notesync_types::ExtensionSettings;
use uuid::Uuid;

#[derive(Clone)]
pub struct ExtensionSettingsStore {
    db: Database,
}

impl ExtensionSettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        extension_id: Option<&str>,
        mute_emails: bool,
    ) -> StorageResult<ExtensionSettings> {
        let conn = self.db.lock().unwrap();
        let id = Uuid::new_v4();
        let now = crate::now_ms();
        conn.execute(
            "INSERT INTO extension_settings (uuid, extension_id, mute_emails, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
            params![id.to_string(), extension_id, mute_emails, now, now],
        )?;
        Ok(ExtensionSettings {
            id,
            extension_id: extension_id.map(str::to_owned),
            mute_emails,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get(&self, id: &Uuid) -> StorageResult<Option<ExtensionSettings>> {
        let conn = self.db.lock().unwrap();
        let result = conn.query_row(
            "SELECT uuid, extension_id, mute_emails, created_at, updated_at \
             FROM extension_settings WHERE uuid = ?",
            params![id.to_string()],
            row_to_settings,
        );
        match result {
            Ok(settings) => Ok(Some(settings)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_mute_emails(&self, id: &Uuid, mute_emails: bool) -> StorageResult<()> {
        let conn = self.db.lock().unwrap();
        let updated = conn.execute(
            "UPDATE extension_settings SET mute_emails = ?, updated_at = ? WHERE uuid = ?",
            params![mute_emails, crate::now_ms(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("extension settings {id}")));
        }
        Ok(())
    }
}

fn row_to_settings(row: &duckdb::Row<'_>) -> duckdb::Result<ExtensionSettings> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str).map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(0, duckdb::types::Type::Text, Box::new(e))
    })?;
    Ok(ExtensionSettings {
        id,
        extension_id: row.get(1)?,
        mute_emails: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}
