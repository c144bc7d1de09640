//! Access guard: every repository and sync operation resolved through a
//! session token.

use crate::engine::{Delta, IncomingItem, PushOutcome, SyncEngine};
use crate::error::SyncResult;
use notesync_auth::{CredentialStore, SessionManager, SessionToken};
use notesync_storage::ItemWrite;
use notesync_types::{Item, ItemId, SyncCursor, UserId};
use tracing::warn;

/// Gates the item repository and sync engine behind an authenticated
/// identity.
///
/// Each call resolves the presented token to a `UserId` first
/// (`Unauthenticated` otherwise); item ownership is then enforced by the
/// stores, which reject foreign ids with `Forbidden` before any mutation.
#[derive(Clone)]
pub struct AccessGuard {
    credentials: CredentialStore,
    sessions: SessionManager,
    engine: SyncEngine,
}

impl AccessGuard {
    pub fn new(
        credentials: CredentialStore,
        sessions: SessionManager,
        engine: SyncEngine,
    ) -> Self {
        Self {
            credentials,
            sessions,
            engine,
        }
    }

    /// Validates credentials and issues a session token.
    pub fn login(
        &self,
        email: &str,
        encrypted_password: &str,
        user_agent: Option<&str>,
    ) -> SyncResult<SessionToken> {
        let user = self
            .credentials
            .authenticate(email, encrypted_password, user_agent)?;
        Ok(self.sessions.issue(&user, user_agent)?)
    }

    /// Revokes the presented session.
    pub fn logout(&self, token: &SessionToken) -> SyncResult<()> {
        self.sessions.revoke(token)?;
        Ok(())
    }

    /// Resolves a token to the user it authenticates.
    pub fn resolve(&self, token: &SessionToken) -> SyncResult<UserId> {
        match self.sessions.resolve(token) {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!("rejected request with invalid session token");
                Err(e.into())
            }
        }
    }

    pub fn push(
        &self,
        token: &SessionToken,
        incoming: Vec<IncomingItem>,
        user_agent: Option<&str>,
    ) -> SyncResult<PushOutcome> {
        let user = self.resolve(token)?;
        self.engine.push(&user, incoming, user_agent)
    }

    pub fn pull(
        &self,
        token: &SessionToken,
        cursor: &SyncCursor,
        content_type: Option<&str>,
        limit: usize,
    ) -> SyncResult<Delta> {
        let user = self.resolve(token)?;
        self.engine.pull(&user, cursor, content_type, limit)
    }

    pub fn exchange(
        &self,
        token: &SessionToken,
        incoming: Vec<IncomingItem>,
        cursor: &SyncCursor,
        content_type: Option<&str>,
        limit: usize,
        user_agent: Option<&str>,
    ) -> SyncResult<(PushOutcome, Delta)> {
        let user = self.resolve(token)?;
        self.engine
            .exchange(&user, incoming, cursor, content_type, limit, user_agent)
    }

    pub fn upsert(
        &self,
        token: &SessionToken,
        write: ItemWrite,
        user_agent: Option<&str>,
    ) -> SyncResult<Item> {
        let user = self.resolve(token)?;
        Ok(self.engine.item_store().upsert(&user, write, user_agent)?)
    }

    pub fn soft_delete(
        &self,
        token: &SessionToken,
        id: &ItemId,
        user_agent: Option<&str>,
    ) -> SyncResult<Item> {
        let user = self.resolve(token)?;
        Ok(self
            .engine
            .item_store()
            .soft_delete(&user, id, user_agent)?)
    }

    pub fn get(&self, token: &SessionToken, id: &ItemId) -> SyncResult<Item> {
        let user = self.resolve(token)?;
        Ok(self.engine.item_store().get(&user, id)?)
    }
}
