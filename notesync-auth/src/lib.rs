//! Credential and session layer for notesync.
//!
//! The server never runs password derivation itself: clients derive a login
//! key from algorithm parameters the server hands out pre-auth, and the
//! server compares the derived secret against its stored copy in constant
//! time. Repeated failures lock the account for a policy-determined window.

mod credential;
mod error;
mod lockout;
mod session;

pub use credential::CredentialStore;
pub use error::{AuthError, AuthResult};
pub use lockout::LockoutPolicy;
pub use session::{SessionManager, SessionToken};
