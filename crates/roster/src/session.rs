//! Sign-in gate.
//!
//! The login is an identity stamp, not authentication: any non-empty email
//! is accepted, the display name is its local part, and the role is
//! `admin` whenever the email contains the text `admin`. Nothing here is a
//! security boundary.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::storage::{self, PersistenceStore};

/// What a signed-in identity may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May export the roster.
    Admin,
    /// Everything except export.
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// The signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The email as entered (trimmed).
    pub email: String,
    /// Local part of the email.
    pub name: String,
    /// Derived role.
    pub role: Role,
}

impl Session {
    /// Derive a session from a raw email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEmail`] if the trimmed input is empty.
    pub fn from_email(email: &str) -> Result<Self> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::EmptyEmail);
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        let role = if email.contains("admin") {
            Role::Admin
        } else {
            Role::User
        };
        Ok(Self {
            email: email.to_string(),
            name,
            role,
        })
    }

    /// Whether this identity may export the roster.
    #[must_use]
    pub fn can_export(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Holds the current session and keeps the store in step with it.
#[derive(Debug, Default)]
pub struct SessionGuard {
    current: Option<Session>,
}

impl SessionGuard {
    /// A guard with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEmail`] for a blank email, or a storage error if
    /// the session cannot be persisted. Nothing changes on error.
    pub fn login<S: PersistenceStore + ?Sized>(
        &mut self,
        store: &mut S,
        email: &str,
    ) -> Result<&Session> {
        let session = Session::from_email(email)?;
        storage::save_session(store, &session)?;
        info!(role = %session.role, "Signed in as {}", session.name);
        Ok(self.current.insert(session))
    }

    /// Sign out and forget the persisted session.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be removed.
    pub fn logout<S: PersistenceStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        storage::clear_session(store)?;
        if let Some(session) = self.current.take() {
            info!("Signed out {}", session.name);
        }
        Ok(())
    }

    /// Restore a persisted session at startup.
    ///
    /// A persisted session that cannot be decoded is discarded with a
    /// warning rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read or cleaned up.
    pub fn restore<S: PersistenceStore + ?Sized>(&mut self, store: &mut S) -> Result<Option<&Session>> {
        match storage::load_session(store) {
            Ok(restored) => self.current = restored,
            Err(Error::CorruptValue { key, source }) => {
                warn!("Discarding unreadable session under '{}': {}", key, source);
                storage::clear_session(store)?;
                self.current = None;
            }
            Err(e) => return Err(e),
        }
        Ok(self.current.as_ref())
    }
}
