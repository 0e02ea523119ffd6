//! In-process key/value store.

use std::collections::HashMap;

use crate::error::Result;

use super::{PersistenceStore, Scope};

/// A [`PersistenceStore`] that lives only as long as the process.
///
/// Session values never expire on their own; call
/// [`MemoryStore::end_session`] to drop them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    durable: HashMap<String, String>,
    session: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every session-scoped value.
    pub fn end_session(&mut self) {
        self.session.clear();
    }

    fn scope(&self, scope: Scope) -> &HashMap<String, String> {
        match scope {
            Scope::Durable => &self.durable,
            Scope::Session => &self.session,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut HashMap<String, String> {
        match scope {
            Scope::Durable => &mut self.durable,
            Scope::Session => &mut self.session,
        }
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        Ok(self.scope(scope).get(key).cloned())
    }

    fn set(&mut self, scope: Scope, key: &str, value: &str) -> Result<()> {
        self.scope_mut(scope)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, scope: Scope, key: &str) -> Result<()> {
        self.scope_mut(scope).remove(key);
        Ok(())
    }
}
