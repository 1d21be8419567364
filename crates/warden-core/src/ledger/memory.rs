//! In-memory ledger store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LedgerEntry, LedgerStore};
use crate::error::LedgerError;

/// Ledger store kept in a map, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actors with recorded history
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LedgerEntry>> {
        // A poisoned map still holds valid entries
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, name: &str) -> Option<LedgerEntry> {
        self.lock().get(name).copied()
    }

    async fn put(&self, name: &str, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.lock().insert(name.to_string(), entry);
        Ok(())
    }
}
