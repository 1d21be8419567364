//! Restart ledger: per-actor anti-flap accounting
//!
//! The process keeps nothing in memory between invocations, so every
//! decision is a read-modify-write against a [`LedgerStore`]. Entries are
//! never deleted; an entry older than the actor's window simply stops
//! counting.

mod file;
mod memory;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::LedgerError;

pub use file::FileLedgerStore;
pub use memory::MemoryLedgerStore;

/// Characters an actor name may use as a ledger key. Anything else would be
/// rewritten in the entry's file name and could collide with another actor.
#[must_use]
pub fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-')
}

/// Persisted attempt counter for one actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Attempts recorded in the current window
    pub failure_count: u32,
    /// When the last attempt was recorded (epoch seconds)
    pub last_action_epoch: i64,
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.failure_count, self.last_action_epoch)
    }
}

impl FromStr for LedgerEntry {
    type Err = LedgerError;

    /// Parses `"<count> <epochSeconds>"`; anything else is corrupt
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let corrupt = || LedgerError::Corrupt(s.to_string());

        let mut parts = s.split_whitespace();
        let (Some(count), Some(epoch), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(corrupt());
        };

        Ok(Self {
            failure_count: count.parse().map_err(|_| corrupt())?,
            last_action_epoch: epoch.parse().map_err(|_| corrupt())?,
        })
    }
}

/// Key-value storage for ledger entries
///
/// `get` never fails: unreadable or malformed state is reported as `None`
/// (no history). Only `put` can fail, and a failed `put` means the caller must
/// not act.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, name: &str) -> Option<LedgerEntry>;
    async fn put(&self, name: &str, entry: LedgerEntry) -> Result<(), LedgerError>;
}

/// How many restarts an actor may consume per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartBudget {
    pub max_restarts: u32,
    pub reset_interval_secs: u64,
}

/// Anti-flap rate limiter on top of a [`LedgerStore`]
#[derive(Clone)]
pub struct RestartLedger {
    store: Arc<dyn LedgerStore>,
}

impl RestartLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Record one remediation attempt for `name` at `now` and report whether
    /// it fits in the budget.
    ///
    /// Every call consumes a slot whether or not the caller goes on to act.
    /// An entry whose last attempt is more than `reset_interval_secs` old is
    /// discarded before counting.
    ///
    /// # Errors
    /// Returns `LedgerError::Persistence` if the updated entry could not be
    /// stored. The attempt must then be skipped.
    pub async fn should_act(
        &self,
        name: &str,
        now: i64,
        budget: &RestartBudget,
    ) -> Result<bool, LedgerError> {
        let previous = self.store.get(name).await.unwrap_or_default();

        let elapsed = now.saturating_sub(previous.last_action_epoch);
        let window = i64::try_from(budget.reset_interval_secs).unwrap_or(i64::MAX);
        let carried = if elapsed > window {
            0
        } else {
            previous.failure_count
        };

        let entry = LedgerEntry {
            failure_count: carried.saturating_add(1),
            last_action_epoch: now,
        };
        self.store.put(name, entry).await?;

        let allowed = entry.failure_count <= budget.max_restarts;
        if allowed {
            debug!(
                actor = %name,
                attempt = entry.failure_count,
                max = budget.max_restarts,
                "restart budget available"
            );
        } else {
            warn!(
                actor = %name,
                attempt = entry.failure_count,
                max = budget.max_restarts,
                "restart limit exceeded"
            );
        }

        Ok(allowed)
    }
}
