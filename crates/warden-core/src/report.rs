//! Cycle outcome types

use std::fmt;

use crate::guard::GuardVerdict;

/// Corrective action dispatched during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Log reclamation under disk pressure
    Reclaim,
    /// Unit restart for an unhealthy actor
    Restart { actor: String, unit: String },
    /// Host reboot
    Reboot { reason: RebootReason },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RebootReason {
    Overload { load: f64 },
    Escalation { actor: String },
}

impl fmt::Display for RebootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebootReason::Overload { load } => write!(f, "load average {load}"),
            RebootReason::Escalation { actor } => write!(f, "restart budget of {actor} exhausted"),
        }
    }
}

/// What happened to one actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorOutcome {
    Healthy,
    /// No conclusive evidence; nothing done
    Indeterminate,
    Restarted,
    /// Unhealthy, budget spent, no escalation target
    Suppressed,
    Escalated,
    /// Ledger could not be written, action skipped
    LedgerUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorReport {
    pub name: String,
    pub outcome: ActorOutcome,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    /// True only if the guard said Proceed and every actor was healthy
    pub healthy: bool,
    pub guard: GuardVerdict,
    /// Dispatched actions, in order
    pub actions: Vec<Action>,
    /// Checked actors, in order; actors after a reboot are absent
    pub actors: Vec<ActorReport>,
}

impl CycleResult {
    #[must_use]
    pub fn blocked(&self) -> bool {
        matches!(self.guard, GuardVerdict::Block(_))
    }

    #[must_use]
    pub fn reboot_requested(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, Action::Reboot { .. }))
    }

    #[must_use]
    pub fn outcome(&self, actor: &str) -> Option<ActorOutcome> {
        self.actors
            .iter()
            .find(|r| r.name == actor)
            .map(|r| r.outcome)
    }
}
