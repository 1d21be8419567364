//! warden-core: Supervision policy for a single host
//!
//! Probes actors, rate-limits restarts through a persistent ledger, escalates
//! to a reboot when a restart budget is spent, and gates every cycle on disk
//! and load.

pub mod actor;
pub mod clock;
pub mod config;
pub mod error;
pub mod escalation;
pub mod guard;
pub mod host;
pub mod ledger;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod state;

#[cfg(test)]
mod test_support;

pub use actor::Actor;
pub use clock::{Clock, SystemClock};
pub use config::{
    ActorConfig, GuardThresholds, LedgerConfig, ProbeConfig, ReclaimPolicy, SupervisorConfig,
    TimeoutConfig,
};
pub use error::{CoreError, HostError, LedgerError};
pub use escalation::{EscalationPolicy, Remedy};
pub use guard::{BlockReason, GuardVerdict, ResourceGuard, ResourceSnapshot};
pub use host::{HostOps, PingSpec, SystemHost};
pub use ledger::{
    FileLedgerStore, LedgerEntry, LedgerStore, MemoryLedgerStore, RestartBudget, RestartLedger,
};
pub use orchestrator::Orchestrator;
pub use probe::{HealthVerdict, Probe};
pub use report::{Action, ActorOutcome, ActorReport, CycleResult, RebootReason};
pub use state::CyclePhase;
