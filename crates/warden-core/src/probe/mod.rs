//! Health probes
//!
//! A probe gathers one piece of health evidence about an actor. Probes never
//! fail outward: an error from the host layer becomes the probe's
//! [`Probe::failure_verdict`].

mod link;
mod log_pattern;
mod reachability;
mod service;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::ProbeConfig;
use crate::error::HostError;
use crate::host::HostOps;

pub use link::LinkPresentProbe;
pub use log_pattern::LogPatternProbe;
pub use reachability::ReachabilityProbe;
pub use service::ServiceActiveProbe;

/// Outcome of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    Unhealthy,
    /// Not enough evidence either way
    Indeterminate,
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthVerdict::Healthy => "healthy",
            HealthVerdict::Unhealthy => "unhealthy",
            HealthVerdict::Indeterminate => "indeterminate",
        };
        f.write_str(s)
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// Human-readable description used in logs
    fn describe(&self) -> String;

    /// Verdict when the probe cannot complete (error or deadline)
    fn failure_verdict(&self) -> HealthVerdict;

    /// A gating probe is a precondition for the probes after it: when it is
    /// not Healthy the rest of the chain is skipped.
    fn is_gate(&self) -> bool {
        false
    }

    /// Gather evidence from the host
    async fn check(&self, host: &dyn HostOps) -> Result<HealthVerdict, HostError>;

    /// Run the probe, folding errors into [`Probe::failure_verdict`]
    async fn evaluate(&self, host: &dyn HostOps) -> HealthVerdict {
        match self.check(host).await {
            Ok(verdict) => verdict,
            Err(e) => {
                let verdict = self.failure_verdict();
                warn!(
                    probe = %self.describe(),
                    error = %e,
                    timed_out = e.is_timeout(),
                    verdict = %verdict,
                    "probe could not complete"
                );
                verdict
            }
        }
    }
}

/// Build the probe described by `config`
#[must_use]
pub fn build(config: &ProbeConfig) -> Box<dyn Probe> {
    match config {
        ProbeConfig::ServiceActive { unit } => Box::new(ServiceActiveProbe::new(unit)),
        ProbeConfig::LinkPresent { interface } => Box::new(LinkPresentProbe::new(interface)),
        ProbeConfig::Reachability {
            target,
            interface,
            count,
            timeout_secs,
        } => Box::new(ReachabilityProbe::new(
            target,
            interface.clone(),
            *count,
            Duration::from_secs(*timeout_secs),
        )),
        ProbeConfig::LogPattern {
            unit,
            window,
            pattern,
        } => Box::new(LogPatternProbe::new(unit, *window, pattern)),
    }
}
