//! Supervised actors and composite probe evaluation

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{ActorConfig, LedgerConfig};
use crate::host::HostOps;
use crate::ledger::RestartBudget;
use crate::probe::{self, HealthVerdict, Probe};

/// A named unit under supervision
pub struct Actor {
    pub name: String,
    pub restart_unit: String,
    pub budget: RestartBudget,
    probes: Vec<Box<dyn Probe>>,
}

impl Actor {
    pub fn new(
        name: impl Into<String>,
        restart_unit: impl Into<String>,
        budget: RestartBudget,
        probes: Vec<Box<dyn Probe>>,
    ) -> Self {
        Self {
            name: name.into(),
            restart_unit: restart_unit.into(),
            budget,
            probes,
        }
    }

    pub fn from_config(config: &ActorConfig, ledger: &LedgerConfig) -> Self {
        Self::new(
            &config.name,
            &config.restart_unit,
            config.budget(ledger),
            config.probes.iter().map(probe::build).collect(),
        )
    }

    /// Evaluate probes in order, each bounded by `deadline`.
    ///
    /// The first Unhealthy verdict ends the chain. An Indeterminate verdict
    /// only ends it when it comes from a gating probe; otherwise the rest of
    /// the chain still runs and the actor is Indeterminate unless a later
    /// probe is Unhealthy.
    pub async fn evaluate(&self, host: &dyn HostOps, deadline: Duration) -> HealthVerdict {
        let mut indeterminate = false;
        for probe in &self.probes {
            let verdict = match timeout(deadline, probe.evaluate(host)).await {
                Ok(verdict) => verdict,
                Err(_) => {
                    let verdict = probe.failure_verdict();
                    warn!(
                        actor = %self.name,
                        probe = %probe.describe(),
                        deadline = ?deadline,
                        verdict = %verdict,
                        "probe deadline exceeded"
                    );
                    verdict
                }
            };

            debug!(actor = %self.name, probe = %probe.describe(), verdict = %verdict, "probe evaluated");

            match verdict {
                HealthVerdict::Healthy => {}
                HealthVerdict::Unhealthy => return verdict,
                HealthVerdict::Indeterminate if probe.is_gate() => {
                    debug!(
                        actor = %self.name,
                        probe = %probe.describe(),
                        "precondition not met, skipping remaining probes"
                    );
                    return verdict;
                }
                HealthVerdict::Indeterminate => indeterminate = true,
            }
        }

        if indeterminate {
            HealthVerdict::Indeterminate
        } else {
            HealthVerdict::Healthy
        }
    }
}
