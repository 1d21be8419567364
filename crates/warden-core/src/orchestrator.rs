//! `Orchestrator`: runs one check cycle
//!
//! Resource guard first, then every actor in declaration order. Unhealthy
//! actors consume a ledger slot and get the remedy chosen by the escalation
//! policy. A reboot ends the cycle on the spot.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::actor::Actor;
use crate::clock::Clock;
use crate::config::SupervisorConfig;
use crate::escalation::{EscalationPolicy, Remedy};
use crate::guard::{BlockReason, GuardVerdict, ResourceGuard, ResourceSnapshot};
use crate::host::HostOps;
use crate::ledger::{LedgerStore, RestartLedger};
use crate::probe::HealthVerdict;
use crate::report::{Action, ActorOutcome, ActorReport, CycleResult, RebootReason};
use crate::state::CyclePhase;

/// Runs check cycles against a fixed configuration
pub struct Orchestrator<'a> {
    config: &'a SupervisorConfig,
    actors: Vec<Actor>,
    host: Arc<dyn HostOps>,
    ledger: RestartLedger,
    escalation: EscalationPolicy,
    guard: ResourceGuard,
    clock: Arc<dyn Clock>,
}

/// Mutable bookkeeping for the cycle in progress
struct Cycle {
    phase: CyclePhase,
    healthy: bool,
    guard: GuardVerdict,
    actions: Vec<Action>,
    actors: Vec<ActorReport>,
}

impl Cycle {
    fn new() -> Self {
        Self {
            phase: CyclePhase::Start,
            healthy: true,
            guard: GuardVerdict::Proceed,
            actions: Vec::new(),
            actors: Vec::new(),
        }
    }

    fn transition_to(&mut self, next: CyclePhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid cycle transition {} -> {}",
            self.phase,
            next
        );
        debug!(from = %self.phase, to = %next, "cycle transition");
        self.phase = next;
    }

    fn finish(self) -> CycleResult {
        debug_assert!(self.phase.is_terminal());
        CycleResult {
            healthy: self.healthy,
            guard: self.guard,
            actions: self.actions,
            actors: self.actors,
        }
    }
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a SupervisorConfig,
        host: Arc<dyn HostOps>,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            actors: config
                .actors
                .iter()
                .map(|a| Actor::from_config(a, &config.ledger))
                .collect(),
            host,
            ledger: RestartLedger::new(store),
            escalation: EscalationPolicy::from_actors(&config.actors),
            guard: ResourceGuard::new(config.guard.clone()),
            clock,
        }
    }

    /// Number of supervised actors
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Run one full cycle. Never fails: every problem ends up in the result
    /// and the log.
    #[instrument(skip(self), name = "cycle")]
    pub async fn run_cycle(&self) -> CycleResult {
        let mut cycle = Cycle::new();

        cycle.transition_to(CyclePhase::ResourceCheck);
        let snapshot = self.sample_resources(&mut cycle).await;
        cycle.guard = self.guard.evaluate(&snapshot);

        match cycle.guard {
            GuardVerdict::Block(reason) => {
                cycle.healthy = false;
                match reason {
                    BlockReason::Overload { load } => {
                        warn!(load, max = self.config.guard.max_sysload, "host overloaded, skipping checks");
                        self.reboot(&mut cycle, RebootReason::Overload { load })
                            .await;
                    }
                    BlockReason::DiskCritical { used_percent } => {
                        error!(
                            used_percent,
                            max = self.config.guard.disk_crit,
                            "disk almost full, corrective actions blocked"
                        );
                    }
                    BlockReason::DiskUnknown => {
                        error!("disk usage unknown, corrective actions blocked");
                    }
                }
                cycle.transition_to(CyclePhase::Blocked);
                return cycle.finish();
            }
            GuardVerdict::Degrade { used_percent } => {
                cycle.healthy = false;
                warn!(used_percent, "disk usage high, reclaiming log space");
                if let Err(e) = self.host.reclaim_logs(&self.config.reclaim).await {
                    warn!(error = %e, "log reclamation incomplete");
                }
                cycle.actions.push(Action::Reclaim);
            }
            GuardVerdict::Proceed => {}
        }

        cycle.transition_to(CyclePhase::PerActorCheck);
        for actor in &self.actors {
            let outcome = self.check_actor(actor, &mut cycle).await;
            cycle.actors.push(ActorReport {
                name: actor.name.clone(),
                outcome,
            });

            if outcome == ActorOutcome::Escalated {
                cycle.transition_to(CyclePhase::Rebooting);
                return cycle.finish();
            }
        }

        cycle.transition_to(CyclePhase::Summarize);
        if cycle.healthy {
            info!(actors = self.actors.len(), "all checks passed");
        } else {
            info!(actions = cycle.actions.len(), "cycle finished with problems");
        }
        cycle.transition_to(CyclePhase::Done);

        cycle.finish()
    }

    /// Readings that fail are left out for the guard to judge
    async fn sample_resources(&self, cycle: &mut Cycle) -> ResourceSnapshot {
        let disk_used_percent = match self.host.disk_used_percent().await {
            Ok(percent) => Some(percent),
            Err(e) => {
                warn!(error = %e, "could not read disk usage");
                cycle.healthy = false;
                None
            }
        };

        let system_load_1m = match self.host.load_average().await {
            Ok(load) => Some(load),
            Err(e) => {
                warn!(error = %e, "could not read load average");
                cycle.healthy = false;
                None
            }
        };

        ResourceSnapshot {
            disk_used_percent,
            system_load_1m,
        }
    }

    async fn check_actor(&self, actor: &Actor, cycle: &mut Cycle) -> ActorOutcome {
        let verdict = actor
            .evaluate(self.host.as_ref(), self.config.timeouts.probe_deadline())
            .await;

        match verdict {
            HealthVerdict::Healthy => return ActorOutcome::Healthy,
            HealthVerdict::Indeterminate => {
                info!(actor = %actor.name, "health indeterminate, no action taken");
                cycle.healthy = false;
                return ActorOutcome::Indeterminate;
            }
            HealthVerdict::Unhealthy => cycle.healthy = false,
        }

        let ledger_allows = match self
            .ledger
            .should_act(&actor.name, self.clock.now(), &actor.budget)
            .await
        {
            Ok(allows) => allows,
            Err(e) => {
                error!(actor = %actor.name, error = %e, "cannot record restart attempt, skipping action");
                return ActorOutcome::LedgerUnavailable;
            }
        };

        match self.escalation.decide(&actor.name, ledger_allows) {
            Remedy::Restart => {
                warn!(actor = %actor.name, unit = %actor.restart_unit, "actor unhealthy, restarting");
                if let Err(e) = self.host.restart_service(&actor.restart_unit).await {
                    warn!(actor = %actor.name, error = %e, "restart request failed");
                }
                cycle.actions.push(Action::Restart {
                    actor: actor.name.clone(),
                    unit: actor.restart_unit.clone(),
                });
                ActorOutcome::Restarted
            }
            Remedy::Suppress => {
                error!(
                    actor = %actor.name,
                    max = actor.budget.max_restarts,
                    "restart limit exceeded, skipping"
                );
                ActorOutcome::Suppressed
            }
            Remedy::Escalate => {
                error!(actor = %actor.name, "restart limit exceeded, escalating to host reboot");
                self.reboot(
                    cycle,
                    RebootReason::Escalation {
                        actor: actor.name.clone(),
                    },
                )
                .await;
                ActorOutcome::Escalated
            }
        }
    }

    async fn reboot(&self, cycle: &mut Cycle, reason: RebootReason) {
        warn!(reason = %reason, "rebooting host");
        if let Err(e) = self.host.reboot_host().await {
            error!(error = %e, "reboot request failed");
        }
        cycle.actions.push(Action::Reboot { reason });
    }
}
