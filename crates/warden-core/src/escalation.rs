//! Escalation policy: what to do once a probe has failed

use std::collections::HashSet;
use std::fmt;

use crate::config::ActorConfig;

/// Corrective action chosen for an unhealthy actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    /// Restart the actor's unit
    Restart,
    /// Budget spent on an escalation-eligible actor: reboot the host
    Escalate,
    /// Budget spent and no safe escalation target: log only
    Suppress,
}

impl fmt::Display for Remedy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Remedy::Restart => "restart",
            Remedy::Escalate => "escalate",
            Remedy::Suppress => "suppress",
        };
        f.write_str(s)
    }
}

/// Knows which actors may escalate to a host reboot
#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    eligible: HashSet<String>,
}

impl EscalationPolicy {
    pub fn new<I, S>(eligible: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            eligible: eligible.into_iter().map(Into::into).collect(),
        }
    }

    /// Policy for the actors flagged `escalate = true`
    #[must_use]
    pub fn from_actors(actors: &[ActorConfig]) -> Self {
        Self::new(
            actors
                .iter()
                .filter(|a| a.escalate)
                .map(|a| a.name.clone()),
        )
    }

    #[must_use]
    pub fn decide(&self, actor: &str, ledger_allows: bool) -> Remedy {
        if ledger_allows {
            Remedy::Restart
        } else if self.eligible.contains(actor) {
            Remedy::Escalate
        } else {
            Remedy::Suppress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide() {
        let policy = EscalationPolicy::new(["wg"]);

        assert_eq!(policy.decide("wg", true), Remedy::Restart);
        assert_eq!(policy.decide("wg", false), Remedy::Escalate);
        assert_eq!(policy.decide("sowa.service", true), Remedy::Restart);
        assert_eq!(policy.decide("sowa.service", false), Remedy::Suppress);
    }

    #[test]
    fn test_from_actors_uses_flag() {
        let actor = |name: &str, escalate| ActorConfig {
            name: name.to_string(),
            restart_unit: name.to_string(),
            escalate,
            max_restarts: None,
            reset_interval_secs: None,
            probes: vec![],
        };
        let policy = EscalationPolicy::from_actors(&[actor("wg", true), actor("sowa", false)]);

        assert_eq!(policy.decide("wg", false), Remedy::Escalate);
        assert_eq!(policy.decide("sowa", false), Remedy::Suppress);
    }
}
