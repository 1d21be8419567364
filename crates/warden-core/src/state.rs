//! Check cycle state machine types

use std::fmt;

/// Phases of one check cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Start,
    ResourceCheck,
    /// Terminal: the guard stopped the cycle before any actor was checked
    Blocked,
    PerActorCheck,
    /// Terminal: a reboot was requested mid-cycle
    Rebooting,
    Summarize,
    Done,
}

impl CyclePhase {
    /// Check if a transition from `self` to `next` is allowed
    #[must_use]
    pub fn can_transition_to(self, next: CyclePhase) -> bool {
        use CyclePhase::{
            Blocked, Done, PerActorCheck, Rebooting, ResourceCheck, Start, Summarize,
        };

        matches!(
            (self, next),
            (Start, ResourceCheck)
                | (ResourceCheck, Blocked | PerActorCheck)
                | (PerActorCheck, Rebooting | Summarize)
                | (Summarize, Done)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CyclePhase::Blocked | CyclePhase::Rebooting | CyclePhase::Done
        )
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Start => "start",
            CyclePhase::ResourceCheck => "resource_check",
            CyclePhase::Blocked => "blocked",
            CyclePhase::PerActorCheck => "per_actor_check",
            CyclePhase::Rebooting => "rebooting",
            CyclePhase::Summarize => "summarize",
            CyclePhase::Done => "done",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_path() {
        let path = [
            CyclePhase::Start,
            CyclePhase::ResourceCheck,
            CyclePhase::PerActorCheck,
            CyclePhase::Summarize,
            CyclePhase::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(CyclePhase::Done.is_terminal());
    }

    #[test]
    fn test_blocked_skips_actor_checks() {
        assert!(CyclePhase::ResourceCheck.can_transition_to(CyclePhase::Blocked));
        assert!(CyclePhase::Blocked.is_terminal());
        assert!(!CyclePhase::Blocked.can_transition_to(CyclePhase::PerActorCheck));
        assert!(!CyclePhase::Start.can_transition_to(CyclePhase::PerActorCheck));
    }
}
