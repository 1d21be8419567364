//! Resource guard: decides whether a cycle may act at all

use std::fmt;

use tracing::debug;

use crate::config::GuardThresholds;

/// Resource readings taken at the start of a cycle
///
/// A reading that could not be taken is `None`. Unknown disk usage blocks the
/// cycle; unknown load only skips the overload rule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSnapshot {
    pub disk_used_percent: Option<u8>,
    pub system_load_1m: Option<f64>,
}

/// Why a cycle was blocked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockReason {
    /// Disk above the critical threshold; nothing may be written
    DiskCritical { used_percent: u8 },
    /// Load above the ceiling; only a reboot is expected to help
    Overload { load: f64 },
    /// Disk usage could not be read
    DiskUnknown,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::DiskCritical { used_percent } => {
                write!(f, "disk {used_percent}% used")
            }
            BlockReason::Overload { load } => write!(f, "load average {load}"),
            BlockReason::DiskUnknown => f.write_str("disk usage unknown"),
        }
    }
}

/// Gate applied before any actor is checked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardVerdict {
    Proceed,
    /// Reclaim log space, check actors, but do not report the cycle healthy
    Degrade { used_percent: u8 },
    /// Skip the cycle
    Block(BlockReason),
}

#[derive(Debug, Clone)]
pub struct ResourceGuard {
    thresholds: GuardThresholds,
}

impl ResourceGuard {
    pub fn new(thresholds: GuardThresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate a snapshot. Critical disk wins over overload, then unknown
    /// disk usage, then the disk warning.
    #[must_use]
    pub fn evaluate(&self, snapshot: &ResourceSnapshot) -> GuardVerdict {
        let t = &self.thresholds;

        let verdict = match (snapshot.disk_used_percent, snapshot.system_load_1m) {
            (Some(disk), _) if disk > t.disk_crit => {
                GuardVerdict::Block(BlockReason::DiskCritical { used_percent: disk })
            }
            (_, Some(load)) if load > t.max_sysload => {
                GuardVerdict::Block(BlockReason::Overload { load })
            }
            (None, _) => GuardVerdict::Block(BlockReason::DiskUnknown),
            (Some(disk), _) if disk > t.disk_warn => GuardVerdict::Degrade { used_percent: disk },
            _ => GuardVerdict::Proceed,
        };

        debug!(?snapshot, ?verdict, "resource guard evaluated");

        verdict
    }
}
