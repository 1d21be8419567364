//! Configuration types for supervised actors and cycle thresholds
//!
//! Everything here is loaded once at startup and treated as immutable for the
//! rest of the invocation.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ledger::{RestartBudget, is_key_char};

/// Supervisor settings: thresholds, ledger location and the actor table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Resource guard thresholds
    #[serde(default)]
    pub guard: GuardThresholds,
    /// Restart ledger defaults
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// What to delete when disk usage crosses the warning threshold
    #[serde(default)]
    pub reclaim: ReclaimPolicy,
    /// Deadlines for external calls
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Supervised actors, checked in declaration order
    #[serde(default, rename = "actor")]
    pub actors: Vec<ActorConfig>,
}

impl SupervisorConfig {
    /// Check the configuration for values that would make a cycle meaningless
    /// or unsafe to interpolate into shell commands
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` describing the first problem found
    pub fn validate(&self) -> Result<(), CoreError> {
        let guard = &self.guard;
        if guard.disk_crit > 100 {
            return Err(config_error("guard.disk_crit must be at most 100"));
        }
        if guard.disk_warn >= guard.disk_crit {
            return Err(config_error(format!(
                "guard.disk_warn ({}) must be below guard.disk_crit ({})",
                guard.disk_warn, guard.disk_crit
            )));
        }
        if !guard.max_sysload.is_finite() || guard.max_sysload <= 0.0 {
            return Err(config_error("guard.max_sysload must be a positive number"));
        }
        if self.ledger.max_restarts == 0 {
            return Err(config_error("ledger.max_restarts must be at least 1"));
        }
        if self.timeouts.command_secs == 0 || self.timeouts.probe_deadline_secs == 0 {
            return Err(config_error("timeouts must be greater than 0"));
        }
        for (field, value) in [
            ("reclaim.journal_vacuum_time", self.reclaim.journal_vacuum_time.as_str()),
            ("reclaim.max_file_size", self.reclaim.max_file_size.as_str()),
        ] {
            ensure_shell_safe(field, value)?;
        }
        ensure_shell_safe("reclaim.log_dir", &self.reclaim.log_dir.to_string_lossy())?;

        let mut seen = HashSet::new();
        for actor in &self.actors {
            actor.validate()?;
            if !seen.insert(actor.name.as_str()) {
                return Err(config_error(format!("duplicate actor name: {}", actor.name)));
            }
        }

        Ok(())
    }
}

/// Resource guard thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardThresholds {
    /// Disk usage (percent) above which logs are reclaimed
    #[serde(default = "default_disk_warn")]
    pub disk_warn: u8,
    /// Disk usage (percent) above which the whole cycle is skipped
    #[serde(default = "default_disk_crit")]
    pub disk_crit: u8,
    /// 1-minute load average above which the host is rebooted
    #[serde(default = "default_max_sysload")]
    pub max_sysload: f64,
}

impl Default for GuardThresholds {
    fn default() -> Self {
        Self {
            disk_warn: default_disk_warn(),
            disk_crit: default_disk_crit(),
            max_sysload: default_max_sysload(),
        }
    }
}

fn default_disk_warn() -> u8 {
    90
}

fn default_disk_crit() -> u8 {
    95
}

fn default_max_sysload() -> f64 {
    8.0
}

/// Restart ledger location and default budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory holding one counter file per actor
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Restarts allowed per window
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    /// Length of the anti-flap window in seconds
    #[serde(default = "default_reset_interval")]
    pub reset_interval_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            max_restarts: default_max_restarts(),
            reset_interval_secs: default_reset_interval(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/run/watchdog")
}

fn default_max_restarts() -> u32 {
    3
}

fn default_reset_interval() -> u64 {
    30
}

/// Log reclamation performed under disk pressure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimPolicy {
    /// Age passed to `journalctl --vacuum-time`
    #[serde(default = "default_vacuum_time")]
    pub journal_vacuum_time: String,
    /// Directory scanned for oversized files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Size passed to `find -size +<size>`
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
}

impl Default for ReclaimPolicy {
    fn default() -> Self {
        Self {
            journal_vacuum_time: default_vacuum_time(),
            log_dir: default_log_dir(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_vacuum_time() -> String {
    "7d".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log")
}

fn default_max_file_size() -> String {
    "100M".to_string()
}

/// Deadlines for external calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Upper bound for any single shell command
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,
    /// Upper bound for one probe evaluation
    #[serde(default = "default_probe_deadline_secs")]
    pub probe_deadline_secs: u64,
}

impl TimeoutConfig {
    #[must_use]
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub fn probe_deadline(&self) -> Duration {
        Duration::from_secs(self.probe_deadline_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: default_command_secs(),
            probe_deadline_secs: default_probe_deadline_secs(),
        }
    }
}

fn default_command_secs() -> u64 {
    10
}

fn default_probe_deadline_secs() -> u64 {
    15
}

/// One supervised service or link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Unique name, also the ledger key
    pub name: String,
    /// systemd unit restarted when a probe fails
    pub restart_unit: String,
    /// Reboot the host once the restart budget is spent
    #[serde(default)]
    pub escalate: bool,
    /// Overrides `ledger.max_restarts`
    pub max_restarts: Option<u32>,
    /// Overrides `ledger.reset_interval_secs`
    pub reset_interval_secs: Option<u64>,
    /// Probes in evaluation order
    #[serde(default, rename = "probe")]
    pub probes: Vec<ProbeConfig>,
}

impl ActorConfig {
    /// Restart budget for this actor, falling back to the ledger defaults
    #[must_use]
    pub fn budget(&self, defaults: &LedgerConfig) -> RestartBudget {
        RestartBudget {
            max_restarts: self.max_restarts.unwrap_or(defaults.max_restarts),
            reset_interval_secs: self
                .reset_interval_secs
                .unwrap_or(defaults.reset_interval_secs),
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(config_error("actor name must not be empty"));
        }
        if !self.name.chars().all(is_key_char) {
            return Err(config_error(format!(
                "actor name {:?} may only contain letters, digits, '@', '.', '_' and '-'",
                self.name
            )));
        }
        ensure_shell_safe("actor.restart_unit", &self.restart_unit)?;
        if self.max_restarts == Some(0) {
            return Err(config_error(format!(
                "actor {}: max_restarts must be at least 1",
                self.name
            )));
        }
        if self.probes.is_empty() {
            return Err(config_error(format!(
                "actor {} has no probes configured",
                self.name
            )));
        }
        for probe in &self.probes {
            probe.validate(&self.name)?;
        }
        Ok(())
    }
}

/// Probe definition, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// systemd unit reports `active`
    ServiceActive {
        unit: String,
    },
    /// Network interface exists
    LinkPresent {
        interface: String,
    },
    /// ICMP echo to `target` succeeds
    Reachability {
        target: String,
        /// Source interface (`ping -I`)
        interface: Option<String>,
        #[serde(default = "default_ping_count")]
        count: u32,
        #[serde(default = "default_ping_timeout")]
        timeout_secs: u64,
    },
    /// Last `window` journal lines of `unit` do not all match `pattern`
    LogPattern {
        unit: String,
        #[serde(default = "default_log_window")]
        window: usize,
        #[serde(default = "default_stuck_pattern")]
        pattern: String,
    },
}

impl ProbeConfig {
    fn validate(&self, actor: &str) -> Result<(), CoreError> {
        match self {
            ProbeConfig::ServiceActive { unit } => ensure_shell_safe("probe.unit", unit),
            ProbeConfig::LinkPresent { interface } => {
                ensure_shell_safe("probe.interface", interface)
            }
            ProbeConfig::Reachability {
                target,
                interface,
                count,
                timeout_secs,
            } => {
                ensure_shell_safe("probe.target", target)?;
                if let Some(interface) = interface {
                    ensure_shell_safe("probe.interface", interface)?;
                }
                if *count == 0 || *timeout_secs == 0 {
                    return Err(config_error(format!(
                        "actor {actor}: reachability count and timeout must be greater than 0"
                    )));
                }
                Ok(())
            }
            ProbeConfig::LogPattern {
                unit,
                window,
                pattern,
            } => {
                ensure_shell_safe("probe.unit", unit)?;
                if *window == 0 {
                    return Err(config_error(format!(
                        "actor {actor}: log pattern window must be greater than 0"
                    )));
                }
                if pattern.is_empty() {
                    return Err(config_error(format!(
                        "actor {actor}: log pattern must not be empty"
                    )));
                }
                Ok(())
            }
        }
    }
}

fn default_ping_count() -> u32 {
    2
}

fn default_ping_timeout() -> u64 {
    2
}

fn default_log_window() -> usize {
    5
}

fn default_stuck_pattern() -> String {
    "registration successful".to_string()
}

fn config_error(msg: impl Into<String>) -> CoreError {
    CoreError::ConfigError(msg.into())
}

/// Values end up inside `sh -c` command lines
fn ensure_shell_safe(field: &str, value: &str) -> Result<(), CoreError> {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-' | ':' | '/'));
    if safe {
        Ok(())
    } else {
        Err(config_error(format!("{field} contains unsupported characters: {value:?}")))
    }
}
