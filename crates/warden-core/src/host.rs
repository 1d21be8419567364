//! Host collaborators: service state, reachability, resource sampling and
//! corrective actions
//!
//! [`HostOps`] is the seam between supervision policy and the operating
//! system. [`SystemHost`] implements it with shell commands run through a
//! [`warden_exec::Executor`], each bounded by the configured command timeout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use warden_exec::{CommandResult, Executor};

use crate::config::ReclaimPolicy;
use crate::error::HostError;

/// Parameters of one reachability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingSpec<'a> {
    pub target: &'a str,
    pub interface: Option<&'a str>,
    pub count: u32,
    pub timeout: Duration,
}

/// Operations the supervisor needs from the host
#[async_trait]
pub trait HostOps: Send + Sync {
    /// Whether a systemd unit is active
    async fn service_active(&self, unit: &str) -> Result<bool, HostError>;

    /// Whether a network interface exists
    async fn link_exists(&self, interface: &str) -> Result<bool, HostError>;

    /// Whether at least one echo reply came back
    async fn reachable(&self, ping: &PingSpec<'_>) -> Result<bool, HostError>;

    /// Used space on the root filesystem, 0-100
    async fn disk_used_percent(&self) -> Result<u8, HostError>;

    /// 1-minute load average
    async fn load_average(&self) -> Result<f64, HostError>;

    /// Up to `lines` most recent journal messages of `unit`, oldest first
    async fn tail_service_log(&self, unit: &str, lines: usize) -> Result<Vec<String>, HostError>;

    /// Ask systemd to restart a unit; does not wait for it to come up
    async fn restart_service(&self, unit: &str) -> Result<(), HostError>;

    /// Request a host reboot
    async fn reboot_host(&self) -> Result<(), HostError>;

    /// Vacuum the journal and delete oversized log files
    async fn reclaim_logs(&self, policy: &ReclaimPolicy) -> Result<(), HostError>;
}

/// [`HostOps`] backed by shell commands
pub struct SystemHost {
    executor: Arc<dyn Executor>,
    command_timeout: Duration,
    dry_run: bool,
}

impl SystemHost {
    pub fn new(executor: Arc<dyn Executor>, command_timeout: Duration) -> Self {
        Self {
            executor,
            command_timeout,
            dry_run: false,
        }
    }

    /// Log corrective actions instead of running them
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    async fn exec(&self, cmd: &str) -> Result<CommandResult, HostError> {
        debug!(executor = self.executor.executor_type(), cmd, "running command");
        Ok(self
            .executor
            .run_with_timeout(cmd, self.command_timeout)
            .await?)
    }

    /// Run a command whose exit status is the answer
    async fn exec_status(&self, cmd: &str) -> Result<bool, HostError> {
        Ok(self.exec(cmd).await?.success())
    }

    /// Run a command that must succeed
    async fn exec_checked(&self, cmd: &str) -> Result<CommandResult, HostError> {
        let result = self.exec(cmd).await?;
        if result.success() {
            Ok(result)
        } else {
            Err(HostError::CommandFailed {
                status: result.status,
                stderr: result.stderr.trim().to_string(),
            })
        }
    }

    /// Run a corrective action, or just log it in dry-run mode
    async fn act(&self, cmd: &str) -> Result<(), HostError> {
        if self.dry_run {
            info!(command = %cmd, "dry run: skipping action");
            return Ok(());
        }
        self.exec_checked(cmd).await.map(|_| ())
    }

    fn ping_command(ping: &PingSpec<'_>) -> String {
        let interface = ping
            .interface
            .map(|i| format!("-I {i} "))
            .unwrap_or_default();
        format!(
            "ping {interface}-c {} -W {} {}",
            ping.count,
            ping.timeout.as_secs().max(1),
            ping.target
        )
    }

    fn parse_disk_percent(output: &str) -> Result<u8, HostError> {
        let field = output
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .ok_or_else(|| HostError::ParseError("empty df output".to_string()))?;

        field
            .trim_end_matches('%')
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| HostError::ParseError(format!("unexpected df output: {field:?}")))
    }

    fn parse_loadavg(output: &str) -> Result<f64, HostError> {
        output
            .split_whitespace()
            .next()
            .and_then(|first| first.parse::<f64>().ok())
            .ok_or_else(|| HostError::ParseError(format!("unexpected loadavg: {output:?}")))
    }

    /// Extract `MESSAGE` from `journalctl -o json` output, one object per line
    fn parse_journal(output: &str) -> Vec<String> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Value>(line) {
                Ok(record) => journal_message(&record),
                Err(e) => {
                    debug!(error = %e, "skipping unparsable journal line");
                    None
                }
            })
            .collect()
    }
}

/// `MESSAGE` is a string, or a byte array when it is not valid UTF-8
fn journal_message(record: &Value) -> Option<String> {
    match record.get("MESSAGE")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(bytes) => {
            let bytes: Vec<u8> = bytes
                .iter()
                .filter_map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => None,
    }
}

#[async_trait]
impl HostOps for SystemHost {
    #[instrument(skip(self), level = "debug")]
    async fn service_active(&self, unit: &str) -> Result<bool, HostError> {
        self.exec_status(&format!("systemctl is-active --quiet {unit}"))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn link_exists(&self, interface: &str) -> Result<bool, HostError> {
        self.exec_status(&format!("ip link show {interface}")).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn reachable(&self, ping: &PingSpec<'_>) -> Result<bool, HostError> {
        // ping exits 0 as soon as any reply arrives
        self.exec_status(&Self::ping_command(ping)).await
    }

    async fn disk_used_percent(&self) -> Result<u8, HostError> {
        let result = self.exec_checked("df --output=pcent /").await?;
        Self::parse_disk_percent(&result.stdout)
    }

    async fn load_average(&self) -> Result<f64, HostError> {
        let result = self.exec_checked("cat /proc/loadavg").await?;
        Self::parse_loadavg(&result.stdout)
    }

    #[instrument(skip(self), level = "debug")]
    async fn tail_service_log(&self, unit: &str, lines: usize) -> Result<Vec<String>, HostError> {
        let result = self
            .exec_checked(&format!(
                "journalctl -u {unit} -n {lines} -o json --no-pager"
            ))
            .await?;

        let mut messages = Self::parse_journal(&result.stdout);
        if messages.len() > lines {
            messages.drain(..messages.len() - lines);
        }
        Ok(messages)
    }

    async fn restart_service(&self, unit: &str) -> Result<(), HostError> {
        info!(unit = %unit, "restarting service");
        self.act(&format!("systemctl restart {unit}")).await
    }

    async fn reboot_host(&self) -> Result<(), HostError> {
        warn!("requesting host reboot");
        self.act("systemctl reboot").await
    }

    async fn reclaim_logs(&self, policy: &ReclaimPolicy) -> Result<(), HostError> {
        info!(
            vacuum_time = %policy.journal_vacuum_time,
            log_dir = %policy.log_dir.display(),
            max_file_size = %policy.max_file_size,
            "reclaiming log space"
        );

        let vacuum = self
            .act(&format!(
                "journalctl --vacuum-time={}",
                policy.journal_vacuum_time
            ))
            .await;
        let prune = self
            .act(&find_oversized_command(&policy.log_dir, &policy.max_file_size))
            .await;

        // Both steps always run; report the first failure
        vacuum.and(prune)
    }
}

fn find_oversized_command(dir: &Path, size: &str) -> String {
    format!("find {} -type f -size +{size} -delete", dir.display())
}
