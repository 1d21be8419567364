//! Scripted [`HostOps`] for unit tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ReclaimPolicy;
use crate::error::HostError;
use crate::host::{HostOps, PingSpec};

#[derive(Default)]
pub struct FakeHost {
    pub active: HashMap<String, bool>,
    pub links: HashMap<String, bool>,
    pub reachable: HashMap<String, bool>,
    pub logs: HashMap<String, Vec<String>>,
    /// Targets whose ping never returns
    pub hanging: Vec<String>,
    pub disk: u8,
    pub load: f64,
    pub calls: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn broken(what: &str) -> HostError {
        HostError::CommandFailed {
            status: 1,
            stderr: format!("{what} unavailable"),
        }
    }
}

#[async_trait]
impl HostOps for FakeHost {
    async fn service_active(&self, unit: &str) -> Result<bool, HostError> {
        self.record(format!("active {unit}"));
        self.active.get(unit).copied().ok_or_else(|| Self::broken(unit))
    }

    async fn link_exists(&self, interface: &str) -> Result<bool, HostError> {
        self.record(format!("link {interface}"));
        self.links
            .get(interface)
            .copied()
            .ok_or_else(|| Self::broken(interface))
    }

    async fn reachable(&self, ping: &PingSpec<'_>) -> Result<bool, HostError> {
        self.record(format!("ping {}", ping.target));
        if self.hanging.iter().any(|t| t == ping.target) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.reachable
            .get(ping.target)
            .copied()
            .ok_or_else(|| Self::broken(ping.target))
    }

    async fn disk_used_percent(&self) -> Result<u8, HostError> {
        Ok(self.disk)
    }

    async fn load_average(&self) -> Result<f64, HostError> {
        Ok(self.load)
    }

    async fn tail_service_log(&self, unit: &str, lines: usize) -> Result<Vec<String>, HostError> {
        self.record(format!("log {unit}"));
        let log = self.logs.get(unit).ok_or_else(|| Self::broken(unit))?;
        Ok(log[log.len().saturating_sub(lines)..].to_vec())
    }

    async fn restart_service(&self, unit: &str) -> Result<(), HostError> {
        self.record(format!("restart {unit}"));
        Ok(())
    }

    async fn reboot_host(&self) -> Result<(), HostError> {
        self.record("reboot".to_string());
        Ok(())
    }

    async fn reclaim_logs(&self, _policy: &ReclaimPolicy) -> Result<(), HostError> {
        self.record("reclaim".to_string());
        Ok(())
    }
}
