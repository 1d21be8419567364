//! Network reachability via a bounded ICMP exchange

use std::time::Duration;

use async_trait::async_trait;

use super::{HealthVerdict, Probe};
use crate::error::HostError;
use crate::host::{HostOps, PingSpec};

/// Sends `count` echo requests, each waiting up to `timeout` for a reply.
/// One reply is enough; only a fully failed exchange is Unhealthy.
pub struct ReachabilityProbe {
    target: String,
    interface: Option<String>,
    count: u32,
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(
        target: impl Into<String>,
        interface: Option<String>,
        count: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            interface,
            count,
            timeout,
        }
    }
}

#[async_trait]
impl Probe for ReachabilityProbe {
    fn describe(&self) -> String {
        match &self.interface {
            Some(interface) => format!("reachability of {} via {interface}", self.target),
            None => format!("reachability of {}", self.target),
        }
    }

    /// A check that cannot complete counts as a failed exchange
    fn failure_verdict(&self) -> HealthVerdict {
        HealthVerdict::Unhealthy
    }

    async fn check(&self, host: &dyn HostOps) -> Result<HealthVerdict, HostError> {
        let ping = PingSpec {
            target: &self.target,
            interface: self.interface.as_deref(),
            count: self.count,
            timeout: self.timeout,
        };

        Ok(if host.reachable(&ping).await? {
            HealthVerdict::Healthy
        } else {
            HealthVerdict::Unhealthy
        })
    }
}
