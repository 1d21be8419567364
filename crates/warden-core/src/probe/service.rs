//! Process liveness: the systemd unit reports active

use async_trait::async_trait;

use super::{HealthVerdict, Probe};
use crate::error::HostError;
use crate::host::HostOps;

pub struct ServiceActiveProbe {
    unit: String,
}

impl ServiceActiveProbe {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }
}

#[async_trait]
impl Probe for ServiceActiveProbe {
    fn describe(&self) -> String {
        format!("{} is active", self.unit)
    }

    /// A unit whose state cannot be read is assumed down
    fn failure_verdict(&self) -> HealthVerdict {
        HealthVerdict::Unhealthy
    }

    async fn check(&self, host: &dyn HostOps) -> Result<HealthVerdict, HostError> {
        Ok(if host.service_active(&self.unit).await? {
            HealthVerdict::Healthy
        } else {
            HealthVerdict::Unhealthy
        })
    }
}
