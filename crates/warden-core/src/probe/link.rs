//! Link presence: the network interface exists
//!
//! A missing interface is "not up yet" rather than broken, so this probe
//! never reports Unhealthy. It stops the actor's probe chain before a
//! reachability check that would fail for the wrong reason.

use async_trait::async_trait;
use tracing::info;

use super::{HealthVerdict, Probe};
use crate::error::HostError;
use crate::host::HostOps;

pub struct LinkPresentProbe {
    interface: String,
}

impl LinkPresentProbe {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

#[async_trait]
impl Probe for LinkPresentProbe {
    fn describe(&self) -> String {
        format!("interface {} exists", self.interface)
    }

    fn failure_verdict(&self) -> HealthVerdict {
        HealthVerdict::Indeterminate
    }

    fn is_gate(&self) -> bool {
        true
    }

    async fn check(&self, host: &dyn HostOps) -> Result<HealthVerdict, HostError> {
        if host.link_exists(&self.interface).await? {
            Ok(HealthVerdict::Healthy)
        } else {
            info!(interface = %self.interface, "interface is not up yet");
            Ok(HealthVerdict::Indeterminate)
        }
    }
}
