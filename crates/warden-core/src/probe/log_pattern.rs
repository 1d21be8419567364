//! Reconnect-loop detection from a unit's journal
//!
//! A service stuck reconnecting can keep logging a success message while never
//! reaching a steady state. When every one of the last `window` messages
//! matches `pattern`, the service is considered stuck.

use async_trait::async_trait;
use tracing::debug;

use super::{HealthVerdict, Probe};
use crate::error::HostError;
use crate::host::HostOps;

pub struct LogPatternProbe {
    unit: String,
    window: usize,
    /// Lowercased for case-insensitive matching
    pattern: String,
}

impl LogPatternProbe {
    pub fn new(unit: impl Into<String>, window: usize, pattern: &str) -> Self {
        Self {
            unit: unit.into(),
            window,
            pattern: pattern.to_lowercase(),
        }
    }

    fn is_stuck(&self, lines: &[String]) -> bool {
        // A partial window is never evidence of failure
        if self.window == 0 || lines.len() < self.window {
            return false;
        }
        lines[lines.len() - self.window..]
            .iter()
            .all(|line| line.to_lowercase().contains(&self.pattern))
    }
}

#[async_trait]
impl Probe for LogPatternProbe {
    fn describe(&self) -> String {
        format!(
            "last {} log lines of {} not all {:?}",
            self.window, self.unit, self.pattern
        )
    }

    /// Absence of log evidence is not a failure
    fn failure_verdict(&self) -> HealthVerdict {
        HealthVerdict::Indeterminate
    }

    async fn check(&self, host: &dyn HostOps) -> Result<HealthVerdict, HostError> {
        let lines = host.tail_service_log(&self.unit, self.window).await?;

        if lines.len() < self.window {
            debug!(
                unit = %self.unit,
                available = lines.len(),
                window = self.window,
                "not enough log lines to judge"
            );
        }

        Ok(if self.is_stuck(&lines) {
            HealthVerdict::Unhealthy
        } else {
            HealthVerdict::Healthy
        })
    }
}
