//! Bounded health polling for freshly started instances.

use crate::deployment::{
    domain::{HealthProbe, InstanceHandle},
    ports::InstanceRuntime,
};
use std::time::Duration;
use tracing::debug;

/// Polling schedule for health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckPolicy {
    /// Maximum number of probes before giving up.
    pub max_attempts: u32,
    /// Delay between consecutive probes.
    pub interval: Duration,
    /// Upper bound on a single probe.
    pub probe_timeout: Duration,
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// How a health check ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckOutcome {
    /// The instance answered its health endpoint.
    Healthy {
        /// Probes issued, including the successful one.
        attempts: u32,
    },
    /// The instance exited before becoming healthy.
    Exited {
        /// Probes issued.
        attempts: u32,
        /// Output captured from the instance.
        logs: String,
    },
    /// Every probe failed.
    TimedOut {
        /// Probes issued.
        attempts: u32,
        /// Reason the last probe failed.
        last_reason: String,
    },
}

/// Probes `instance` until it is healthy, exits, or `policy.max_attempts`
/// probes have failed.
///
/// Sleeps `policy.interval` between probes with `tokio::time::sleep`, so the
/// schedule is cancelled by dropping the future. Runtime errors during a
/// probe count as failed probes.
pub async fn await_healthy<R>(
    runtime: &R,
    instance: &InstanceHandle,
    policy: &HealthCheckPolicy,
) -> HealthCheckOutcome
where
    R: InstanceRuntime + ?Sized,
{
    let mut last_reason = String::from("no probe was issued");
    for attempt in 1..=policy.max_attempts {
        let probe = match tokio::time::timeout(policy.probe_timeout, runtime.probe_health(instance))
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => HealthProbe::unreachable(err.to_string()),
            Err(_) => HealthProbe::unreachable(format!(
                "probe timed out after {} ms",
                policy.probe_timeout.as_millis()
            )),
        };

        match probe {
            HealthProbe::Healthy => return HealthCheckOutcome::Healthy { attempts: attempt },
            HealthProbe::Exited { logs } => {
                return HealthCheckOutcome::Exited {
                    attempts: attempt,
                    logs,
                };
            }
            HealthProbe::Unreachable { reason } => {
                debug!(instance = %instance, attempt, reason = %reason, "health probe failed");
                last_reason = reason;
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    HealthCheckOutcome::TimedOut {
        attempts: policy.max_attempts,
        last_reason,
    }
}
