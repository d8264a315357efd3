//! Pipeline configuration

use super::executor::Phase;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one pipeline executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Endpoint handed to the external call adapter.
    #[serde(default = "default_external_endpoint")]
    pub external_endpoint: String,

    /// Simulated duration of each phase's work.
    #[serde(default = "default_work_delay", with = "humantime_serde")]
    pub work_delay: Duration,

    /// Optional simulated fault, failing exactly one named phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultSpec>,
}

fn default_external_endpoint() -> String {
    "https://jsonplaceholder.typicode.com/todos/1".to_string()
}

fn default_work_delay() -> Duration {
    Duration::from_millis(50)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            external_endpoint: default_external_endpoint(),
            work_delay: default_work_delay(),
            fault: None,
        }
    }
}

/// Simulation control: make one phase's work fail with the given detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultSpec {
    /// Phase whose work fails.
    pub phase: Phase,

    /// Failure detail recorded on the span and in the returned error.
    pub detail: String,
}

impl FaultSpec {
    /// Fault for the given phase.
    pub fn new(phase: Phase, detail: impl Into<String>) -> Self {
        Self {
            phase,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PipelineConfig::default();
        assert!(config.external_endpoint.contains("todos/1"));
        assert_eq!(config.work_delay, Duration::from_millis(50));
        assert!(config.fault.is_none());
    }

    #[test]
    fn config_with_fault_round_trips() {
        let config = PipelineConfig {
            fault: Some(FaultSpec::new(Phase::Task2, "simulated outage")),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        let fault = parsed.fault.unwrap();
        assert_eq!(fault.phase, Phase::Task2);
        assert_eq!(fault.detail, "simulated outage");
    }
}
