//! Processing run lifecycle and result

use super::provider::ProviderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    /// Delete the provider's committed data, then process everything
    Full,
    /// Upsert on top of what is already committed
    Incremental,
}

impl std::str::FromStr for ProcessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(ProcessMode::Full),
            "incremental" => Ok(ProcessMode::Incremental),
            other => Err(format!("unknown process mode '{}'", other)),
        }
    }
}

/// `Created → Running → {Succeeded, Failed, Canceled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Created,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed | RunStatus::Canceled)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Created, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Running, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Canceled)
                // a run that never started can still fail or be cancelled
                | (RunStatus::Created, RunStatus::Failed)
                | (RunStatus::Created, RunStatus::Canceled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Created => "created",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub provider_id: ProviderId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub public_count: u64,
    pub protected_count: u64,
    pub failed_count: u64,
    /// Observations routed to the invalid-observation store
    pub invalid_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunResult {
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            start: Utc::now(),
            end: None,
            status: RunStatus::Created,
            public_count: 0,
            protected_count: 0,
            failed_count: 0,
            invalid_count: 0,
            message: None,
        }
    }

    /// Move to `next`. Invalid transitions are ignored and reported as `false`.
    pub fn transition(&mut self, next: RunStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            self.end = Some(Utc::now());
        }
        true
    }

    pub fn committed_count(&self) -> u64 {
        self.public_count + self.protected_count
    }
}
