//! Persisted records and the small enums they carry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::proximity::Located;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterStatus {
    Pending,
    Active,
    Archived,
}

impl DisasterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterStatus::Pending => "pending",
            DisasterStatus::Active => "active",
            DisasterStatus::Archived => "archived",
        }
    }
}

/// Informational verdict of the final aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Accepted,
    Rejected,
}

/// One unit of work inside the report pipeline.
///
/// Declaration order is the merge order and the key order of [`OutcomeMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ImageAnalysis,
    Weather,
    DisasterHistory,
    GovernmentReport,
    CitizenGuidance,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::ImageAnalysis,
        Step::Weather,
        Step::DisasterHistory,
        Step::GovernmentReport,
        Step::CitizenGuidance,
    ];

    pub const COLLECTION: [Step; 3] = [Step::ImageAnalysis, Step::Weather, Step::DisasterHistory];

    pub const ANALYSIS: [Step; 2] = [Step::GovernmentReport, Step::CitizenGuidance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ImageAnalysis => "image_analysis",
            Step::Weather => "weather",
            Step::DisasterHistory => "disaster_history",
            Step::GovernmentReport => "government_report",
            Step::CitizenGuidance => "citizen_guidance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Pending,
    Completed,
    Failed,
}

/// Step name to outcome, the primary status ledger of a report run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeMap(BTreeMap<Step, StepOutcome>);

impl OutcomeMap {
    /// Every step of the run, all pending, so the key set is stable from the
    /// first stage onwards.
    pub fn declared() -> Self {
        Self(Step::ALL.iter().map(|step| (*step, StepOutcome::Pending)).collect())
    }

    pub fn set(&mut self, step: Step, outcome: StepOutcome) {
        self.0.insert(step, outcome);
    }

    pub fn get(&self, step: Step) -> Option<StepOutcome> {
        self.0.get(&step).copied()
    }

    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.0.values().filter(|value| **value == outcome).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Step, StepOutcome)> + '_ {
        self.0.iter().map(|(step, outcome)| (*step, *outcome))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterRecord {
    pub disaster_id: String,
    pub emergency_type: String,
    pub urgency_level: String,
    pub situation: String,
    pub people_count: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub geohash: String,
    pub government_report: String,
    pub citizen_guidance: String,
    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
    pub processing_secs: f64,
    pub status: DisasterStatus,
    pub image_url: Option<String>,
}

impl DisasterRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentsSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub success_rate: f64,
}

impl ComponentsSummary {
    pub fn from_outcomes(outcomes: &OutcomeMap) -> Self {
        let total = outcomes.len();
        let completed = outcomes.count(StepOutcome::Completed);
        let failed = outcomes.count(StepOutcome::Failed);
        let success_rate = if total == 0 {
            0.0
        } else {
            round2(completed as f64 / total as f64 * 100.0)
        };
        Self {
            total,
            completed,
            failed,
            success_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMatrixRecord {
    pub disaster_id: String,
    pub processing_started_at: DateTime<Utc>,
    pub processing_finished_at: DateTime<Utc>,
    pub total_processing_secs: f64,
    pub components_summary: ComponentsSummary,
    pub components_status: OutcomeMap,
    pub final_status: FinalStatus,
    /// JSON array of log entries, possibly truncated.
    pub logs: String,
    pub emergency_context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderRole {
    Volunteer,
    FirstResponder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Forward-only progression; `Done` is terminal.
    pub fn can_move_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::Pending, TaskStatus::Done)
                | (TaskStatus::InProgress, TaskStatus::Done)
        )
    }
}

/// Which strategy of the fallback chain produced a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    Ai,
    AiRetry,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub action_done_by: Option<String>,
    pub roles: Vec<ResponderRole>,
    pub emergency_type: String,
    pub urgency_level: String,
    pub latitude: f64,
    pub longitude: f64,
    pub help_needed: String,
    pub user_id: String,
    pub disaster_id: String,
    pub origin: TaskOrigin,
    pub is_fallback: bool,
    pub is_first_task: bool,
    pub ai_reasoning: String,
    pub resource_utilization: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequestRecord {
    pub disaster_id: String,
    pub help: String,
    pub urgency_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub emergency_type: String,
    pub task_id: String,
    pub status: RequestStatus,
    pub feedback: Option<String>,
    pub assigned_roles: Vec<ResponderRole>,
    pub ai_reasoning: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCandidate {
    pub resource_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub description: Option<String>,
    pub contact: Option<String>,
    pub status: Option<String>,
}

impl Located for ResourceCandidate {
    fn location(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
