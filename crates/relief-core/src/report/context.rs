//! Typed state of one report-processing run.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::audit_log::AuditLog;
use crate::geo::Coordinates;
use crate::types::{OutcomeMap, Step, StepOutcome};

/// Immutable report fields. Shared by reference with every parallel step.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub emergency_type: String,
    pub urgency_level: String,
    pub situation: String,
    pub people_count: u32,
    pub location: Coordinates,
    pub image: Bytes,
    pub user_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionOutputs {
    pub image_summary: Option<String>,
    pub weather: Value,
    pub disaster_history: Value,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOutputs {
    pub government_report: String,
    pub citizen_guidance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Start,
    Collecting,
    Validating,
    Analyzing,
    Finalizing,
    Done,
}

/// What a single parallel step hands back to its coordinator: the value it
/// produced, its outcome and the log it wrote on the side.
#[derive(Debug)]
pub struct StepReport<T> {
    pub step: Step,
    pub outcome: StepOutcome,
    pub value: T,
    pub log: AuditLog,
}

impl<T> StepReport<T> {
    pub fn completed(step: Step, value: T, log: AuditLog) -> Self {
        Self {
            step,
            outcome: StepOutcome::Completed,
            value,
            log,
        }
    }

    pub fn failed(step: Step, value: T, log: AuditLog) -> Self {
        Self {
            step,
            outcome: StepOutcome::Failed,
            value,
            log,
        }
    }
}

/// Owned exclusively by one pipeline run; parallel steps never touch it.
#[derive(Debug)]
pub struct ReportRun {
    pub disaster_id: String,
    pub inputs: Arc<ReportInputs>,
    pub collection: CollectionOutputs,
    pub analysis: AnalysisOutputs,
    pub outcomes: OutcomeMap,
    pub analysis_ready: bool,
    pub fan_out_complete: bool,
    pub log: AuditLog,
    stage: ReportStage,
}

impl ReportRun {
    pub fn new(disaster_id: String, inputs: ReportInputs) -> Self {
        Self {
            disaster_id,
            inputs: Arc::new(inputs),
            collection: CollectionOutputs::default(),
            analysis: AnalysisOutputs::default(),
            outcomes: OutcomeMap::default(),
            analysis_ready: false,
            fan_out_complete: false,
            log: AuditLog::new(),
            stage: ReportStage::Start,
        }
    }

    pub fn stage(&self) -> ReportStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, next: ReportStage) {
        debug!(disaster_id = %self.disaster_id, from = ?self.stage, to = ?next, "report stage");
        self.stage = next;
    }

    /// Folds a finished step back into the run and returns its value.
    pub(crate) fn merge<T>(&mut self, report: StepReport<T>) -> T {
        self.outcomes.set(report.step, report.outcome);
        self.log.absorb(report.log);
        report.value
    }
}
