//! Final accept/reject decision over the outcome map.

use super::context::ReportRun;
use crate::types::{FinalStatus, OutcomeMap, Step, StepOutcome};

const COMPONENT: &str = "coordinator_final";

/// Steps that must complete for a report to be accepted.
pub const REQUIRED_STEPS: [Step; 1] = [Step::ImageAnalysis];

pub fn decide(outcomes: &OutcomeMap) -> FinalStatus {
    let required_ok = REQUIRED_STEPS
        .iter()
        .all(|step| outcomes.get(*step) == Some(StepOutcome::Completed));
    let completed = outcomes.count(StepOutcome::Completed);

    if required_ok && completed >= REQUIRED_STEPS.len() {
        FinalStatus::Accepted
    } else {
        FinalStatus::Rejected
    }
}

pub(crate) fn run(run: &mut ReportRun) -> FinalStatus {
    run.log
        .info(COMPONENT, "Final processing: finalizing emergency response");

    let completed = run.outcomes.count(StepOutcome::Completed);
    let total = run.outcomes.len();
    run.log.info(
        COMPONENT,
        format!("Processing summary: {completed}/{total} components completed successfully"),
    );

    let status = decide(&run.outcomes);
    match status {
        FinalStatus::Accepted => run
            .log
            .success(COMPONENT, "Final processing: emergency response ACCEPTED"),
        FinalStatus::Rejected => run.log.error(
            COMPONENT,
            "Final processing: emergency response REJECTED due to insufficient data",
        ),
    }
    status
}
