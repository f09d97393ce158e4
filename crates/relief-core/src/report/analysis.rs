//! Parallel AI analysis: government report and citizen guidance.

use std::sync::Arc;

use serde_json::{json, Value};

use super::collection::settle;
use super::context::{ReportInputs, ReportRun, StepReport};
use super::ReportServices;
use crate::audit_log::AuditLog;
use crate::services::{LanguageModel, PromptPart};
use crate::types::Step;

const COORDINATOR: &str = "coordinator_ai_analysis";
const GOVERNMENT: &str = "ai_agent_government";
const CITIZEN: &str = "ai_agent_citizen";

/// Everything the analysis steps read, captured once after validation.
#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    pub report: Arc<ReportInputs>,
    pub image_summary: String,
    pub weather: Value,
    pub disaster_history: Value,
}

/// Runs both generation steps when the gate is open. A closed gate leaves
/// both outcomes pending.
pub(crate) async fn run(run: &mut ReportRun, services: &ReportServices) {
    run.log
        .info(COORDINATOR, "AI analysis: starting parallel agent analysis");

    if !run.analysis_ready {
        run.log.error(
            COORDINATOR,
            "AI analysis: cannot proceed, data validation failed",
        );
        return;
    }

    let inputs = Arc::new(AnalysisInputs {
        report: Arc::clone(&run.inputs),
        image_summary: run.collection.image_summary.clone().unwrap_or_default(),
        weather: run.collection.weather.clone(),
        disaster_history: run.collection.disaster_history.clone(),
    });

    let government = tokio::spawn(generate(
        Arc::clone(&services.language_model),
        Step::GovernmentReport,
        government_prompt(&inputs),
    ));
    let citizen = tokio::spawn(generate(
        Arc::clone(&services.language_model),
        Step::CitizenGuidance,
        citizen_prompt(&inputs),
    ));

    let (government, citizen) = tokio::join!(government, citizen);

    let government = settle(Step::GovernmentReport, GOVERNMENT, government, |message| {
        failure_text(Step::GovernmentReport, &message)
    });
    run.analysis.government_report = run.merge(government);

    let citizen = settle(Step::CitizenGuidance, CITIZEN, citizen, |message| {
        failure_text(Step::CitizenGuidance, &message)
    });
    run.analysis.citizen_guidance = run.merge(citizen);

    run.log
        .success(COORDINATOR, "AI analysis: all agent analysis tasks finished");
}

async fn generate(
    model: Arc<dyn LanguageModel>,
    step: Step,
    prompt: Vec<PromptPart>,
) -> StepReport<String> {
    let component = component_for(step);
    let mut log = AuditLog::new();
    log.info(component, format!("{}: generating", label(step)));

    match model.generate(&prompt).await {
        Ok(text) => {
            log.success(component, format!("{}: generated successfully", label(step)));
            StepReport::completed(step, text, log)
        }
        Err(err) => {
            log.error(component, format!("{}: failed: {err}", label(step)));
            StepReport::failed(step, failure_text(step, &err.to_string()), log)
        }
    }
}

fn component_for(step: Step) -> &'static str {
    match step {
        Step::CitizenGuidance => CITIZEN,
        _ => GOVERNMENT,
    }
}

fn label(step: Step) -> &'static str {
    match step {
        Step::CitizenGuidance => "Citizen guidance",
        _ => "Government report",
    }
}

fn failure_text(step: Step, message: &str) -> String {
    match step {
        Step::CitizenGuidance => format!("Error generating citizen guidance: {message}"),
        _ => format!("Error generating government report: {message}"),
    }
}

pub fn government_prompt(inputs: &AnalysisInputs) -> Vec<PromptPart> {
    let report = &inputs.report;
    let text = format!(
        r#"EMERGENCY REPORT - GOVERNMENT RESPONSE TEAM

TYPE: {emergency_type}
URGENCY: {urgency}
SITUATION: {situation}
AFFECTED: {people}
LOCATION: {lat}, {lon}
IMAGE ANALYSIS: {summary}
WEATHER: {weather}
HISTORICAL: {history}

Analyze for government response. Provide:

1. THREAT VERIFICATION
- Genuine/False alarm assessment
- Data source cross-check
- Confidence: High/Medium/Low

2. SEVERITY SCALE (1-10)
- Rating with justification
- Historical comparison
- Impact assessment

3. FUTURE PROJECTIONS
- 6-24 hours
- 1-7 days
- 1-4 weeks
- Best/worst/likely scenarios
- Critical decision points

4. RESOURCE REQUIREMENTS
- Personnel needs
- Equipment/supplies
- Specialized teams
- Cost estimate

Format as government emergency report with actionable recommendations."#,
        emergency_type = report.emergency_type,
        urgency = report.urgency_level,
        situation = report.situation,
        people = report.people_count,
        lat = report.location.latitude,
        lon = report.location.longitude,
        summary = inputs.image_summary,
        weather = inputs.weather,
        history = inputs.disaster_history,
    );
    vec![
        PromptPart::Text(text),
        PromptPart::InlineImage(report.image.clone()),
    ]
}

pub fn citizen_prompt(inputs: &AnalysisInputs) -> Vec<PromptPart> {
    let report = &inputs.report;
    let current_weather = inputs
        .weather
        .get("current_weather")
        .cloned()
        .unwrap_or_else(|| json!({}));
    let kind = &report.emergency_type;
    let text = format!(
        r#"EMERGENCY SITUATION:
TYPE: {kind}
LOCATION: {lat}, {lon}
WEATHER: {current_weather}

Provide CONCISE SURVIVAL INSTRUCTIONS for {kind} disaster. Keep each point brief and specific:

1. IMMEDIATE ACTIONS (next 30 minutes)
- List 3-5 critical safety steps
- Key hazards to avoid
- Best safe position/location

2. SITUATION PREDICTION (next 2-6 hours)
- Expected conditions changes
- Peak danger timeframe
- Key warning signs to monitor

3. SURVIVAL PRIORITIES
- Essential shelter requirements
- Water/food priorities
- Medical concerns specific to {kind}
- Protection needed from elements

Use bullet points. Keep each point to 1-2 sentences maximum. Focus on actionable, specific guidance for {kind} in current conditions."#,
        lat = report.location.latitude,
        lon = report.location.longitude,
    );
    vec![
        PromptPart::Text(text),
        PromptPart::InlineImage(report.image.clone()),
    ]
}
