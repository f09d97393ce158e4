//! Gate between data collection and AI analysis.

use serde_json::Value;

use super::context::{CollectionOutputs, ReportRun};

const COMPONENT: &str = "coordinator_validation";

/// Only the image classification is a hard dependency for AI analysis;
/// weather and history are reported but never block.
pub fn is_analysis_ready(collection: &CollectionOutputs) -> bool {
    collection
        .image_summary
        .as_deref()
        .is_some_and(|summary| !summary.is_empty())
}

pub(crate) fn run(run: &mut ReportRun) {
    run.log
        .info(COMPONENT, "Data validation: validating collected data");

    let weather_ok = !carries_error(&run.collection.weather);
    let history_ok = !carries_error(&run.collection.disaster_history);
    run.analysis_ready = is_analysis_ready(&run.collection);

    run.log.success(
        COMPONENT,
        format!(
            "Data validation: complete (weather usable: {weather_ok}, history usable: {history_ok}). Ready for AI analysis: {}",
            run.analysis_ready
        ),
    );
}

fn carries_error(payload: &Value) -> bool {
    payload.get("error").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs(summary: Option<&str>) -> CollectionOutputs {
        CollectionOutputs {
            image_summary: summary.map(str::to_string),
            weather: json!({ "error": "down" }),
            disaster_history: json!({ "error": "down" }),
        }
    }

    #[test]
    fn ready_when_image_summary_present_even_if_others_failed() {
        assert!(is_analysis_ready(&outputs(Some("flood detected, 3 people"))));
    }

    #[test]
    fn blocked_without_image_summary() {
        assert!(!is_analysis_ready(&outputs(None)));
        assert!(!is_analysis_ready(&outputs(Some(""))));
    }
}
