//! Parallel data collection: image analysis, weather and disaster history.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::task::JoinError;

use super::context::{ReportRun, StepReport};
use super::ReportServices;
use crate::audit_log::AuditLog;
use crate::config::PipelineConfig;
use crate::geo::Coordinates;
use crate::proximity::within_radius;
use crate::services::{DisasterFeed, ImageClassifier, ServiceError, WeatherService};
use crate::types::{round2, OutcomeMap, Step};

const COORDINATOR: &str = "coordinator_data_collection";
pub(crate) const VISION: &str = "data_tool_computer_vision";
pub(crate) const WEATHER: &str = "data_tool_weather";
pub(crate) const HISTORY: &str = "data_tool_disaster_history";

const FEED_SOURCE: &str = "GDACS RSS Feed";
const SUMMARY_PREVIEW_CHARS: usize = 100;

/// Runs the three collection steps concurrently and merges their results in
/// a fixed order (vision, weather, history) whatever order they finish in.
pub(crate) async fn run(run: &mut ReportRun, services: &ReportServices, config: &PipelineConfig) {
    run.log
        .info(COORDINATOR, "Data collection: starting parallel data collection");
    run.outcomes = OutcomeMap::declared();

    let inputs = Arc::clone(&run.inputs);
    let vision = tokio::spawn(analyze_image(
        Arc::clone(&services.classifier),
        inputs.image.clone(),
    ));
    let weather = tokio::spawn(fetch_weather(
        Arc::clone(&services.weather),
        inputs.location,
        config.weather_timeout(),
    ));
    let history = tokio::spawn(fetch_history(
        Arc::clone(&services.feed),
        inputs.location,
        config.feed_timeout(),
        config.history_radius,
    ));

    let (vision, weather, history) = tokio::join!(vision, weather, history);

    let vision = settle(Step::ImageAnalysis, VISION, vision, |_| None);
    run.collection.image_summary = run.merge(vision);

    let weather = settle(Step::Weather, WEATHER, weather, error_payload);
    run.collection.weather = run.merge(weather);

    let history = settle(Step::DisasterHistory, HISTORY, history, error_payload);
    run.collection.disaster_history = run.merge(history);

    run.fan_out_complete = true;
    run.log
        .success(COORDINATOR, "Data collection: all collection steps finished");
}

/// Turns a panicked or cancelled step into an ordinary failed report.
pub(crate) fn settle<T>(
    step: Step,
    component: &str,
    joined: Result<StepReport<T>, JoinError>,
    on_abort: impl FnOnce(String) -> T,
) -> StepReport<T> {
    match joined {
        Ok(report) => report,
        Err(err) => {
            let message = format!("step aborted: {err}");
            let mut log = AuditLog::new();
            log.error(component, format!("{}: {message}", step.as_str()));
            StepReport::failed(step, on_abort(message), log)
        }
    }
}

fn error_payload(message: String) -> Value {
    json!({ "error": message })
}

async fn analyze_image(
    classifier: Arc<dyn ImageClassifier>,
    image: Bytes,
) -> StepReport<Option<String>> {
    let mut log = AuditLog::new();
    log.info(VISION, "Computer vision: classifying report image");

    let classified = tokio::task::spawn_blocking(move || classifier.classify(&image)).await;
    let result = match classified {
        Ok(result) => result,
        Err(err) => Err(ServiceError::Unavailable(format!("classifier aborted: {err}"))),
    };

    match result {
        Ok(summary) => {
            let preview: String = summary.chars().take(SUMMARY_PREVIEW_CHARS).collect();
            log.success(
                VISION,
                format!("Computer vision: analysis completed: {preview}..."),
            );
            StepReport::completed(Step::ImageAnalysis, Some(summary), log)
        }
        Err(err) => {
            log.error(VISION, format!("Computer vision: failed: {err}"));
            StepReport::failed(Step::ImageAnalysis, None, log)
        }
    }
}

async fn fetch_weather(
    weather: Arc<dyn WeatherService>,
    at: Coordinates,
    limit: Duration,
) -> StepReport<Value> {
    let mut log = AuditLog::new();
    log.info(WEATHER, "Weather: fetching forecast");

    let result = match tokio::time::timeout(limit, weather.forecast(at)).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit.as_secs())),
    };

    match result {
        Ok(payload) => {
            log.success(WEATHER, "Weather: forecast retrieved");
            StepReport::completed(Step::Weather, payload, log)
        }
        Err(err) => {
            log.error(WEATHER, format!("Weather: failed: {err}"));
            StepReport::failed(Step::Weather, error_payload(err.to_string()), log)
        }
    }
}

async fn fetch_history(
    feed: Arc<dyn DisasterFeed>,
    at: Coordinates,
    limit: Duration,
    radius: f64,
) -> StepReport<Value> {
    let mut log = AuditLog::new();
    log.info(HISTORY, "Disaster history: fetching current alert feed");

    let result = match tokio::time::timeout(limit, feed.fetch_feed()).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit.as_secs())),
    };

    let items = match result {
        Ok(items) => items,
        Err(err) => {
            let message = format!("Error processing disaster feed: {err}");
            log.error(HISTORY, format!("Disaster history: {message}"));
            return StepReport::failed(Step::DisasterHistory, error_payload(message), log);
        }
    };

    let nearby: Vec<Value> = within_radius(&at, items, radius)
        .into_iter()
        .map(|mut ranked| {
            ranked.distance = round2(ranked.distance);
            serde_json::to_value(&ranked).unwrap_or(Value::Null)
        })
        .collect();

    if nearby.is_empty() {
        log.success(
            HISTORY,
            format!("Disaster history: no active disasters within {radius} of the report"),
        );
    } else {
        log.success(
            HISTORY,
            format!(
                "Disaster history: found {} disasters within {radius}",
                nearby.len()
            ),
        );
    }

    let payload = json!({
        "search_location": {
            "latitude": at.latitude,
            "longitude": at.longitude,
            "search_radius": radius,
        },
        "total_disasters_found": nearby.len(),
        "nearby_disasters": nearby,
        "last_updated": Utc::now().to_rfc3339(),
        "data_source": FEED_SOURCE,
    });
    StepReport::completed(Step::DisasterHistory, payload, log)
}
