//! Report pipeline: collect -> validate -> analyze -> finalize -> persist.

mod analysis;
mod collection;
mod context;
mod finalize;
mod validation;

pub use analysis::{citizen_prompt, government_prompt, AnalysisInputs};
pub use context::{
    AnalysisOutputs, CollectionOutputs, ReportInputs, ReportRun, ReportStage, StepReport,
};
pub use finalize::{decide, REQUIRED_STEPS};
pub use validation::is_analysis_ready;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::geo::Coordinates;
use crate::object_store::{disaster_image_key, ImageStore};
use crate::repository::DisasterRepository;
use crate::services::{DisasterFeed, ImageClassifier, LanguageModel, WeatherService};
use crate::types::{
    ComponentsSummary, DisasterRecord, DisasterStatus, FinalStatus, OutcomeMap,
    ProcessingMatrixRecord,
};

const SYSTEM: &str = "system";

/// External services the report pipeline calls out to.
#[derive(Clone)]
pub struct ReportServices {
    pub classifier: Arc<dyn ImageClassifier>,
    pub language_model: Arc<dyn LanguageModel>,
    pub weather: Arc<dyn WeatherService>,
    pub feed: Arc<dyn DisasterFeed>,
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub emergency_type: String,
    pub urgency_level: String,
    pub situation: String,
    pub people_count: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub image: Bytes,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub disaster_id: String,
    pub government_report: String,
    pub citizen_guidance: String,
    pub processing_secs: f64,
    pub image_url: Option<String>,
    pub status: FinalStatus,
    pub outcomes: OutcomeMap,
    /// Whether the processing matrix (and with it the audit log) was stored.
    pub log_saved: bool,
}

/// `{geohash4}_{unix seconds}_{8 hex chars}`: unique in practice without any
/// coordination between writers.
pub fn new_disaster_id(at: &Coordinates) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        at.disaster_cell(),
        Utc::now().timestamp(),
        &suffix[..8]
    )
}

pub struct ReportPipeline {
    services: ReportServices,
    disasters: Arc<dyn DisasterRepository>,
    images: Arc<dyn ImageStore>,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(
        services: ReportServices,
        disasters: Arc<dyn DisasterRepository>,
        images: Arc<dyn ImageStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            services,
            disasters,
            images,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes one citizen report end to end.
    ///
    /// Only a failure to store the disaster record is returned as an error;
    /// step failures surface through the outcome map and final status.
    pub async fn process(&self, request: ReportRequest) -> Result<ReportSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let location = Coordinates::new(request.latitude, request.longitude);
        let disaster_id = new_disaster_id(&location);

        let mut run = ReportRun::new(
            disaster_id.clone(),
            ReportInputs {
                emergency_type: request.emergency_type,
                urgency_level: request.urgency_level,
                situation: request.situation,
                people_count: request.people_count,
                location,
                image: request.image,
                user_id: request.user_id,
            },
        );
        run.log
            .info(SYSTEM, "Emergency response system activated");
        run.log
            .info(SYSTEM, format!("Generated disaster id: {disaster_id}"));

        run.advance(ReportStage::Collecting);
        collection::run(&mut run, &self.services, &self.config).await;

        run.advance(ReportStage::Validating);
        validation::run(&mut run);

        run.advance(ReportStage::Analyzing);
        analysis::run(&mut run, &self.services).await;

        run.advance(ReportStage::Finalizing);
        let status = finalize::run(&mut run);
        run.advance(ReportStage::Done);

        let finished_at = Utc::now();
        let processing_secs = clock.elapsed().as_secs_f64();
        run.log.info(
            SYSTEM,
            format!("Total processing time: {processing_secs:.2} seconds"),
        );

        let image_url = self.upload_image(&mut run).await;

        run.log.info(SYSTEM, "Saving disaster record");
        let record = disaster_record(&run, started_at, processing_secs, image_url.clone());
        if let Err(err) = self.disasters.insert_disaster(&record).await {
            run.log
                .error(SYSTEM, format!("Failed to save disaster record: {err}"));
            return Err(err.into());
        }

        let log_saved = self
            .save_matrix(&mut run, status, started_at, finished_at, processing_secs)
            .await;

        run.log
            .success(SYSTEM, "Emergency response processing completed");

        Ok(ReportSummary {
            disaster_id,
            government_report: run.analysis.government_report,
            citizen_guidance: run.analysis.citizen_guidance,
            processing_secs,
            image_url,
            status,
            outcomes: run.outcomes,
            log_saved,
        })
    }

    async fn upload_image(&self, run: &mut ReportRun) -> Option<String> {
        run.log.info(SYSTEM, "Uploading report image");
        let key = disaster_image_key(&run.disaster_id);
        match self.images.put_image(&key, run.inputs.image.clone()).await {
            Ok(url) => {
                run.log.success(SYSTEM, "Report image uploaded");
                Some(url)
            }
            Err(err) => {
                run.log
                    .error(SYSTEM, format!("Image upload failed: {err}"));
                None
            }
        }
    }

    async fn save_matrix(
        &self,
        run: &mut ReportRun,
        status: FinalStatus,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        processing_secs: f64,
    ) -> bool {
        run.log.info(SYSTEM, "Saving processing matrix");

        let logs = match run
            .log
            .to_bounded_json(self.config.log_size_ceiling, self.config.truncated_log_head)
        {
            Ok(logs) => logs,
            Err(err) => {
                warn!(disaster_id = %run.disaster_id, "audit log serialization failed: {err}");
                "[]".to_string()
            }
        };

        let inputs = &run.inputs;
        let record = ProcessingMatrixRecord {
            disaster_id: run.disaster_id.clone(),
            processing_started_at: started_at,
            processing_finished_at: finished_at,
            total_processing_secs: processing_secs,
            components_summary: ComponentsSummary::from_outcomes(&run.outcomes),
            components_status: run.outcomes.clone(),
            final_status: status,
            logs,
            emergency_context: format!(
                "Type: {}, Urgency: {}, People: {}, Lat: {}, Lon: {}",
                inputs.emergency_type,
                inputs.urgency_level,
                inputs.people_count,
                inputs.location.latitude,
                inputs.location.longitude
            ),
        };

        match self.disasters.insert_processing_matrix(&record).await {
            Ok(()) => {
                run.log.success(SYSTEM, "Processing matrix saved");
                true
            }
            Err(err) => {
                run.log
                    .error(SYSTEM, format!("Failed to save processing matrix: {err}"));
                false
            }
        }
    }
}

/// Stored as pending whatever the aggregator decided; acceptance is left to
/// a human reviewer.
fn disaster_record(
    run: &ReportRun,
    submitted_at: DateTime<Utc>,
    processing_secs: f64,
    image_url: Option<String>,
) -> DisasterRecord {
    let inputs = &run.inputs;
    DisasterRecord {
        disaster_id: run.disaster_id.clone(),
        emergency_type: inputs.emergency_type.clone(),
        urgency_level: inputs.urgency_level.clone(),
        situation: inputs.situation.clone(),
        people_count: inputs.people_count,
        latitude: inputs.location.latitude,
        longitude: inputs.location.longitude,
        geohash: inputs.location.disaster_cell(),
        government_report: run.analysis.government_report.clone(),
        citizen_guidance: run.analysis.citizen_guidance.clone(),
        user_id: inputs.user_id.clone(),
        submitted_at,
        processing_secs,
        status: DisasterStatus::Pending,
        image_url,
    }
}
