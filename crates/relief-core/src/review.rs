//! Operator review of submitted disasters and the nearby-disaster lookup.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::geo::Coordinates;
use crate::repository::DisasterRepository;
use crate::types::{DisasterRecord, DisasterStatus};

pub struct DisasterReview {
    disasters: Arc<dyn DisasterRepository>,
    config: PipelineConfig,
}

impl DisasterReview {
    pub fn new(disasters: Arc<dyn DisasterRepository>, config: PipelineConfig) -> Self {
        Self { disasters, config }
    }

    /// pending -> active
    pub async fn accept_disaster(&self, disaster_id: &str) -> Result<DisasterRecord> {
        self.transition(disaster_id, DisasterStatus::Active).await
    }

    /// pending -> archived
    pub async fn reject_disaster(&self, disaster_id: &str) -> Result<DisasterRecord> {
        self.transition(disaster_id, DisasterStatus::Archived).await
    }

    /// Recent disasters in the geohash cell of the point, newest first, with
    /// the generated report texts cleared. A failing store yields nothing.
    pub async fn nearby_disasters(&self, latitude: f64, longitude: f64) -> Vec<DisasterRecord> {
        let cell = Coordinates::new(latitude, longitude).disaster_cell();
        let since = Utc::now() - Duration::seconds(self.config.nearby_window_secs);

        match self
            .disasters
            .disasters_in_cell(&cell, since, self.config.nearby_query_limit)
            .await
        {
            Ok(records) => records
                .into_iter()
                .map(|mut record| {
                    record.government_report.clear();
                    record.citizen_guidance.clear();
                    record
                })
                .collect(),
            Err(err) => {
                warn!(geohash = %cell, "nearby disaster query failed: {err}");
                Vec::new()
            }
        }
    }

    async fn transition(&self, disaster_id: &str, to: DisasterStatus) -> Result<DisasterRecord> {
        let mut record = self
            .disasters
            .fetch_disaster(disaster_id)
            .await?
            .ok_or_else(|| PipelineError::DisasterNotFound(disaster_id.to_string()))?;

        if record.status != DisasterStatus::Pending {
            return Err(PipelineError::InvalidTransition {
                id: disaster_id.to_string(),
                from: record.status,
                to,
            });
        }

        self.disasters
            .update_disaster_status(disaster_id, to)
            .await?;
        info!(disaster_id, status = to.as_str(), "disaster reviewed");
        record.status = to;
        Ok(record)
    }
}
