#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use relief_core::object_store::{BucketError, ImageStore, InMemoryImageStore};
use relief_core::repository::{
    DisasterRepository, InMemoryStore, RepositoryError, ResourceRepository, TaskRepository,
    UserRequestRepository,
};
use relief_core::services::{
    DisasterFeed, FeedItem, ImageClassifier, LanguageModel, PromptPart, ServiceError,
    WeatherService,
};
use relief_core::types::{
    DisasterRecord, DisasterStatus, ProcessingMatrixRecord, ResourceCandidate, TaskRecord,
    UserRequestRecord,
};
use relief_core::{
    Coordinates, PipelineConfig, ReportPipeline, ReportRequest, ReportServices, TaskPipeline,
    TaskStores,
};
use serde_json::{json, Value};

pub const IMAGE_SUMMARY: &str = "Flood water covering a residential street";
pub const GOVERNMENT_TEXT: &str = "Severity 7. Deploy rescue boats.";
pub const CITIZEN_TEXT: &str = "Move to higher ground.";

pub struct FixedClassifier {
    pub result: Result<String, ServiceError>,
    pub delay: Duration,
}

impl FixedClassifier {
    pub fn ok() -> Self {
        Self {
            result: Ok(IMAGE_SUMMARY.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(ServiceError::Unavailable("vision model offline".into())),
            delay: Duration::ZERO,
        }
    }
}

impl ImageClassifier for FixedClassifier {
    fn classify(&self, _image: &[u8]) -> Result<String, ServiceError> {
        std::thread::sleep(self.delay);
        self.result.clone()
    }
}

/// Answers the two report prompts with fixed texts.
pub struct ReportModel {
    pub government: Result<String, ServiceError>,
    pub citizen: Result<String, ServiceError>,
    pub government_delay: Duration,
    pub citizen_delay: Duration,
    pub calls: AtomicUsize,
}

impl ReportModel {
    pub fn ok() -> Self {
        Self {
            government: Ok(GOVERNMENT_TEXT.to_string()),
            citizen: Ok(CITIZEN_TEXT.to_string()),
            government_delay: Duration::ZERO,
            citizen_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ReportModel {
    async fn generate(&self, prompt: &[PromptPart]) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let is_government = prompt.iter().any(|part| {
            matches!(part, PromptPart::Text(text) if text.contains("GOVERNMENT RESPONSE TEAM"))
        });
        if is_government {
            tokio::time::sleep(self.government_delay).await;
            self.government.clone()
        } else {
            tokio::time::sleep(self.citizen_delay).await;
            self.citizen.clone()
        }
    }
}

/// Replays queued responses in order, then reports the model as unavailable.
#[derive(Default)]
pub struct QueuedModel {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    prompts: Mutex<Vec<String>>,
}

impl QueuedModel {
    pub fn new(responses: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for QueuedModel {
    async fn generate(&self, prompt: &[PromptPart]) -> Result<String, ServiceError> {
        let text: String = prompt
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::InlineImage(_) => None,
            })
            .collect();
        self.prompts.lock().unwrap().push(text);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Unavailable("no scripted response".into())))
    }
}

pub struct StaticWeather {
    pub result: Result<Value, ServiceError>,
    pub delay: Duration,
}

impl StaticWeather {
    pub fn ok() -> Self {
        Self {
            result: Ok(json!({
                "current_weather": { "temperature": 18.0, "windspeed": 12.0 },
                "hourly": { "precipitation": [4.0, 6.5] }
            })),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl WeatherService for StaticWeather {
    async fn forecast(&self, _at: Coordinates) -> Result<Value, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

pub struct StaticFeed {
    pub result: Result<Vec<FeedItem>, ServiceError>,
    pub delay: Duration,
}

impl StaticFeed {
    pub fn with_items(items: Vec<FeedItem>) -> Self {
        Self {
            result: Ok(items),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl DisasterFeed for StaticFeed {
    async fn fetch_feed(&self) -> Result<Vec<FeedItem>, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

pub fn feed_item(title: &str, latitude: f64, longitude: f64) -> FeedItem {
    FeedItem {
        title: Some(title.to_string()),
        latitude: Some(latitude),
        longitude: Some(longitude),
        event_type: Some("FL".to_string()),
        ..FeedItem::default()
    }
}

/// Delegates to an in-memory store, failing the writes it is told to fail.
pub struct FlakyDisasters {
    pub inner: Arc<InMemoryStore>,
    pub fail_insert: bool,
    pub fail_matrix: bool,
    pub fail_reads: bool,
}

impl FlakyDisasters {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            fail_insert: false,
            fail_matrix: false,
            fail_reads: false,
        }
    }
}

fn backend_down() -> RepositoryError {
    RepositoryError::Backend("connection reset".into())
}

#[async_trait]
impl DisasterRepository for FlakyDisasters {
    async fn insert_disaster(&self, record: &DisasterRecord) -> Result<(), RepositoryError> {
        if self.fail_insert {
            return Err(backend_down());
        }
        self.inner.insert_disaster(record).await
    }

    async fn fetch_disaster(
        &self,
        disaster_id: &str,
    ) -> Result<Option<DisasterRecord>, RepositoryError> {
        if self.fail_reads {
            return Err(backend_down());
        }
        self.inner.fetch_disaster(disaster_id).await
    }

    async fn update_disaster_status(
        &self,
        disaster_id: &str,
        status: DisasterStatus,
    ) -> Result<(), RepositoryError> {
        self.inner.update_disaster_status(disaster_id, status).await
    }

    async fn disasters_in_cell(
        &self,
        geohash: &str,
        submitted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DisasterRecord>, RepositoryError> {
        if self.fail_reads {
            return Err(backend_down());
        }
        self.inner
            .disasters_in_cell(geohash, submitted_after, limit)
            .await
    }

    async fn insert_processing_matrix(
        &self,
        record: &ProcessingMatrixRecord,
    ) -> Result<(), RepositoryError> {
        if self.fail_matrix {
            return Err(backend_down());
        }
        self.inner.insert_processing_matrix(record).await
    }
}

pub struct BrokenResources;

#[async_trait]
impl ResourceRepository for BrokenResources {
    async fn resources_for_disaster(
        &self,
        _disaster_id: &str,
    ) -> Result<Vec<ResourceCandidate>, RepositoryError> {
        Err(backend_down())
    }
}

/// Task store whose deletes always fail.
pub struct StickyTasks {
    pub inner: Arc<InMemoryStore>,
}

#[async_trait]
impl TaskRepository for StickyTasks {
    async fn tasks_for(
        &self,
        user_id: &str,
        disaster_id: &str,
    ) -> Result<Vec<TaskRecord>, RepositoryError> {
        self.inner.tasks_for(user_id, disaster_id).await
    }

    async fn fetch_task(&self, task_id: &str) -> Result<Option<TaskRecord>, RepositoryError> {
        self.inner.fetch_task(task_id).await
    }

    async fn insert_task(&self, record: &TaskRecord) -> Result<(), RepositoryError> {
        self.inner.insert_task(record).await
    }

    async fn update_task(&self, record: &TaskRecord) -> Result<(), RepositoryError> {
        self.inner.update_task(record).await
    }

    async fn delete_task(&self, _task_id: &str) -> Result<(), RepositoryError> {
        Err(backend_down())
    }
}

/// Request store that accepts deletes but rejects every insert.
pub struct ReadOnlyRequests {
    pub inner: Arc<InMemoryStore>,
}

#[async_trait]
impl UserRequestRepository for ReadOnlyRequests {
    async fn fetch_user_request(
        &self,
        user_id: &str,
    ) -> Result<Option<UserRequestRecord>, RepositoryError> {
        self.inner.fetch_user_request(user_id).await
    }

    async fn insert_user_request(&self, _record: &UserRequestRecord) -> Result<(), RepositoryError> {
        Err(backend_down())
    }

    async fn delete_user_request(&self, user_id: &str) -> Result<(), RepositoryError> {
        self.inner.delete_user_request(user_id).await
    }
}

pub fn in_memory_stores(store: Arc<InMemoryStore>) -> TaskStores {
    TaskStores {
        disasters: store.clone(),
        resources: store.clone(),
        tasks: store.clone(),
        requests: store,
    }
}

pub struct BrokenImageStore;

#[async_trait]
impl ImageStore for BrokenImageStore {
    async fn put_image(&self, _key: &str, _bytes: Bytes) -> Result<String, BucketError> {
        Err(BucketError::Sdk("bucket unreachable".into()))
    }
}

pub struct ReportHarness {
    pub classifier: FixedClassifier,
    pub model: Arc<ReportModel>,
    pub weather: StaticWeather,
    pub feed: StaticFeed,
    pub config: PipelineConfig,
}

impl Default for ReportHarness {
    fn default() -> Self {
        Self {
            classifier: FixedClassifier::ok(),
            model: Arc::new(ReportModel::ok()),
            weather: StaticWeather::ok(),
            feed: StaticFeed::with_items(vec![feed_item("River flood", 10.1, 20.1)]),
            config: PipelineConfig::default(),
        }
    }
}

impl ReportHarness {
    pub fn build(
        self,
        disasters: Arc<dyn DisasterRepository>,
        images: Arc<dyn ImageStore>,
    ) -> ReportPipeline {
        let model: Arc<dyn LanguageModel> = self.model;
        let services = ReportServices {
            classifier: Arc::new(self.classifier),
            language_model: model,
            weather: Arc::new(self.weather),
            feed: Arc::new(self.feed),
        };
        ReportPipeline::new(services, disasters, images, self.config)
    }

    pub fn build_in_memory(self, store: Arc<InMemoryStore>) -> ReportPipeline {
        self.build(store, Arc::new(InMemoryImageStore::new()))
    }
}

pub fn report_request() -> ReportRequest {
    ReportRequest {
        emergency_type: "flood".to_string(),
        urgency_level: "high".to_string(),
        situation: "Water rising fast around the school".to_string(),
        people_count: 12,
        latitude: 10.0,
        longitude: 20.0,
        image: Bytes::from_static(b"\xff\xd8\xff\xe0jpeg"),
        user_id: "reporter-1".to_string(),
    }
}

pub fn task_pipeline(model: Arc<QueuedModel>, store: Arc<InMemoryStore>) -> TaskPipeline {
    TaskPipeline::new(model, in_memory_stores(store), PipelineConfig::default())
}

pub fn disaster(disaster_id: &str, emergency_type: &str, latitude: f64, longitude: f64) -> DisasterRecord {
    let location = Coordinates::new(latitude, longitude);
    DisasterRecord {
        disaster_id: disaster_id.to_string(),
        emergency_type: emergency_type.to_string(),
        urgency_level: "high".to_string(),
        situation: "Reported by citizen".to_string(),
        people_count: 3,
        latitude,
        longitude,
        geohash: location.disaster_cell(),
        government_report: "full government report".to_string(),
        citizen_guidance: "full citizen guidance".to_string(),
        user_id: "reporter-1".to_string(),
        submitted_at: Utc::now(),
        processing_secs: 1.5,
        status: DisasterStatus::Pending,
        image_url: None,
    }
}
