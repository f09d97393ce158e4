//! Contracts for the external services the pipelines depend on.
//!
//! Implementations own transport, authentication and payload decoding; the
//! pipelines only see these narrow interfaces.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geo::Coordinates;
use crate::proximity::Located;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One part of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    /// JPEG bytes sent inline alongside the text.
    InlineImage(Bytes),
}

impl PromptPart {
    pub fn text(value: impl Into<String>) -> Self {
        PromptPart::Text(value.into())
    }
}

/// Opaque image model. Synchronous and potentially CPU-heavy, so callers run
/// it on a blocking thread.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &[PromptPart]) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn forecast(&self, at: Coordinates) -> Result<Value, ServiceError>;
}

#[async_trait]
pub trait DisasterFeed: Send + Sync {
    async fn fetch_feed(&self) -> Result<Vec<FeedItem>, ServiceError>;
}

/// One entry of the global disaster alert feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl Located for FeedItem {
    fn location(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}
