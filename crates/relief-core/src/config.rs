//! Tunables shared by both pipelines.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const ENV_PREFIX: &str = "RELIEF_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub weather_timeout_secs: u64,
    pub feed_timeout_secs: u64,
    /// Planar radius, in degrees, for keeping feed items near a report.
    pub history_radius: f64,
    /// Serialized audit logs above this many bytes are truncated.
    pub log_size_ceiling: usize,
    pub truncated_log_head: usize,
    pub nearby_resource_limit: usize,
    pub prompt_resource_limit: usize,
    pub nearby_window_secs: i64,
    pub nearby_query_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weather_timeout_secs: 10,
            feed_timeout_secs: 15,
            history_radius: 20.0,
            log_size_ceiling: 49_950,
            truncated_log_head: 10,
            nearby_resource_limit: 5,
            prompt_resource_limit: 3,
            nearby_window_secs: 7 * 24 * 60 * 60,
            nearby_query_limit: 100,
        }
    }
}

impl PipelineConfig {
    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| PipelineError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PipelineError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Optional TOML file, then `.env`, then `RELIEF_*` variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides looked up by upper-case field name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_field(&lookup, "WEATHER_TIMEOUT_SECS", &mut self.weather_timeout_secs)?;
        override_field(&lookup, "FEED_TIMEOUT_SECS", &mut self.feed_timeout_secs)?;
        override_field(&lookup, "HISTORY_RADIUS", &mut self.history_radius)?;
        override_field(&lookup, "LOG_SIZE_CEILING", &mut self.log_size_ceiling)?;
        override_field(&lookup, "TRUNCATED_LOG_HEAD", &mut self.truncated_log_head)?;
        override_field(&lookup, "NEARBY_RESOURCE_LIMIT", &mut self.nearby_resource_limit)?;
        override_field(&lookup, "PROMPT_RESOURCE_LIMIT", &mut self.prompt_resource_limit)?;
        override_field(&lookup, "NEARBY_WINDOW_SECS", &mut self.nearby_window_secs)?;
        override_field(&lookup, "NEARBY_QUERY_LIMIT", &mut self.nearby_query_limit)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weather_timeout_secs == 0 || self.feed_timeout_secs == 0 {
            return Err(PipelineError::Configuration(
                "service timeouts must be positive".into(),
            ));
        }
        if !self.history_radius.is_finite() || self.history_radius < 0.0 {
            return Err(PipelineError::Configuration(
                "history_radius must be a non-negative number".into(),
            ));
        }
        if self.nearby_window_secs <= 0 {
            return Err(PipelineError::Configuration(
                "nearby_window_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn override_field<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|err| {
            PipelineError::Configuration(format!("{ENV_PREFIX}{key}='{raw}': {err}"))
        })?;
    }
    Ok(())
}
