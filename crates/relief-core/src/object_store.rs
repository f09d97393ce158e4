//! Object storage for report images.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
    /// Base used to build public URLs; derived from bucket/region/endpoint
    /// when absent.
    pub public_base_url: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "relief-disaster-images".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            public_base_url: None,
        }
    }
}

impl S3Config {
    /// Reads `{prefix}BUCKET`, `REGION`, `ENDPOINT`, `ACCESS_KEY_ID`,
    /// `SECRET_ACCESS_KEY`, `FORCE_PATH_STYLE` and `PUBLIC_BASE_URL` through
    /// `lookup`. Unset keys keep their defaults.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, BucketError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(&format!("{prefix}{key}")).filter(|value| !value.trim().is_empty())
        };
        let defaults = Self::default();

        let force_path_style = match read("FORCE_PATH_STYLE") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                BucketError::Configuration(format!(
                    "{prefix}FORCE_PATH_STYLE must be true or false, got '{raw}'"
                ))
            })?,
            None => defaults.force_path_style,
        };

        let config = Self {
            bucket: read("BUCKET").unwrap_or(defaults.bucket),
            region: read("REGION").unwrap_or(defaults.region),
            endpoint: read("ENDPOINT"),
            access_key_id: read("ACCESS_KEY_ID"),
            secret_access_key: read("SECRET_ACCESS_KEY"),
            force_path_style,
            public_base_url: read("PUBLIC_BASE_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    /// `RELIEF_S3_*` variables from the process environment.
    pub fn from_env() -> Result<Self, BucketError> {
        Self::from_lookup("RELIEF_S3_", |key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), BucketError> {
        if self.bucket.trim().is_empty() {
            return Err(BucketError::Configuration("bucket name cannot be empty".into()));
        }
        if self.region.trim().is_empty() {
            return Err(BucketError::Configuration("region cannot be empty".into()));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(BucketError::Configuration(
                "access key id and secret access key must be set together".into(),
            ));
        }
        Ok(())
    }

    pub fn public_url(&self, key: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}/{}", base.trim_end_matches('/'), key);
        }
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("object not found: {0}")]
    NotFound(String),
}

/// Key under which a disaster's report image is stored.
pub fn disaster_image_key(disaster_id: &str) -> String {
    format!("disasters/{disaster_id}.jpg")
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn put_image(&self, key: &str, bytes: Bytes) -> Result<String, BucketError>;
}

/// Keeps uploads in memory and hands out `memory://` URLs.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, BucketError> {
        self.objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn put_image(&self, key: &str, bytes: Bytes) -> Result<String, BucketError> {
        self.objects.lock().await.insert(key.to_string(), bytes);
        Ok(format!("memory://{key}"))
    }
}

#[cfg(feature = "s3")]
pub use s3::S3ImageStore;

#[cfg(feature = "s3")]
mod s3 {
    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_credential_types::Credentials;
    use aws_sdk_s3::config::Region;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::Client;
    use bytes::Bytes;
    use tracing::debug;

    use super::{BucketError, ImageStore, S3Config};

    const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

    fn sdk_error(err: impl std::fmt::Display) -> BucketError {
        BucketError::Sdk(err.to_string())
    }

    /// Report images in an S3-compatible bucket, addressed by
    /// [`S3Config::public_url`].
    #[derive(Clone)]
    pub struct S3ImageStore {
        client: Client,
        config: S3Config,
    }

    impl S3ImageStore {
        pub async fn new(config: S3Config) -> Result<Self, BucketError> {
            config.validate()?;

            let loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()));
            let loader = match (&config.access_key_id, &config.secret_access_key) {
                (Some(key_id), Some(secret)) => loader.credentials_provider(Credentials::new(
                    key_id.as_str(),
                    secret.as_str(),
                    None,
                    None,
                    "relief-static",
                )),
                _ => loader,
            };
            let shared = loader.load().await;

            let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
            s3_config.set_endpoint_url(config.endpoint.clone());
            s3_config.set_force_path_style(Some(config.force_path_style));

            debug!(bucket = %config.bucket, region = %config.region, "s3 image store configured");
            Ok(Self {
                client: Client::from_conf(s3_config.build()),
                config,
            })
        }

        pub fn config(&self) -> &S3Config {
            &self.config
        }

        pub async fn delete_image(&self, key: &str) -> Result<(), BucketError> {
            self.client
                .delete_object()
                .bucket(&self.config.bucket)
                .key(key)
                .send()
                .await
                .map_err(sdk_error)?;
            Ok(())
        }
    }

    #[async_trait]
    impl ImageStore for S3ImageStore {
        async fn put_image(&self, key: &str, bytes: Bytes) -> Result<String, BucketError> {
            let size = bytes.len();
            self.client
                .put_object()
                .bucket(&self.config.bucket)
                .key(key)
                .content_type(IMAGE_CONTENT_TYPE)
                .body(ByteStream::from(bytes))
                .send()
                .await
                .map_err(sdk_error)?;
            debug!(key, size, "report image stored");
            Ok(self.config.public_url(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_prefers_explicit_base() {
        let config = S3Config {
            public_base_url: Some("https://cdn.example.org/".into()),
            ..S3Config::default()
        };
        assert_eq!(
            config.public_url("disasters/abc.jpg"),
            "https://cdn.example.org/disasters/abc.jpg"
        );
    }

    #[test]
    fn public_url_falls_back_to_endpoint_then_aws() {
        let custom = S3Config {
            endpoint: Some("http://localhost:9000".into()),
            ..S3Config::default()
        };
        assert_eq!(
            custom.public_url("k"),
            "http://localhost:9000/relief-disaster-images/k"
        );
        assert_eq!(
            S3Config::default().public_url("k"),
            "https://relief-disaster-images.s3.us-east-1.amazonaws.com/k"
        );
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned()
    }

    #[test]
    fn config_from_lookup_reads_prefixed_keys() {
        let config = S3Config::from_lookup(
            "RELIEF_S3_",
            lookup(&[
                ("RELIEF_S3_BUCKET", "reports"),
                ("RELIEF_S3_ENDPOINT", "http://localhost:9000"),
                ("RELIEF_S3_ACCESS_KEY_ID", "minio"),
                ("RELIEF_S3_SECRET_ACCESS_KEY", "minio-secret"),
                ("RELIEF_S3_FORCE_PATH_STYLE", "true"),
            ]),
        )
        .expect("config");
        assert_eq!(config.bucket, "reports");
        assert_eq!(config.region, "us-east-1");
        assert!(config.force_path_style);
        assert_eq!(config.public_url("k"), "http://localhost:9000/reports/k");
    }

    #[test]
    fn config_rejects_half_credentials_and_bad_flags() {
        let half = S3Config::from_lookup("S3_", lookup(&[("S3_ACCESS_KEY_ID", "only-id")]));
        assert!(matches!(half, Err(BucketError::Configuration(_))));

        let flag = S3Config::from_lookup("S3_", lookup(&[("S3_FORCE_PATH_STYLE", "sometimes")]));
        assert!(matches!(flag, Err(BucketError::Configuration(_))));
    }

    #[tokio::test]
    async fn in_memory_store_returns_uploaded_bytes() {
        let store = InMemoryImageStore::new();
        let key = disaster_image_key("u4pr_1_abcd1234");
        let url = store
            .put_image(&key, Bytes::from_static(b"jpeg"))
            .await
            .expect("upload");
        assert_eq!(url, "memory://disasters/u4pr_1_abcd1234.jpg");
        assert_eq!(store.get(&key).await.expect("get"), Bytes::from_static(b"jpeg"));
    }
}
