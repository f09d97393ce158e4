#![cfg(feature = "s3")]

use anyhow::{Context, Result};
use bytes::Bytes;
use relief_core::object_store::{disaster_image_key, ImageStore, S3Config, S3ImageStore};
use uuid::Uuid;

const TEST_PREFIX: &str = "RELIEF_TEST_S3_";
const REQUIRED_VARS: &[&str] = &[
    "RELIEF_TEST_S3_BUCKET",
    "RELIEF_TEST_S3_ENDPOINT",
    "RELIEF_TEST_S3_ACCESS_KEY_ID",
    "RELIEF_TEST_S3_SECRET_ACCESS_KEY",
];

fn configured() -> bool {
    REQUIRED_VARS.iter().all(|var| {
        std::env::var(var)
            .ok()
            .filter(|value| !value.is_empty())
            .is_some()
    })
}

#[tokio::test]
async fn s3_image_store_uploads_under_disaster_key() -> Result<()> {
    if !configured() {
        eprintln!(
            "Skipping S3 image store test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    }

    let config = S3Config::from_lookup(TEST_PREFIX, |key| std::env::var(key).ok())
        .context("invalid S3 test configuration")?;
    let store = S3ImageStore::new(config.clone())
        .await
        .context("failed to build S3 image store")?;

    let disaster_id = format!("test_{}", Uuid::new_v4().simple());
    let key = disaster_image_key(&disaster_id);
    let url = store
        .put_image(&key, Bytes::from_static(b"\xff\xd8\xff\xe0relief integration test"))
        .await
        .context("upload to S3 failed")?;

    assert_eq!(url, config.public_url(&key));
    assert!(url.ends_with(&format!("disasters/{disaster_id}.jpg")));

    store
        .delete_image(&key)
        .await
        .context("cleanup delete failed")?;
    Ok(())
}
