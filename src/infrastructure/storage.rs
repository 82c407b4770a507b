use crate::config::AppConfig;
use crate::services::storage::S3StorageService;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

/// Builds the S3 client for the configured MinIO endpoint and makes sure
/// the media bucket exists before the first upload lands.
pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Arc<S3StorageService>> {
    info!(
        "🪣 Media storage: {} (bucket '{}')",
        config.minio_endpoint, config.minio_bucket
    );

    let credentials = Credentials::new(
        config.minio_access_key.clone(),
        config.minio_secret_key.clone(),
        None,
        None,
        "config",
    );

    let base = aws_config::from_env()
        .endpoint_url(&config.minio_endpoint)
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .load()
        .await;

    let client = Client::from_conf(
        aws_sdk_s3::config::Builder::from(&base)
            .force_path_style(true)
            .build(),
    );

    ensure_bucket(&client, &config.minio_bucket).await?;

    Ok(Arc::new(S3StorageService::new(
        client,
        config.minio_bucket.clone(),
    )))
}

async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    if client.head_bucket().bucket(bucket).send().await.is_ok() {
        return Ok(());
    }

    client
        .create_bucket()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create media bucket '{bucket}': {e}"))?;
    info!("🪣 Created media bucket '{}'", bucket);

    Ok(())
}
