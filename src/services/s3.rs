// src/services/s3.rs
//
// Object storage access. The API never proxies file bytes; clients get
// short-lived presigned URLs and talk to S3 directly.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("S3 credentials not configured")]
    NotConfigured,

    #[error("S3 operation failed: {0}")]
    OperationFailed(String),
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub bucket: Option<String>,
}

pub struct S3Service {
    client: Option<S3Client>,
    bucket: Option<String>,
}

impl S3Service {
    pub fn new(config: S3Config) -> Self {
        let client = match (&config.access_key_id, &config.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials =
                    Credentials::new(key_id.clone(), secret.clone(), None, None, "env");
                let aws_config = aws_config::SdkConfig::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .credentials_provider(aws_sdk_s3::config::SharedCredentialsProvider::new(
                        credentials,
                    ))
                    .build();
                Some(S3Client::new(&aws_config))
            }
            _ => {
                warn!("S3Service: credentials not configured, presigning disabled");
                None
            }
        };

        Self {
            client,
            bucket: config.bucket,
        }
    }

    fn client_and_bucket(&self) -> Result<(&S3Client, &str), S3Error> {
        match (&self.client, &self.bucket) {
            (Some(client), Some(bucket)) => Ok((client, bucket)),
            _ => Err(S3Error::NotConfigured),
        }
    }

    /// Presigned PUT URL for a direct client upload
    pub async fn presign_upload(
        &self,
        object_key: &str,
        expires_in: Duration,
    ) -> Result<String, S3Error> {
        let (client, bucket) = self.client_and_bucket()?;

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| S3Error::OperationFailed(e.to_string()))?;

        let request = client
            .put_object()
            .bucket(bucket)
            .key(object_key)
            .presigned(presigning)
            .await
            .map_err(|e| S3Error::OperationFailed(e.to_string()))?;

        debug!(object_key = %object_key, "Generated presigned upload URL");
        Ok(request.uri().to_string())
    }

    /// Presigned GET URL for a direct client download
    pub async fn presign_download(
        &self,
        object_key: &str,
        expires_in: Duration,
    ) -> Result<String, S3Error> {
        let (client, bucket) = self.client_and_bucket()?;

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| S3Error::OperationFailed(e.to_string()))?;

        let request = client
            .get_object()
            .bucket(bucket)
            .key(object_key)
            .presigned(presigning)
            .await
            .map_err(|e| S3Error::OperationFailed(e.to_string()))?;

        debug!(object_key = %object_key, "Generated presigned download URL");
        Ok(request.uri().to_string())
    }
}
