use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Source of uploaded photo bytes, owned by the surrounding application.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn load(&self, photo_id: &str, user_id: &str) -> Result<Vec<u8>, StorageError>;
}

/// Photos stored in Cloudflare R2 (S3-compatible) under `photos/{user}/{photo}`.
pub struct R2Client {
    bucket: Box<Bucket>,
}

impl R2Client {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self { bucket })
    }
}

pub fn photo_key(photo_id: &str, user_id: &str) -> String {
    format!("photos/{}/{}", user_id, photo_id)
}

#[async_trait]
impl PhotoSource for R2Client {
    async fn load(&self, photo_id: &str, user_id: &str) -> Result<Vec<u8>, StorageError> {
        let key = photo_key(photo_id, user_id);
        let response = self.bucket.get_object(&key).await?;
        match response.status_code() {
            200 => Ok(response.to_vec()),
            404 => Err(StorageError::NotFound(key)),
            status => Err(StorageError::Unavailable(status)),
        }
    }
}

/// Errors from the photo source.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Photo not found: {0}")]
    NotFound(String),

    #[error("Storage returned status {0}")]
    Unavailable(u16),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
