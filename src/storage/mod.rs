//! Object store surface
//!
//! S3-compatible storage restricted to the multipart-upload and
//! presigned-URL operations the VOD flow needs, plus key and URL builders
//! shared by every artifact type. Clip and DVR bytes are written by node
//! agents; this process only ever uploads VOD parts indirectly through
//! presigned URLs.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use std::time::Duration;

use crate::config::ObjectStoreConfig;
use crate::errors::{AppError, AppResult};

/// Default part size for multipart uploads
pub const DEFAULT_PART_SIZE: u64 = 20 * 1024 * 1024;
/// S3 caps multipart uploads at 10 000 parts
pub const MAX_PART_COUNT: u64 = 10_000;
/// S3 minimum part size for every part but the last of a multipart upload
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// Sizing plan for one multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub part_size: u64,
    pub part_count: u64,
}

/// Compute `(part_size, part_count)` for a file of `total_size` bytes
///
/// Starts from the 20 MiB default; when that would exceed 10 000 parts the
/// part size grows to `ceil(total / 10000)` rounded up to the next MiB. A
/// minimum of 5 MiB applies except for single-part uploads.
pub fn plan_parts(total_size: u64) -> PartPlan {
    if total_size == 0 {
        return PartPlan { part_size: 0, part_count: 0 };
    }

    let mut part_size = DEFAULT_PART_SIZE;
    if total_size.div_ceil(part_size) > MAX_PART_COUNT {
        let grown = total_size.div_ceil(MAX_PART_COUNT);
        part_size = grown.div_ceil(MIB) * MIB;
    }

    let mut part_count = total_size.div_ceil(part_size);
    if part_count > 1 && part_size < MIN_PART_SIZE {
        part_size = MIN_PART_SIZE;
        part_count = total_size.div_ceil(part_size);
    }
    if part_count == 1 {
        part_size = total_size;
    }

    PartPlan { part_size, part_count }
}

/// `clips/{tenant}/{stream}/{clip_hash}.{fmt}`
pub fn build_clip_key(tenant_id: &str, internal_name: &str, clip_hash: &str, format: &str) -> String {
    format!("clips/{tenant_id}/{internal_name}/{clip_hash}.{format}")
}

/// `dvr/{tenant}/{internal_name}/{dvr_hash}`
pub fn build_dvr_key(tenant_id: &str, internal_name: &str, dvr_hash: &str) -> String {
    format!("dvr/{tenant_id}/{internal_name}/{dvr_hash}")
}

/// `vod/{tenant}/{artifact_hash}/{artifact_hash}.{ext}`, extension taken
/// from the uploaded filename with mp4 as the fallback
pub fn build_vod_key(tenant_id: &str, artifact_hash: &str, filename: &str) -> String {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("mp4");
    format!("vod/{tenant_id}/{artifact_hash}/{artifact_hash}.{ext}")
}

/// Outbound surface of the object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Begin a multipart upload; returns the upload id
    async fn create_multipart_upload(&self, key: &str) -> AppResult<String>;

    /// Presigned PUT URLs for parts `1..=part_count`
    async fn presigned_upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        part_count: u64,
    ) -> AppResult<Vec<String>>;

    /// Complete the upload from the client-reported part ETags, in order
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        etags: &[String],
    ) -> AppResult<()>;

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Canonical `s3://bucket/prefix/key` URL with slashes collapsed
    fn build_s3_url(&self, key: &str) -> String;
}

/// AWS SDK implementation against any S3-compatible endpoint
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: Option<String>,
    presign_ttl: Duration,
}

impl S3ObjectStore {
    pub async fn from_config(config: &ObjectStoreConfig) -> Self {
        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder =
            aws_sdk_s3::config::Builder::from(&base).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            presign_ttl: config.presign_ttl,
        }
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix.as_deref() {
            Some(prefix) => format!(
                "{}/{}",
                prefix.trim_matches('/'),
                key.trim_start_matches('/')
            ),
            None => key.trim_start_matches('/').to_string(),
        }
    }

    fn store_err(operation: &str, err: impl std::fmt::Display) -> AppError {
        AppError::external_service("object-store", format!("{operation}: {err}"))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_multipart_upload(&self, key: &str) -> AppResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| Self::store_err("create_multipart_upload", e))?;
        output
            .upload_id()
            .map(|id| id.to_string())
            .ok_or_else(|| Self::store_err("create_multipart_upload", "no upload id returned"))
    }

    async fn presigned_upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        part_count: u64,
    ) -> AppResult<Vec<String>> {
        let presigning = PresigningConfig::expires_in(self.presign_ttl)
            .map_err(|e| Self::store_err("presign", e))?;
        let full_key = self.full_key(key);

        let mut urls = Vec::with_capacity(part_count as usize);
        for part_number in 1..=part_count {
            let request = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(&full_key)
                .upload_id(upload_id)
                .part_number(part_number as i32)
                .presigned(presigning.clone())
                .await
                .map_err(|e| Self::store_err("presign_upload_part", e))?;
            urls.push(request.uri().to_string());
        }
        Ok(urls)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        etags: &[String],
    ) -> AppResult<()> {
        let parts: Vec<CompletedPart> = etags
            .iter()
            .enumerate()
            .map(|(i, etag)| {
                CompletedPart::builder()
                    .part_number((i + 1) as i32)
                    .e_tag(etag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| Self::store_err("complete_multipart_upload", e))?;
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> AppResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| Self::store_err("abort_multipart_upload", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| Self::store_err("delete", e))?;
        Ok(())
    }

    fn build_s3_url(&self, key: &str) -> String {
        let full = self.full_key(key);
        let collapsed: Vec<&str> = full.split('/').filter(|s| !s.is_empty()).collect();
        format!("s3://{}/{}", self.bucket, collapsed.join("/"))
    }
}
