//! S3 over the AWS SDK

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use std::path::Path;

use crate::aws::AwsSession;
use crate::error::{AwsError, StorageError};
use crate::storage::{ObjectStore, UploadSource};
use crate::utils::data_type::represent_int;
use crate::utils::error_helpers::convert_local_io_error;
use crate::utils::file::write_local_file;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// DeleteObjects accepts at most this many keys per request
pub const DELETE_BATCH_SIZE: usize = 1000;

fn s3_location(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

/// Status of a failed call: the service error code when it is numeric,
/// otherwise the HTTP status of the raw response
pub fn classify_status(error_code: Option<&str>, http_status: Option<u16>) -> Option<u16> {
    match error_code {
        Some(code) if represent_int(code) => code.trim().parse().ok().or(http_status),
        _ => http_status,
    }
}

fn error_status<E: ProvideErrorMetadata>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    classify_status(err.code(), err.raw_response().map(|r| r.status().as_u16()))
}

fn s3_error<E>(err: SdkError<E, HttpResponse>, location: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    StorageError::S3 {
        location: location.to_string(),
        status: error_status(&err),
        message: DisplayErrorContext(&err).to_string(),
    }
}

/// Leading `/` removed, trailing `/` added when non-empty
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.strip_prefix('/').unwrap_or(prefix);
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}

#[derive(Debug, Clone)]
pub struct S3Service {
    client: Client,
}

impl S3Service {
    /// Client with the standard retry policy of ten attempts
    pub fn new(session: &AwsSession) -> crate::Result<Self> {
        Self::with_max_attempts(session, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(session: &AwsSession, max_attempts: u32) -> crate::Result<Self> {
        if session.region().is_none() {
            return Err(AwsError::NoRegion.into());
        }

        log::debug!("Getting S3 client.");
        let config = aws_sdk_s3::config::Builder::from(session.config())
            .retry_config(RetryConfig::standard().with_max_attempts(max_attempts))
            .build();

        Ok(Self {
            client: Client::from_conf(config),
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn is_s3_key_exists(&self, s3_bucket: &str, s3_key: &str) -> crate::Result<bool> {
        log::debug!(
            "Checking the existence of {}",
            s3_location(s3_bucket, s3_key)
        );

        let result = self
            .client
            .list_objects_v2()
            .bucket(s3_bucket)
            .prefix(s3_key)
            .max_keys(1)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .contents()
                .first()
                .and_then(|object| object.key())
                .is_some_and(|key| key == s3_key)),
            Err(err) if error_status(&err) == Some(403) => {
                log::debug!("Bucket {} is forbidden", s3_bucket);
                Ok(false)
            }
            Err(err) => Err(s3_error(err, &s3_location(s3_bucket, s3_key)).into()),
        }
    }

    pub async fn is_s3_bucket_exists(&self, s3_bucket: &str) -> crate::Result<bool> {
        log::debug!("Checking the existence of s3://{}", s3_bucket);

        match self.client.head_bucket().bucket(s3_bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => match error_status(&err) {
                Some(403) => {
                    log::debug!("Bucket {} is forbidden", s3_bucket);
                    Ok(false)
                }
                Some(404) => {
                    log::debug!("Bucket {} does not exist", s3_bucket);
                    Ok(false)
                }
                _ => Err(s3_error(err, &format!("s3://{}", s3_bucket)).into()),
            },
        }
    }

    pub async fn upload_s3_object(
        &self,
        source: UploadSource,
        s3_bucket: &str,
        s3_key: &str,
    ) -> crate::Result<()> {
        let location = s3_location(s3_bucket, s3_key);
        log::debug!("Uploading {} to {}", source.describe(), location);

        let body = match source {
            UploadSource::File(path) => ByteStream::from_path(&path).await.map_err(|e| {
                convert_local_io_error(
                    std::io::Error::other(e.to_string()),
                    &path.to_string_lossy(),
                )
            })?,
            UploadSource::Bytes(bytes) => ByteStream::from(bytes),
        };

        self.client
            .put_object()
            .bucket(s3_bucket)
            .key(s3_key)
            .body(body)
            .send()
            .await
            .map_err(|err| s3_error(err, &location))?;

        Ok(())
    }

    /// Object content, `None` when missing or forbidden
    pub async fn read_s3_object(&self, s3_bucket: &str, s3_key: &str) -> crate::Result<Option<Vec<u8>>> {
        let location = s3_location(s3_bucket, s3_key);

        let output = match self.client.get_object().bucket(s3_bucket).key(s3_key).send().await {
            Ok(output) => output,
            Err(err) => {
                return match error_status(&err) {
                    Some(403) => {
                        log::debug!("S3 object {} is forbidden", location);
                        Ok(None)
                    }
                    Some(404) => {
                        log::debug!("S3 object {} does not exist", location);
                        Ok(None)
                    }
                    _ => Err(s3_error(err, &location).into()),
                };
            }
        };

        let data = output.body.collect().await.map_err(|e| StorageError::S3 {
            location: location.clone(),
            status: None,
            message: e.to_string(),
        })?;

        Ok(Some(data.into_bytes().to_vec()))
    }

    /// Download to a local file. Returns false when the object is missing or forbidden.
    pub async fn download_s3_object(
        &self,
        s3_bucket: &str,
        s3_key: &str,
        file_name: &Path,
    ) -> crate::Result<bool> {
        log::debug!(
            "Downloading {} to {}",
            s3_location(s3_bucket, s3_key),
            file_name.display()
        );

        match self.read_s3_object(s3_bucket, s3_key).await? {
            Some(bytes) => {
                write_local_file(file_name, &bytes).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn delete_s3_object(&self, s3_bucket: &str, s3_key: &str) -> crate::Result<()> {
        let location = s3_location(s3_bucket, s3_key);
        log::debug!("Deleting {}", location);

        self.client
            .delete_object()
            .bucket(s3_bucket)
            .key(s3_key)
            .send()
            .await
            .map_err(|err| s3_error(err, &location))?;

        Ok(())
    }

    /// Every key under `prefix` as given, directories included
    async fn keys_under(&self, s3_bucket: &str, s3_prefix: &str) -> Result<Vec<String>, StorageError> {
        let location = s3_location(s3_bucket, s3_prefix);
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(s3_bucket)
            .prefix(s3_prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| s3_error(err, &location))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }

        Ok(keys)
    }

    /// Delete every key under the prefix, then the prefix key itself.
    /// Returns the number of keys deleted; a missing or forbidden bucket deletes nothing.
    /// Keys S3 refuses to delete make the whole call fail, listing them.
    pub async fn delete_s3_prefix(&self, s3_bucket: &str, s3_prefix: &str) -> crate::Result<usize> {
        let location = format!("s3://{}/{}/", s3_bucket, s3_prefix);
        log::debug!("Deleting {}", location);

        let keys = match self.keys_under(s3_bucket, s3_prefix).await {
            Ok(keys) => keys,
            Err(StorageError::S3 {
                status: Some(status @ (403 | 404)),
                ..
            }) => {
                log::debug!(
                    "{} {}",
                    location,
                    if status == 403 { "is forbidden" } else { "does not exist" }
                );
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let mut failed = Vec::new();
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StorageError::S3 {
                    location: location.clone(),
                    status: None,
                    message: e.to_string(),
                })?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StorageError::S3 {
                    location: location.clone(),
                    status: None,
                    message: e.to_string(),
                })?;

            let output = self
                .client
                .delete_objects()
                .bucket(s3_bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|err| s3_error(err, &location))?;

            // Quiet mode reports only the keys that were not deleted.
            for error in output.errors() {
                let key = error.key().unwrap_or_default();
                log::warn!(
                    "Could not delete {}: {}",
                    s3_location(s3_bucket, key),
                    error.code().unwrap_or("unknown error")
                );
                failed.push(key.to_string());
            }
        }

        if !failed.is_empty() {
            return Err(StorageError::S3 {
                location,
                status: None,
                message: format!(
                    "{} of {} keys were not deleted: {}",
                    failed.len(),
                    keys.len(),
                    failed.join(", ")
                ),
            }
            .into());
        }

        if !s3_prefix.is_empty() && !keys.iter().any(|key| key == s3_prefix) {
            self.delete_s3_object(s3_bucket, s3_prefix).await?;
        }

        Ok(keys.len())
    }

    /// Keys under the normalised prefix, directory markers excluded.
    /// `None` when the bucket is missing or forbidden.
    pub async fn list_s3_keys(
        &self,
        s3_bucket: &str,
        s3_prefix: &str,
    ) -> crate::Result<Option<Vec<String>>> {
        let s3_prefix = normalize_prefix(s3_prefix);

        match self.keys_under(s3_bucket, &s3_prefix).await {
            Ok(keys) => Ok(Some(
                keys.into_iter().filter(|key| !key.ends_with('/')).collect(),
            )),
            Err(StorageError::S3 {
                status: Some(403 | 404),
                location,
                ..
            }) => {
                log::debug!("{} is forbidden or does not exist", location);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_s3_object_size(&self, s3_bucket: &str, s3_key: &str) -> crate::Result<Option<i64>> {
        let location = s3_location(s3_bucket, s3_key);

        match self.client.head_object().bucket(s3_bucket).key(s3_key).send().await {
            Ok(output) => Ok(output.content_length()),
            Err(err) => match error_status(&err) {
                Some(403) => {
                    log::debug!("{} is forbidden", location);
                    Ok(None)
                }
                Some(404) => {
                    log::debug!("{} does not exist", location);
                    Ok(None)
                }
                _ => Err(s3_error(err, &location).into()),
            },
        }
    }
}

#[async_trait]
impl ObjectStore for S3Service {
    fn scheme(&self) -> &'static str {
        "s3"
    }

    async fn exists(&self, bucket: &str, key: &str) -> crate::Result<bool> {
        self.is_s3_key_exists(bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> crate::Result<Option<Vec<u8>>> {
        self.read_s3_object(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> crate::Result<()> {
        self.upload_s3_object(UploadSource::Bytes(bytes), bucket, key)
            .await
    }

    async fn upload(&self, bucket: &str, key: &str, source: UploadSource) -> crate::Result<()> {
        self.upload_s3_object(source, bucket, key).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> crate::Result<()> {
        self.delete_s3_object(bucket, key).await
    }

    async fn size(&self, bucket: &str, key: &str) -> crate::Result<Option<u64>> {
        Ok(self
            .get_s3_object_size(bucket, key)
            .await?
            .and_then(|size| u64::try_from(size).ok()))
    }
}
