//! Cloud Storage over the JSON API

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

use crate::api::client::GoogleApiClient;
use crate::api::models::{Bucket, ObjectList, ObjectResource};
use crate::error::{ApiError, CliError};
use crate::storage::{ObjectStore, UploadSource};
use crate::utils::error_helpers::convert_storage_error;
use crate::utils::file::write_local_file;
use crate::utils::validation::validate_bucket_name;

pub const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";
const OCTET_STREAM: &str = "application/octet-stream";

fn gcs_location(bucket: &str, key: &str) -> String {
    if key.is_empty() {
        format!("gs://{}", bucket)
    } else {
        format!("gs://{}/{}", bucket, key)
    }
}

#[derive(Debug, Clone)]
pub struct GcsService {
    client: GoogleApiClient,
}

impl GcsService {
    pub fn new(client: GoogleApiClient) -> Self {
        Self { client }
    }

    fn bucket_url(&self, bucket: &str) -> Result<Url, ApiError> {
        self.client.url(&["storage", "v1", "b", bucket])
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, ApiError> {
        self.client.url(&["storage", "v1", "b", bucket, "o", key])
    }

    /// Object metadata, or the API error untouched
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectResource, ApiError> {
        self.client.get_json(&self.object_url(bucket, key)?).await
    }

    async fn insert_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<ObjectResource, ApiError> {
        let mut url = self.client.url(&["upload", "storage", "v1", "b", bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        self.client
            .send_bytes(Method::POST, &url, bytes, OCTET_STREAM)
            .await
    }

    async fn object_media(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ApiError> {
        let mut url = self.object_url(bucket, key)?;
        url.query_pairs_mut().append_pair("alt", "media");
        self.client.get_bytes(&url).await
    }

    /// Create a bucket in the client project. An existing bucket is returned
    /// as is; `None` when creation is forbidden.
    pub async fn create_bucket(&self, bucket_name: &str) -> crate::Result<Option<Bucket>> {
        validate_bucket_name(bucket_name)?;
        let project = self
            .client
            .project_id()
            .ok_or_else(|| CliError::MissingSetting {
                setting: "gcp_project".to_string(),
                hint: "Set DATAENG_GCP_PROJECT or 'dataeng-cli config set --gcp-project <id>'"
                    .to_string(),
            })?;

        let mut url = self.client.url(&["storage", "v1", "b"])?;
        url.query_pairs_mut().append_pair("project", project);

        match self
            .client
            .send_json::<_, Bucket>(Method::POST, &url, &json!({ "name": bucket_name }))
            .await
        {
            Ok(bucket) => {
                log::info!("Bucket {} created", bucket_name);
                Ok(Some(bucket))
            }
            Err(e) if e.is_conflict() => {
                log::debug!("{}", e);
                Ok(Some(self.get_bucket(bucket_name).await?))
            }
            Err(e) if e.is_forbidden() => {
                log::warn!("{}", e);
                Ok(None)
            }
            Err(e) => Err(convert_storage_error(e, &gcs_location(bucket_name, "")).into()),
        }
    }

    pub async fn get_bucket(&self, bucket_name: &str) -> crate::Result<Bucket> {
        self.client
            .get_json(&self.bucket_url(bucket_name)?)
            .await
            .map_err(|e| convert_storage_error(e, &gcs_location(bucket_name, "")).into())
    }

    /// Delete a bucket, with `force` emptying it first.
    /// Returns false when the bucket is missing, forbidden or not empty.
    pub async fn delete_bucket(&self, bucket_name: &str, force: bool) -> crate::Result<bool> {
        log::debug!("Deleting {}", gcs_location(bucket_name, ""));

        if force {
            match self.delete_gcs_prefix(bucket_name, "").await {
                Ok(_) => {}
                Err(crate::AppError::Storage(crate::error::StorageError::Api { source, .. }))
                    if source.is_not_found() || source.is_forbidden() =>
                {
                    log::warn!("{}", source);
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }
        }

        match self.client.delete(&self.bucket_url(bucket_name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() || e.is_forbidden() || e.is_conflict() => {
                log::warn!("{}", e);
                Ok(false)
            }
            Err(e) => Err(convert_storage_error(e, &gcs_location(bucket_name, "")).into()),
        }
    }

    pub async fn get_bucket_labels(
        &self,
        bucket_name: &str,
    ) -> crate::Result<Option<HashMap<String, String>>> {
        match self
            .client
            .get_json::<Bucket>(&self.bucket_url(bucket_name)?)
            .await
        {
            Ok(bucket) => Ok(Some(bucket.labels.unwrap_or_default())),
            Err(e) if e.is_not_found() || e.is_forbidden() => {
                log::warn!("{}", e);
                Ok(None)
            }
            Err(e) => Err(convert_storage_error(e, &gcs_location(bucket_name, "")).into()),
        }
    }

    /// Add or replace one bucket label
    pub async fn add_bucket_label(
        &self,
        bucket_name: &str,
        key: &str,
        value: &str,
    ) -> crate::Result<bool> {
        let Some(mut labels) = self.get_bucket_labels(bucket_name).await? else {
            return Ok(false);
        };
        labels.insert(key.to_string(), value.to_string());

        match self
            .client
            .send_json::<_, Bucket>(
                Method::PATCH,
                &self.bucket_url(bucket_name)?,
                &json!({ "labels": labels }),
            )
            .await
        {
            Ok(_) => {
                log::debug!("Updated labels for {}.", gcs_location(bucket_name, ""));
                Ok(true)
            }
            Err(e) if e.is_not_found() || e.is_forbidden() => {
                log::warn!("{}", e);
                Ok(false)
            }
            Err(e) => Err(convert_storage_error(e, &gcs_location(bucket_name, "")).into()),
        }
    }

    pub async fn is_gcs_key_exists(&self, gcs_bucket: &str, gcs_key: &str) -> crate::Result<bool> {
        log::debug!(
            "Checking the existence of {}",
            gcs_location(gcs_bucket, gcs_key)
        );

        match self.object_metadata(gcs_bucket, gcs_key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(convert_storage_error(e, &gcs_location(gcs_bucket, gcs_key)).into()),
        }
    }

    pub async fn delete_gcs_object(&self, gcs_bucket: &str, gcs_key: &str) -> crate::Result<()> {
        let location = gcs_location(gcs_bucket, gcs_key);
        log::debug!("Deleting {}.", location);

        self.client
            .delete(&self.object_url(gcs_bucket, gcs_key)?)
            .await
            .map_err(|e| convert_storage_error(e, &location).into())
    }

    /// Every object under `prefix`, following all pages
    pub async fn list_objects(
        &self,
        gcs_bucket: &str,
        gcs_prefix: &str,
    ) -> crate::Result<Vec<ObjectResource>> {
        let location = gcs_location(gcs_bucket, gcs_prefix);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.client.url(&["storage", "v1", "b", gcs_bucket, "o"])?;
            {
                let mut query = url.query_pairs_mut();
                if !gcs_prefix.is_empty() {
                    query.append_pair("prefix", gcs_prefix);
                }
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: ObjectList = self
                .client
                .get_json(&url)
                .await
                .map_err(|e| convert_storage_error(e, &location))?;

            objects.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(objects)
    }

    /// Delete every object under `prefix`, returning how many were deleted
    pub async fn delete_gcs_prefix(&self, gcs_bucket: &str, gcs_prefix: &str) -> crate::Result<usize> {
        log::info!("Deleting {}", gcs_location(gcs_bucket, gcs_prefix));

        let objects = self.list_objects(gcs_bucket, gcs_prefix).await?;
        for object in &objects {
            self.delete_gcs_object(gcs_bucket, &object.name).await?;
        }

        Ok(objects.len())
    }

    /// Upload a file or buffer. Returns false when the bucket does not exist.
    pub async fn upload_object_to_gcs(
        &self,
        source: UploadSource,
        gcs_bucket: &str,
        gcs_key: &str,
    ) -> crate::Result<bool> {
        let location = gcs_location(gcs_bucket, gcs_key);
        let description = source.describe();
        log::debug!("Uploading {} to {}.", description, location);

        let bytes = source.into_bytes().await?;
        match self.insert_object(gcs_bucket, gcs_key, bytes).await {
            Ok(_) => {
                log::info!("File {} uploaded to {}.", description, location);
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                log::info!("gs://{} does not exist - {}.", gcs_bucket, e);
                Ok(false)
            }
            Err(e) => Err(convert_storage_error(e, &location).into()),
        }
    }

    /// Download an object to a local file. Returns false when it does not exist.
    pub async fn download_object_from_gcs(
        &self,
        gcs_bucket: &str,
        gcs_key: &str,
        file_name: &Path,
    ) -> crate::Result<bool> {
        let location = gcs_location(gcs_bucket, gcs_key);
        log::debug!("Downloading: {} onto {}", location, file_name.display());

        match self.object_media(gcs_bucket, gcs_key).await {
            Ok(bytes) => {
                write_local_file(file_name, &bytes).await?;
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                log::info!("{} not found - {}.", location, e);
                Ok(false)
            }
            Err(e) => Err(convert_storage_error(e, &location).into()),
        }
    }

    pub async fn get_object_size(&self, gcs_bucket: &str, gcs_key: &str) -> crate::Result<Option<u64>> {
        match self.object_metadata(gcs_bucket, gcs_key).await {
            Ok(object) => Ok(object.size_bytes()),
            Err(e) if e.is_not_found() || e.is_forbidden() => {
                log::debug!("{}", e);
                Ok(None)
            }
            Err(e) => Err(convert_storage_error(e, &gcs_location(gcs_bucket, gcs_key)).into()),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsService {
    fn scheme(&self) -> &'static str {
        "gs"
    }

    async fn exists(&self, bucket: &str, key: &str) -> crate::Result<bool> {
        self.is_gcs_key_exists(bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> crate::Result<Option<Vec<u8>>> {
        match self.object_media(bucket, key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(convert_storage_error(e, &gcs_location(bucket, key)).into()),
        }
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> crate::Result<()> {
        self.insert_object(bucket, key, bytes)
            .await
            .map(|_| ())
            .map_err(|e| convert_storage_error(e, &gcs_location(bucket, key)).into())
    }

    async fn delete(&self, bucket: &str, key: &str) -> crate::Result<()> {
        self.delete_gcs_object(bucket, key).await
    }

    async fn size(&self, bucket: &str, key: &str) -> crate::Result<Option<u64>> {
        self.get_object_size(bucket, key).await
    }
}
