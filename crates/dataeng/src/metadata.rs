//! Pipeline bookkeeping
//!
//! Each data source type keeps `{data_source}/{data_source_type}/metadata.json`
//! in a bucket, recording per format and market the last processed prefix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StorageError;
use crate::storage::ObjectStore;

pub const METADATA_FILE_NAME: &str = "metadata.json";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// State of one market within one format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yesterday_last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yesterday_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_values: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarketMetadata {
    fn record(&mut self, prefix: &str, yesterday: bool, now: DateTime<Utc>) {
        let timestamp = format_timestamp(now);
        if yesterday {
            self.yesterday_last_updated = Some(timestamp);
            self.yesterday_prefix = Some(prefix.to_string());
        } else {
            self.last_updated = Some(timestamp);
            self.prefix = Some(prefix.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// format -> market -> state
    #[serde(default)]
    pub last_success: BTreeMap<String, BTreeMap<String, MarketMetadata>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineMetadata {
    pub fn market(&self, format: &str, market: &str) -> Option<&MarketMetadata> {
        self.last_success.get(format).and_then(|m| m.get(market))
    }

    /// Entry for `format`/`market`, created when missing
    pub fn market_mut(&mut self, format: &str, market: &str) -> &mut MarketMetadata {
        self.last_success
            .entry(format.to_string())
            .or_default()
            .entry(market.to_string())
            .or_default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

pub fn metadata_key(data_source: &str, data_source_type: &str) -> String {
    format!("{}/{}/{}", data_source, data_source_type, METADATA_FILE_NAME)
}

/// Reads and writes metadata documents in one bucket
#[derive(Clone)]
pub struct MetadataService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl MetadataService {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `None` when no metadata has been written yet
    pub async fn get_metadata(
        &self,
        data_source: &str,
        data_source_type: &str,
    ) -> crate::Result<Option<PipelineMetadata>> {
        let key = metadata_key(data_source, data_source_type);
        let location = self.store.location(&self.bucket, &key);
        log::debug!("Getting metadata blob {}.", location);

        let Some(bytes) = self.store.get(&self.bucket, &key).await? else {
            log::debug!(
                "Metadata for {}/{} does not exist.",
                data_source,
                data_source_type
            );
            return Ok(None);
        };

        let metadata =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidMetadata {
                location,
                message: e.to_string(),
            })?;
        Ok(Some(metadata))
    }

    async fn put_metadata(
        &self,
        data_source: &str,
        data_source_type: &str,
        metadata: &PipelineMetadata,
    ) -> crate::Result<()> {
        let key = metadata_key(data_source, data_source_type);
        let json = metadata
            .to_json()
            .map_err(|e| StorageError::InvalidMetadata {
                location: self.store.location(&self.bucket, &key),
                message: e.to_string(),
            })?;

        log::debug!(
            "Uploading metadata: {} for {}/{}.",
            json,
            data_source,
            data_source_type
        );
        self.store.put(&self.bucket, &key, json.into_bytes()).await
    }

    async fn get_or_create(
        &self,
        data_source: &str,
        data_source_type: &str,
    ) -> crate::Result<PipelineMetadata> {
        Ok(match self.get_metadata(data_source, data_source_type).await? {
            Some(metadata) => metadata,
            None => {
                log::debug!(
                    "Metadata for {}/{} does not exist, create a new one.",
                    data_source,
                    data_source_type
                );
                PipelineMetadata::default()
            }
        })
    }

    /// Record `prefix` as the last processed prefix, or yesterday's
    pub async fn update_metadata(
        &self,
        data_source: &str,
        data_source_type: &str,
        market: &str,
        format: &str,
        prefix: &str,
        yesterday: bool,
    ) -> crate::Result<PipelineMetadata> {
        self.update_custom_metadata(
            data_source,
            data_source_type,
            market,
            format,
            prefix,
            Map::new(),
            yesterday,
        )
        .await
    }

    /// As [`Self::update_metadata`], also storing `custom_values` when non-empty
    #[allow(clippy::too_many_arguments)]
    pub async fn update_custom_metadata(
        &self,
        data_source: &str,
        data_source_type: &str,
        market: &str,
        format: &str,
        prefix: &str,
        custom_values: Map<String, Value>,
        yesterday: bool,
    ) -> crate::Result<PipelineMetadata> {
        let mut metadata = self.get_or_create(data_source, data_source_type).await?;

        let entry = metadata.market_mut(format, market);
        entry.record(prefix, yesterday, Utc::now());
        if !custom_values.is_empty() {
            entry.custom_values = Some(custom_values);
        }

        self.put_metadata(data_source, data_source_type, &metadata)
            .await?;
        Ok(metadata)
    }

    /// Drop yesterday's prefix and timestamp. Returns false when no metadata exists.
    pub async fn remove_yesterday_metadata(
        &self,
        data_source: &str,
        data_source_type: &str,
        market: &str,
        format: &str,
    ) -> crate::Result<bool> {
        let Some(mut metadata) = self.get_metadata(data_source, data_source_type).await? else {
            return Ok(false);
        };

        let entry = metadata.market_mut(format, market);
        entry.yesterday_last_updated = None;
        entry.yesterday_prefix = None;

        log::debug!(
            "Removing yesterday's metadata for {}/{}.",
            data_source,
            data_source_type
        );
        self.put_metadata(data_source, data_source_type, &metadata)
            .await?;
        Ok(true)
    }

    /// Write the current UTC time to `success_file_location`
    pub async fn mark_success(&self, success_file_location: &str) -> crate::Result<String> {
        log::debug!("Marking _SUCCESS file.");
        let content = format_timestamp(Utc::now());
        self.store
            .put(
                &self.bucket,
                success_file_location,
                content.clone().into_bytes(),
            )
            .await?;
        log::debug!(
            "_SUCCESS file has been uploaded with content: {}.",
            content
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::get_success_file_location;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    const BUCKET: &str = "0071877d20.dataeng.com";

    fn service() -> (Arc<MemoryStore>, MetadataService) {
        let store = Arc::new(MemoryStore::new());
        let service = MetadataService::new(store.clone(), BUCKET);
        (store, service)
    }

    #[test]
    fn test_format_timestamp() {
        let dt = Utc.with_ymd_and_hms(2018, 1, 31, 4, 5, 6).unwrap();
        assert_eq!(format_timestamp(dt), "2018-01-31 04:05:06.000000");
    }

    #[test]
    fn test_metadata_key() {
        assert_eq!(
            metadata_key("gfk", "matched_report"),
            "gfk/matched_report/metadata.json"
        );
    }

    #[tokio::test]
    async fn test_get_metadata_missing() {
        let (_, service) = service();
        assert!(service.get_metadata("gfk", "report").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_metadata_creates_document() {
        let (store, service) = service();

        service
            .update_metadata("gfk", "report", "de", "csv", "gfk/report/_/2018/01/31/", false)
            .await
            .unwrap();

        let metadata = service.get_metadata("gfk", "report").await.unwrap().unwrap();
        let entry = metadata.market("csv", "de").unwrap();
        assert_eq!(entry.prefix.as_deref(), Some("gfk/report/_/2018/01/31/"));
        assert!(entry.last_updated.is_some());
        assert!(entry.yesterday_prefix.is_none());

        let raw = store.get(BUCKET, "gfk/report/metadata.json").await.unwrap().unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.starts_with("{\n  \"last_success\""));
    }

    #[tokio::test]
    async fn test_update_yesterday_keeps_today() {
        let (_, service) = service();

        service
            .update_metadata("gfk", "report", "de", "csv", "today/", false)
            .await
            .unwrap();
        let metadata = service
            .update_metadata("gfk", "report", "de", "csv", "yesterday/", true)
            .await
            .unwrap();

        let entry = metadata.market("csv", "de").unwrap();
        assert_eq!(entry.prefix.as_deref(), Some("today/"));
        assert_eq!(entry.yesterday_prefix.as_deref(), Some("yesterday/"));
    }

    #[tokio::test]
    async fn test_update_custom_metadata() {
        let (_, service) = service();
        let custom = json!({"row_count": 42}).as_object().cloned().unwrap();

        let metadata = service
            .update_custom_metadata("gfk", "report", "de", "csv", "p/", custom, false)
            .await
            .unwrap();
        assert_eq!(
            metadata.market("csv", "de").unwrap().custom_values,
            Some(json!({"row_count": 42}).as_object().cloned().unwrap())
        );

        let metadata = service
            .update_custom_metadata("gfk", "report", "de", "csv", "q/", Map::new(), false)
            .await
            .unwrap();
        let entry = metadata.market("csv", "de").unwrap();
        assert_eq!(entry.prefix.as_deref(), Some("q/"));
        assert!(entry.custom_values.is_some());
    }

    #[tokio::test]
    async fn test_remove_yesterday_metadata() {
        let (_, service) = service();
        assert!(
            !service
                .remove_yesterday_metadata("gfk", "report", "de", "csv")
                .await
                .unwrap()
        );

        service
            .update_metadata("gfk", "report", "de", "csv", "today/", false)
            .await
            .unwrap();
        service
            .update_metadata("gfk", "report", "de", "csv", "yesterday/", true)
            .await
            .unwrap();
        assert!(
            service
                .remove_yesterday_metadata("gfk", "report", "de", "csv")
                .await
                .unwrap()
        );

        let metadata = service.get_metadata("gfk", "report").await.unwrap().unwrap();
        let entry = metadata.market("csv", "de").unwrap();
        assert!(entry.yesterday_prefix.is_none());
        assert!(entry.yesterday_last_updated.is_none());
        assert_eq!(entry.prefix.as_deref(), Some("today/"));
    }

    #[tokio::test]
    async fn test_unknown_fields_are_preserved() {
        let (store, service) = service();
        let document = json!({
            "owner": "data-team",
            "last_success": {"csv": {"de": {"prefix": "old/", "note": "keep"}}}
        });
        store
            .put(BUCKET, "gfk/report/metadata.json", document.to_string().into_bytes())
            .await
            .unwrap();

        let metadata = service
            .update_metadata("gfk", "report", "de", "csv", "new/", false)
            .await
            .unwrap();

        assert_eq!(metadata.extra.get("owner"), Some(&json!("data-team")));
        let entry = metadata.market("csv", "de").unwrap();
        assert_eq!(entry.extra.get("note"), Some(&json!("keep")));
        assert_eq!(entry.prefix.as_deref(), Some("new/"));
    }

    #[tokio::test]
    async fn test_invalid_metadata_document() {
        let (store, service) = service();
        store
            .put(BUCKET, "gfk/report/metadata.json", b"not json".to_vec())
            .await
            .unwrap();

        assert!(matches!(
            service.get_metadata("gfk", "report").await,
            Err(crate::AppError::Storage(StorageError::InvalidMetadata { .. }))
        ));
    }

    #[tokio::test]
    async fn test_mark_success() {
        let (store, service) = service();
        let location = get_success_file_location("gfk", "report");

        let content = service.mark_success(&location).await.unwrap();
        let stored = store.get(BUCKET, "gfk/report/_SUCCESS").await.unwrap().unwrap();
        assert_eq!(stored, content.into_bytes());
    }
}
