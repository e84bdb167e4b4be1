//! Naming conventions for buckets, object prefixes and datasets
//!
//! Bucket names are derived from a SHA-1 hash of their inputs so that every
//! project/organisation/group combination maps to a stable, globally unique
//! name under [`DOMAIN_NAME`].

use regex::Regex;
use sha1::{Digest, Sha1};
use std::sync::LazyLock;

use crate::api::metadata_server::MetadataServer;

pub const DOMAIN_NAME: &str = "dataeng.com";
pub const DAGS_BUCKET_PREFIX: &str = "composer";
pub const DATAFLOW_BUCKET_PREFIX: &str = "dataflow";
pub const TEST_BUCKET_PREFIX: &str = "test";
pub const DAGS_PREFIX: &str = "dags";

const HASH_LEN: usize = 10;
const PLACEHOLDER: &str = "_";

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid pattern"));

fn short_hash(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(HASH_LEN);
    hex
}

fn prefixed_bucket_name(bucket_prefix: &str, project_id: &str) -> String {
    format!("{}-{}.{}", bucket_prefix, short_hash(project_id), DOMAIN_NAME)
}

/// Ingestion bucket of an organisation's business group
pub fn get_ingestion_bucket_name(project_id: &str, org_name: &str, group_name: &str) -> String {
    let text = format!(
        "{}{}{}",
        project_id,
        org_name.to_lowercase(),
        group_name.to_lowercase()
    );
    format!("{}.{}", short_hash(&text), DOMAIN_NAME)
}

/// Modeling bucket of a Dataflow repository
pub fn get_modeling_bucket_name(
    project_id: &str,
    org_name: &str,
    group_name: &str,
    repo_name: &str,
) -> String {
    let text = format!(
        "{}{}{}{}",
        project_id,
        org_name.to_lowercase(),
        group_name.to_lowercase(),
        repo_name.to_lowercase()
    );
    format!("{}.{}", short_hash(&text), DOMAIN_NAME)
}

pub fn get_dags_bucket_name(project_id: &str) -> String {
    prefixed_bucket_name(DAGS_BUCKET_PREFIX, project_id)
}

/// Dataflow staging bucket
pub fn get_dataflow_bucket_name(project_id: &str) -> String {
    prefixed_bucket_name(DATAFLOW_BUCKET_PREFIX, project_id)
}

pub fn get_test_bucket_name(project_id: &str) -> String {
    prefixed_bucket_name(TEST_BUCKET_PREFIX, project_id)
}

pub fn get_dags_location(dags_bucket_name: &str) -> String {
    format!("gs://{}/{}", dags_bucket_name, DAGS_PREFIX)
}

/// Optional components of a prefix; unset parts render as `_`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixParts<'a> {
    pub location: Option<&'a str>,
    pub year: Option<&'a str>,
    pub month: Option<&'a str>,
    pub day: Option<&'a str>,
    pub hour: Option<&'a str>,
    pub minute: Option<&'a str>,
    pub second: Option<&'a str>,
}

impl<'a> PrefixParts<'a> {
    pub fn date(year: &'a str, month: &'a str, day: &'a str) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            ..Default::default()
        }
    }
}

/// Left-pad with zeros to `width`, keeping a leading sign in front.
/// Never truncates.
fn zero_fill(value: Option<&str>, width: usize) -> String {
    let value = match value {
        None | Some(PLACEHOLDER) => return PLACEHOLDER.to_string(),
        Some(v) => v,
    };

    let (sign, digits) = match value.strip_prefix(['+', '-']) {
        Some(rest) => (&value[..1], rest),
        None => ("", value),
    };
    let width = width.saturating_sub(sign.len());
    format!("{}{:0>width$}", sign, digits, width = width)
}

/// Object prefix of a data source or model. Timestamp parts are not validated.
pub fn get_prefix(
    data_source: &str,
    data_source_type: &str,
    format: &str,
    parts: PrefixParts<'_>,
) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}/{}/{}/{}/{}/",
        data_source,
        data_source_type,
        parts.location.unwrap_or(PLACEHOLDER),
        zero_fill(parts.year, 4),
        zero_fill(parts.month, 2),
        zero_fill(parts.day, 2),
        zero_fill(parts.hour, 2),
        zero_fill(parts.minute, 2),
        zero_fill(parts.second, 2),
        format
    )
}

fn sanitize_identifier(value: &str) -> String {
    NON_WORD
        .replace_all(value, "_")
        .trim_matches('_')
        .to_string()
}

/// Unique BigQuery staging dataset for one load
pub fn get_staging_dataset_id(data_source: &str, data_source_type: &str) -> String {
    let random = uuid::Uuid::new_v4().to_string().replace('-', "_");
    format!(
        "staging_{}_{}_{}",
        sanitize_identifier(data_source),
        sanitize_identifier(data_source_type),
        random
    )
}

pub fn get_success_file_location(data_source: &str, data_source_type: &str) -> String {
    format!("{}/{}/_SUCCESS", data_source, data_source_type)
}

/// Project of the current GCE/GKE instance, read from the metadata server
pub async fn get_project_id(metadata_server: &MetadataServer) -> crate::Result<String> {
    Ok(metadata_server.project_id().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_ingestion_bucket_name() {
        assert_eq!(
            get_ingestion_bucket_name("test", "test", "test"),
            "0071877d20.dataeng.com"
        );
        assert_eq!(
            get_ingestion_bucket_name("test", "TEST", "Test"),
            "0071877d20.dataeng.com"
        );
    }

    #[test]
    fn test_get_modeling_bucket_name() {
        assert_eq!(
            get_modeling_bucket_name("test", "test", "test", "test_url"),
            "759ed6f3d5.dataeng.com"
        );
        assert_eq!(
            get_modeling_bucket_name("test", "Test", "TEST", "TEST_URL"),
            "759ed6f3d5.dataeng.com"
        );
    }

    #[test]
    fn test_project_bucket_names() {
        assert_eq!(
            get_dags_bucket_name("test"),
            "composer-a94a8fe5cc.dataeng.com"
        );
        assert_eq!(
            get_dataflow_bucket_name("test"),
            "dataflow-a94a8fe5cc.dataeng.com"
        );
        assert_eq!(get_test_bucket_name("test"), "test-a94a8fe5cc.dataeng.com");
    }

    #[test]
    fn test_get_dags_location() {
        let bucket = get_dags_bucket_name("test");
        assert_eq!(
            get_dags_location(&bucket),
            "gs://composer-a94a8fe5cc.dataeng.com/dags"
        );
    }

    #[test]
    fn test_get_prefix() {
        let prefix = get_prefix(
            "gfk",
            "matched_report",
            "csv",
            PrefixParts::date("2018", "01", "31"),
        );
        assert_eq!(prefix, "gfk/matched_report/_/2018/01/31/_/_/_/csv/");
    }

    #[test]
    fn test_get_prefix_pads_short_parts() {
        let parts = PrefixParts {
            location: Some("de"),
            year: Some("18"),
            month: Some("1"),
            day: Some("5"),
            hour: Some("7"),
            minute: Some("0"),
            second: Some("123"),
        };
        assert_eq!(
            get_prefix("gfk", "report", "json", parts),
            "gfk/report/de/0018/01/05/07/00/123/json/"
        );
    }

    #[test]
    fn test_get_prefix_defaults() {
        assert_eq!(
            get_prefix("a", "b", "avro", PrefixParts::default()),
            "a/b/_/_/_/_/_/_/_/avro/"
        );
    }

    #[test]
    fn test_zero_fill_keeps_sign() {
        assert_eq!(zero_fill(Some("-5"), 3), "-05");
        assert_eq!(zero_fill(Some("_"), 4), "_");
    }

    #[test]
    fn test_get_staging_dataset_id() {
        let data_source = "gfk";
        let data_source_type = "matched_report";
        let dataset_id = get_staging_dataset_id(data_source, data_source_type);
        let prefix = format!("staging_{}_{}_", data_source, data_source_type);

        assert!(dataset_id.starts_with(&prefix));
        assert_eq!(dataset_id.len(), prefix.len() + 36);
        assert!(!dataset_id.contains('-'));
    }

    #[test]
    fn test_get_staging_dataset_id_sanitizes_names() {
        let dataset_id = get_staging_dataset_id("-my.source-", "type/v2");
        assert!(dataset_id.starts_with("staging_my_source_type_v2_"));
    }

    #[test]
    fn test_get_success_file_location() {
        assert_eq!(
            get_success_file_location("gfk", "matched_report"),
            "gfk/matched_report/_SUCCESS"
        );
    }
}
