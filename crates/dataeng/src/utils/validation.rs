//! Input validation and sanitization utilities
//!
//! This module provides utilities for validating user input, configuration
//! values and resource names before they are sent to remote services.

use crate::error::CliError;

/// Validate that a URL is properly formatted
pub fn validate_url(url: &str) -> crate::Result<()> {
    if url.is_empty() {
        return Err(CliError::InvalidArguments("URL cannot be empty".to_string()).into());
    }

    // Basic URL validation - must start with http:// or https://
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(CliError::InvalidArguments(format!(
            "Invalid URL '{}': URL must start with http:// or https://",
            url
        ))
        .into());
    }

    Ok(())
}

/// Validate a bucket name against the common GCS/S3 rules: 3-63 characters
/// (up to 222 with dots), lowercase letters, digits, `-`, `_` and `.`,
/// starting and ending with a letter or digit.
pub fn validate_bucket_name(name: &str) -> crate::Result<()> {
    let max_len = if name.contains('.') { 222 } else { 63 };
    if name.len() < 3 || name.len() > max_len {
        return Err(CliError::InvalidArguments(format!(
            "Invalid bucket name '{}': length must be between 3 and {}",
            name, max_len
        ))
        .into());
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    let valid_edges = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());

    if !valid_chars || !valid_edges {
        return Err(CliError::InvalidArguments(format!(
            "Invalid bucket name '{}': use lowercase letters, digits, '-', '_' and '.'",
            name
        ))
        .into());
    }

    Ok(())
}

/// Split `gs://bucket/key` into bucket and key
pub fn parse_gcs_uri(uri: &str) -> crate::Result<(String, String)> {
    let rest = uri.strip_prefix("gs://").ok_or_else(|| {
        CliError::InvalidArguments(format!("Invalid GCS URI '{}': must start with gs://", uri))
    })?;

    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() => Ok((bucket.to_string(), key.to_string())),
        None if !rest.is_empty() => Ok((rest.to_string(), String::new())),
        _ => Err(CliError::InvalidArguments(format!("Invalid GCS URI '{}': missing bucket", uri)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_valid_urls() {
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("https://storage.googleapis.com").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_invalid_urls() {
        assert!(validate_url("").is_err());
        assert!(validate_url("localhost:3000").is_err());
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("0071877d20.dataeng.com").is_ok());
        assert!(validate_bucket_name("composer-a94a8fe5cc").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper-case").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("trailing.").is_err());
    }

    #[test]
    fn test_parse_gcs_uri() {
        assert_eq!(
            parse_gcs_uri("gs://bucket/path/to/file.csv").unwrap(),
            ("bucket".to_string(), "path/to/file.csv".to_string())
        );
        assert_eq!(
            parse_gcs_uri("gs://bucket").unwrap(),
            ("bucket".to_string(), String::new())
        );
        assert!(parse_gcs_uri("s3://bucket/key").is_err());
        assert!(parse_gcs_uri("gs:///key").is_err());
    }
}
