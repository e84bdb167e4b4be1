//! Environment variable configuration
//!
//! Settings that may be supplied through the environment instead of the
//! configuration file.

pub const ENV_GCP_PROJECT: &str = "DATAENG_GCP_PROJECT";
pub const ENV_GCP_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_AWS_REGION: &str = "DATAENG_AWS_REGION";
pub const ENV_MYSQL_URL: &str = "DATAENG_MYSQL_URL";
pub const ENV_MSSQL_CONNECTION_STRING: &str = "DATAENG_MSSQL_CONNECTION_STRING";
pub const ENV_LOG_LEVEL: &str = "DATAENG_LOG_LEVEL";

/// Environment variable configuration reader
pub struct EnvConfigReader;

impl EnvConfigReader {
    fn read(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn read_gcp_project() -> Option<String> {
        Self::read(ENV_GCP_PROJECT)
    }

    /// Path to a service account key file
    pub fn read_gcp_credentials() -> Option<String> {
        Self::read(ENV_GCP_CREDENTIALS)
    }

    pub fn read_aws_region() -> Option<String> {
        Self::read(ENV_AWS_REGION)
    }

    pub fn read_mysql_url() -> Option<String> {
        Self::read(ENV_MYSQL_URL)
    }

    pub fn read_mssql_connection_string() -> Option<String> {
        Self::read(ENV_MSSQL_CONNECTION_STRING)
    }

    pub fn read_log_level() -> Option<String> {
        Self::read(ENV_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_aws_region_with_value() {
        unsafe {
            std::env::set_var(ENV_AWS_REGION, "eu-west-1");
        }
        assert_eq!(
            EnvConfigReader::read_aws_region(),
            Some("eu-west-1".to_string())
        );
        unsafe {
            std::env::remove_var(ENV_AWS_REGION);
        }
    }

    #[test]
    fn test_blank_value_is_ignored() {
        unsafe {
            std::env::set_var(ENV_MYSQL_URL, "   ");
        }
        assert!(EnvConfigReader::read_mysql_url().is_none());
        unsafe {
            std::env::remove_var(ENV_MYSQL_URL);
        }
    }
}
