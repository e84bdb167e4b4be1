//! GCE/GKE instance metadata server

use crate::api::client::{check_response, handle_response, http_client};
use crate::api::models::TokenResponse;
use crate::error::ApiError;
use crate::map_api_error;
use reqwest::Client;

pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";
pub const PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";
pub const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR: &str = "Google";

#[derive(Debug, Clone)]
pub struct MetadataServer {
    client: Client,
    base_url: String,
}

impl MetadataServer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url: String = base_url.into();
        Ok(MetadataServer {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = map_api_error!(
            self.client
                .get(url)
                .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
                .send()
                .await,
            path
        )?;
        Ok(response)
    }

    /// Project the instance runs in
    pub async fn project_id(&self) -> Result<String, ApiError> {
        let response = check_response(self.get(PROJECT_ID_PATH).await?, PROJECT_ID_PATH).await?;
        let text = map_api_error!(response.text().await, PROJECT_ID_PATH)?;
        Ok(text.trim().to_string())
    }

    /// Access token of the instance's default service account
    pub async fn access_token(&self) -> Result<TokenResponse, ApiError> {
        handle_response(self.get(TOKEN_PATH).await?, TOKEN_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let server = MetadataServer::new("http://localhost:8080/").unwrap();
        assert_eq!(server.base_url(), "http://localhost:8080");
    }
}
