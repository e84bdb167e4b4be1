use crate::api::auth::GoogleCredentials;
use crate::error::ApiError;
use crate::utils::error_helpers::*;
use crate::utils::retry::{RetryConfig, RetryExecutor};
use crate::{map_api_error, map_json_error};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("dataeng/", env!("CARGO_PKG_VERSION"));

/// Build the shared reqwest client used for every Google endpoint
pub(crate) fn http_client() -> Result<Client, ApiError> {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| convert_request_error(e, "client_init"))
}

/// Authenticated client for one Google REST service
#[derive(Debug, Clone)]
pub struct GoogleApiClient {
    client: Client,
    base_url: Url,
    credentials: Arc<GoogleCredentials>,
    retry: RetryExecutor,
}

impl GoogleApiClient {
    pub fn new(base_url: &str, credentials: Arc<GoogleCredentials>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Http {
            status: 0,
            endpoint: base_url.to_string(),
            message: format!("Invalid base URL: {}", e),
        })?;

        Ok(GoogleApiClient {
            client: http_client()?,
            base_url,
            credentials,
            retry: RetryExecutor::new(RetryConfig::default()),
        })
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Project the credentials belong to, if known
    pub fn project_id(&self) -> Option<&str> {
        self.credentials.project_id()
    }

    /// Append percent-encoded path segments to the base URL
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Http {
                status: 0,
                endpoint: self.base_url.to_string(),
                message: "Base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn build_request(&self, method: Method, url: Url) -> Result<RequestBuilder, ApiError> {
        let token = self.credentials.access_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, ApiError> {
        let response = map_api_error!(request.send().await, endpoint)?;
        check_response(response, endpoint).await
    }

    /// GET a JSON resource, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        self.retry
            .execute(|| async move {
                let endpoint = url.path();
                let request = self.build_request(Method::GET, url.clone()).await?;
                let response = self.send(request, endpoint).await?;
                map_json_error!(response.json::<T>().await, endpoint)
            })
            .await
    }

    /// GET raw bytes, e.g. object media
    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, ApiError> {
        self.retry
            .execute(|| async move {
                let endpoint = url.path();
                let request = self.build_request(Method::GET, url.clone()).await?;
                let response = self.send(request, endpoint).await?;
                let bytes = map_api_error!(response.bytes().await, endpoint)?;
                Ok(bytes.to_vec())
            })
            .await
    }

    /// Send a JSON body and decode the JSON reply. Idempotent methods
    /// (PUT, PATCH) are retried on transient failures.
    pub async fn send_json<B, T>(&self, method: Method, url: &Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let attempt = || {
            let method = method.clone();
            async move {
                let endpoint = url.path();
                let request = self.build_request(method, url.clone()).await?.json(body);
                let response = self.send(request, endpoint).await?;
                map_json_error!(response.json::<T>().await, endpoint)
            }
        };

        // PATCH bodies replace whole fields.
        let idempotent = [Method::PUT, Method::PATCH, Method::DELETE].contains(&method);
        if idempotent {
            self.retry.execute(attempt).await
        } else {
            attempt().await
        }
    }

    /// Send a raw body and decode the JSON reply.
    ///
    /// Media uploads are POSTs that create a new object generation, so a
    /// failed upload is reported to the caller instead of being resent.
    pub async fn send_bytes<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &Url,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<T, ApiError> {
        let endpoint = url.path();
        let request = self
            .build_request(method, url.clone())
            .await?
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        let response = self.send(request, endpoint).await?;
        map_json_error!(response.json::<T>().await, endpoint)
    }

    /// DELETE a resource, retrying transient failures
    pub async fn delete(&self, url: &Url) -> Result<(), ApiError> {
        self.retry
            .execute(|| async move {
                let endpoint = url.path();
                let request = self.build_request(Method::DELETE, url.clone()).await?;
                self.send(request, endpoint).await?;
                Ok(())
            })
            .await
    }
}

/// Map non-success statuses onto [`ApiError`]
pub async fn check_response(response: Response, endpoint: &str) -> Result<Response, ApiError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            server_message: message,
        }),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Err(convert_timeout_error(endpoint, DEFAULT_TIMEOUT_SECS))
        }
        _ => Err(ApiError::Http {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            message,
        }),
    }
}

/// Check the status and decode a JSON body
pub async fn handle_response<T: DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<T, ApiError> {
    let response = check_response(response, endpoint).await?;
    map_json_error!(response.json::<T>().await, endpoint)
}
