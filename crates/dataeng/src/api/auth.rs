//! Google credentials and OAuth2 access tokens
//!
//! Credentials are resolved in order: an explicit service account key (file
//! or in-memory JSON), the file named by `GOOGLE_APPLICATION_CREDENTIALS`,
//! then the instance metadata server. Access tokens are cached until shortly
//! before they expire.

use crate::api::client::{handle_response, http_client};
use crate::api::metadata_server::MetadataServer;
use crate::api::models::TokenResponse;
use crate::error::ApiError;
use crate::map_api_error;
use crate::utils::input::EnvConfigReader;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Service account key as downloaded from the Cloud console
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ApiError::Credentials {
            message: format!("Unable to read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ApiError> {
        serde_json::from_str(content).map_err(|e| ApiError::Credentials {
            message: format!("Invalid service account key: {}", e),
        })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Credentials {
            message: format!("Invalid service account key: {}", e),
        })
    }
}

/// Explicitly supplied credentials
#[derive(Debug, Clone)]
pub enum CredentialsSource {
    File(PathBuf),
    Json(serde_json::Value),
}

#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A pre-issued access token, never refreshed
    Static(String),
    ServiceAccount(ServiceAccountKey),
    MetadataServer(MetadataServer),
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Option<Instant>,
}

impl CachedToken {
    fn from_response(response: TokenResponse) -> Self {
        let refresh_at = response
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(REFRESH_MARGIN));
        CachedToken {
            token: response.access_token,
            refresh_at,
        }
    }

    fn is_fresh(&self) -> bool {
        self.refresh_at.is_none_or(|at| Instant::now() < at)
    }
}

#[derive(Debug)]
pub struct GoogleCredentials {
    source: TokenSource,
    project_id: Option<String>,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleCredentials {
    pub fn new(source: TokenSource, project_id: Option<String>) -> Result<Self, ApiError> {
        let project_id = project_id.or_else(|| match &source {
            TokenSource::ServiceAccount(key) => key.project_id.clone(),
            _ => None,
        });

        Ok(GoogleCredentials {
            source,
            project_id,
            http: http_client()?,
            cached: Mutex::new(None),
        })
    }

    /// Resolve credentials: explicit, then `GOOGLE_APPLICATION_CREDENTIALS`,
    /// then the metadata server
    pub fn resolve(
        explicit: Option<CredentialsSource>,
        project_id: Option<String>,
        metadata_server: MetadataServer,
    ) -> Result<Self, ApiError> {
        let key = match explicit {
            Some(CredentialsSource::File(path)) => Some(ServiceAccountKey::from_file(path)?),
            Some(CredentialsSource::Json(value)) => Some(ServiceAccountKey::from_value(value)?),
            None => EnvConfigReader::read_gcp_credentials()
                .map(ServiceAccountKey::from_file)
                .transpose()?,
        };

        let source = match key {
            Some(key) => {
                log::debug!("Using service account {}", key.client_email);
                TokenSource::ServiceAccount(key)
            }
            None => {
                log::debug!("Using metadata server at {}", metadata_server.base_url());
                TokenSource::MetadataServer(metadata_server)
            }
        };

        Self::new(source, project_id)
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// A valid bearer token, refreshed when close to expiry
    pub async fn access_token(&self) -> Result<String, ApiError> {
        if let TokenSource::Static(token) = &self.source {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }

        let response = match &self.source {
            TokenSource::ServiceAccount(key) => self.exchange_assertion(key).await?,
            TokenSource::MetadataServer(server) => server.access_token().await?,
            TokenSource::Static(token) => TokenResponse {
                access_token: token.clone(),
                expires_in: None,
                token_type: None,
            },
        };

        let token = CachedToken::from_response(response);
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn exchange_assertion(&self, key: &ServiceAccountKey) -> Result<TokenResponse, ApiError> {
        let assertion = sign_assertion(key, chrono::Utc::now().timestamp())?;
        let endpoint = key.token_uri.as_str();

        let response = map_api_error!(
            self.http
                .post(endpoint)
                .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                .send()
                .await,
            endpoint
        )?;

        handle_response(response, endpoint).await
    }
}

/// RS256-signed JWT assertion for the OAuth2 token endpoint
pub fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, ApiError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| ApiError::Credentials {
            message: format!("Invalid private key for {}: {}", key.client_email, e),
        })?;

    encode(&header, &claims, &encoding_key).map_err(|e| ApiError::Credentials {
        message: format!("Unable to sign token request: {}", e),
    })
}
