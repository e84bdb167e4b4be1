//! AWS sessions
//!
//! A session wraps a resolved [`SdkConfig`]. Without parameters the default
//! provider chain is used (environment, shared profile, instance role).

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use serde::{Deserialize, Serialize};

use crate::error::AwsError;

const PROVIDER_NAME: &str = "dataeng";

/// Explicit session settings, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    pub region: Option<String>,
    pub profile_name: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl SessionParams {
    /// Static keys, if both halves are present
    pub fn static_credentials(&self) -> Result<Option<Credentials>, AwsError> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key), Some(secret_key)) => Ok(Some(Credentials::new(
                access_key,
                secret_key,
                self.session_token.clone(),
                None,
                PROVIDER_NAME,
            ))),
            (None, None) => {
                if self.session_token.is_some() {
                    return Err(AwsError::InvalidParams(
                        "session_token requires access_key_id and secret_access_key".to_string(),
                    ));
                }
                Ok(None)
            }
            _ => Err(AwsError::InvalidParams(
                "access_key_id and secret_access_key must be given together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AwsSession {
    config: SdkConfig,
}

impl AwsSession {
    pub async fn connect(params: Option<SessionParams>) -> crate::Result<Self> {
        let Some(params) = params else {
            log::debug!("Getting AWS session using IAM role.");
            let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
            return Ok(Self { config });
        };

        log::debug!("Getting AWS session with parameters.");
        let credentials = params.static_credentials()?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &params.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &params.profile_name {
            loader = loader.profile_name(profile);
        }
        if let Some(credentials) = credentials {
            loader = loader.credentials_provider(credentials);
        }

        Ok(Self {
            config: loader.load().await,
        })
    }

    pub fn from_config(config: SdkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    /// Resolve the session credentials into `(access_key_id, secret_access_key)`
    pub async fn keys(&self) -> crate::Result<(String, String)> {
        log::debug!("Getting AWS keys.");
        let provider = self
            .config
            .credentials_provider()
            .ok_or_else(|| AwsError::Credentials("No credentials provider configured".to_string()))?;

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| AwsError::Credentials(e.to_string()))?;

        Ok((
            credentials.access_key_id().to_string(),
            credentials.secret_access_key().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials_require_both_keys() {
        let params = SessionParams {
            access_key_id: Some("AKIA".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            params.static_credentials(),
            Err(AwsError::InvalidParams(_))
        ));

        let params = SessionParams {
            session_token: Some("token".to_string()),
            ..Default::default()
        };
        assert!(params.static_credentials().is_err());

        assert!(SessionParams::default().static_credentials().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_from_static_credentials() {
        let session = AwsSession::connect(Some(SessionParams {
            region: Some("eu-west-1".to_string()),
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        }))
        .await
        .unwrap();

        assert_eq!(session.region(), Some("eu-west-1"));
        let (access_key, secret_key) = session.keys().await.unwrap();
        assert_eq!(access_key, "AKIAEXAMPLE");
        assert_eq!(secret_key, "secret");
    }

    #[tokio::test]
    async fn test_connect_rejects_half_keys() {
        let result = AwsSession::connect(Some(SessionParams {
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        }))
        .await;
        assert!(matches!(
            result,
            Err(crate::AppError::Aws(AwsError::InvalidParams(_)))
        ));
    }
}
