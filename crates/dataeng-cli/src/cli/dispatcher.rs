use crate::cli::command_handlers::{
    BqHandler, ConfigHandler, GcsHandler, MetadataHandler, NamingHandler, S3Handler, TagHandler,
};
use crate::cli::main_types::{Commands, MetadataCommands};
use dataeng::api::auth::{CredentialsSource, GoogleCredentials};
use dataeng::api::client::GoogleApiClient;
use dataeng::api::metadata_server::{DEFAULT_METADATA_URL, MetadataServer};
use dataeng::aws::{AwsSession, SessionParams};
use dataeng::bigquery::{BigQueryService, DEFAULT_BIGQUERY_URL};
use dataeng::config::{Config, Profile};
use dataeng::error::AppError;
use dataeng::metadata::MetadataService;
use dataeng::storage::gcs::DEFAULT_STORAGE_URL;
use dataeng::storage::{GcsService, ObjectStore, S3Service};
use dataeng::utils::logging::print_verbose;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Dispatcher {
    config: Config,
    profile_name: Option<String>,
    config_dir: Option<PathBuf>,
    verbose: bool,
}

impl Dispatcher {
    fn log_verbose(&self, msg: &str) {
        print_verbose(self.verbose, msg);
    }

    pub fn new(
        config: Config,
        profile_name: Option<String>,
        config_dir: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            config,
            profile_name,
            config_dir,
            verbose,
        }
    }

    fn profile(&self) -> Profile {
        self.config.resolve_profile(self.profile_name.as_deref())
    }

    // Service account file from the profile, else environment, else metadata server
    fn create_credentials(&self, profile: &Profile) -> Result<Arc<GoogleCredentials>, AppError> {
        let metadata_url = profile
            .metadata_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_METADATA_URL);
        let explicit = profile
            .gcp_credentials
            .as_ref()
            .map(|path| CredentialsSource::File(PathBuf::from(path)));

        let credentials = GoogleCredentials::resolve(
            explicit,
            profile.gcp_project.clone(),
            MetadataServer::new(metadata_url)?,
        )?;
        Ok(Arc::new(credentials))
    }

    fn create_gcs(&self) -> Result<GcsService, AppError> {
        let profile = self.profile();
        let base_url = profile
            .storage_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_URL);
        self.log_verbose(&format!("Creating Cloud Storage client for {}", base_url));

        let client = GoogleApiClient::new(base_url, self.create_credentials(&profile)?)?;
        Ok(GcsService::new(client))
    }

    fn create_bigquery(&self) -> Result<BigQueryService, AppError> {
        let profile = self.profile();
        let base_url = profile
            .bigquery_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_BIGQUERY_URL);
        self.log_verbose(&format!("Creating BigQuery client for {}", base_url));

        let client = GoogleApiClient::new(base_url, self.create_credentials(&profile)?)?;
        Ok(BigQueryService::new(client))
    }

    async fn create_s3(&self) -> Result<S3Service, AppError> {
        let profile = self.profile();
        let params = if profile.aws_region.is_some() || profile.aws_profile.is_some() {
            self.log_verbose("Creating S3 client from profile settings");
            Some(SessionParams {
                region: profile.aws_region,
                profile_name: profile.aws_profile,
                ..Default::default()
            })
        } else {
            self.log_verbose("Creating S3 client from the default provider chain");
            None
        };

        let session = AwsSession::connect(params).await?;
        S3Service::new(&session)
    }

    pub async fn dispatch(&self, command: Commands) -> Result<(), AppError> {
        match command {
            Commands::Config { command } => ConfigHandler::new().handle(
                command,
                self.config.clone(),
                self.profile_name.as_deref(),
                self.config_dir.as_deref(),
                self.verbose,
            ),
            Commands::Naming { command } => {
                let profile = self.profile();
                NamingHandler::new().handle(command, profile.gcp_project.as_deref(), self.verbose)
            }
            Commands::Tag { command } => TagHandler::new().handle(command, self.verbose),
            Commands::S3 { command } => {
                let s3 = self.create_s3().await?;
                S3Handler::new().handle(command, &s3, self.verbose).await
            }
            Commands::Gcs { command } => {
                let gcs = self.create_gcs()?;
                GcsHandler::new().handle(command, &gcs, self.verbose).await
            }
            Commands::Bq { command } => {
                let bigquery = self.create_bigquery()?;
                BqHandler::new()
                    .handle(command, &bigquery, self.verbose)
                    .await
            }
            Commands::Metadata { command } => {
                let bucket = match &command {
                    MetadataCommands::Show { bucket, .. }
                    | MetadataCommands::MarkSuccess { bucket, .. } => bucket.clone(),
                };
                let store: Arc<dyn ObjectStore> = Arc::new(self.create_gcs()?);
                MetadataHandler::new()
                    .handle(command, MetadataService::new(store, bucket), self.verbose)
                    .await
            }
        }
    }
}
