//! # dataeng
//!
//! Common utilities for data engineering pipelines: object storage on
//! Cloud Storage and S3, BigQuery loads, pipeline metadata, incremental
//! extraction from MySQL and SQL Server, and SFTP transfers.
//!
//! Each module maps to an independently released sub-library, see
//! [`release`] for the version tag convention.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dataeng::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> dataeng::Result<()> {
//!     let profile = Config::load(None)?.resolve_profile(None);
//!
//!     let credentials = GoogleCredentials::resolve(
//!         profile.gcp_credentials.map(|path| CredentialsSource::File(path.into())),
//!         profile.gcp_project,
//!         MetadataServer::new(DEFAULT_METADATA_URL)?,
//!     )?;
//!     let client = GoogleApiClient::new(gcs::DEFAULT_STORAGE_URL, Arc::new(credentials))?;
//!     let gcs = GcsService::new(client);
//!
//!     let bucket = get_ingestion_bucket_name("my-project", "acme", "sales");
//!     let exists = gcs.is_gcs_key_exists(&bucket, "orders/_SUCCESS").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`]: Google REST plumbing (auth, HTTP client, metadata server)
//! - [`storage`]: Cloud Storage and S3 services behind [`storage::ObjectStore`]
//! - [`aws`]: AWS session handling
//! - [`bigquery`]: datasets, tables and load jobs
//! - [`metadata`]: pipeline bookkeeping documents
//! - [`naming`]: bucket, prefix and dataset naming conventions
//! - [`db`]: incremental extraction from MySQL and SQL Server
//! - [`sftp`]: SFTP listing and transfers into object storage
//! - [`release`]: sub-library version tags
//! - [`config`]: multi-profile TOML configuration
//! - [`utils`]: logging, retry, threading and helpers
//! - [`error`]: hierarchical error system with troubleshooting hints

pub use error::AppError;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use dataeng::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Error handling
    pub use crate::Result;
    pub use crate::error::AppError;

    // Google APIs
    pub use crate::api::auth::{CredentialsSource, GoogleCredentials};
    pub use crate::api::metadata_server::{DEFAULT_METADATA_URL, MetadataServer};
    pub use crate::api::client::GoogleApiClient;
    pub use crate::bigquery::{BigQueryService, LoadRequest};
    pub use crate::storage::gcs::{self, GcsService};

    // AWS
    pub use crate::aws::{AwsSession, SessionParams};
    pub use crate::storage::s3::S3Service;

    // Pipelines
    pub use crate::config::Config;
    pub use crate::metadata::MetadataService;
    pub use crate::naming::*;
    pub use crate::storage::ObjectStore;
}

/// Google REST plumbing - credentials, HTTP client and metadata server.
pub mod api;

pub mod aws;

pub mod bigquery;

/// Multi-profile TOML configuration with environment fallbacks.
pub mod config;

pub mod db;

/// Error handling - hierarchical error system.
///
/// - Domain-specific error variants (API, storage, database, SFTP, ...)
/// - Severity levels (Critical, High, Medium, Low)
/// - Troubleshooting hints for common issues
pub mod error;

pub mod metadata;

pub mod naming;

pub mod release;

pub mod sftp;

/// Object storage - Cloud Storage, S3 and an in-memory store.
pub mod storage;

/// Utilities layer - shared helpers.
///
/// - [`utils::logging`]: process-wide logger setup
/// - [`utils::retry`]: retry with exponential or fixed backoff
/// - [`utils::threading`]: named background threads
/// - [`utils::data_type`]: value helpers
pub mod utils;

/// Convenient Result type alias using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
