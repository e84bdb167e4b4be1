use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CliError: {0}")]
    Cli(#[from] CliError),
    #[error("ApiError: {0}")]
    Api(#[from] ApiError),
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
    #[error("StorageError: {0}")]
    Storage(#[from] StorageError),
    #[error("AwsError: {0}")]
    Aws(#[from] AwsError),
    #[error("DatabaseError: {0}")]
    Database(#[from] DatabaseError),
    #[error("SftpError: {0}")]
    Sftp(#[from] SftpError),
    #[error("ReleaseError: {0}")]
    Release(#[from] ReleaseError),
    #[error("UtilsError: {0}")]
    Utils(#[from] UtilsError),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Missing setting '{setting}'")]
    MissingSetting { setting: String, hint: String },
}

/// Errors raised by the Google REST clients (Cloud Storage, BigQuery, metadata server).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64, endpoint: String },
    #[error("HTTP error: {status} {message}")]
    Http {
        status: u16,
        endpoint: String,
        message: String,
    },
    #[error("Authentication failed")]
    Unauthorized {
        status: u16,
        endpoint: String,
        server_message: String,
    },
    #[error("Credentials error: {message}")]
    Credentials { message: String },
    #[error("Job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Unauthorized { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File I/O error at {path}: {source}")]
    FileIo {
        path: String,
        source: std::io::Error,
    },
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
    #[error("Configuration directory not found")]
    ConfigDirNotFound,
    #[error("Invalid configuration value for '{field}': {value}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Object storage failures shared by the GCS and S3 services.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object storage request failed for {location}: {source}")]
    Api {
        location: String,
        #[source]
        source: ApiError,
    },
    #[error("S3 request failed for {location}: {message}")]
    S3 {
        location: String,
        status: Option<u16>,
        message: String,
    },
    #[error("Local file error at {path}: {source}")]
    LocalIo {
        path: String,
        source: std::io::Error,
    },
    #[error("Metadata document {location} is invalid: {message}")]
    InvalidMetadata { location: String, message: String },
}

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("No AWS region configured")]
    NoRegion,
    #[error("Invalid session parameters: {0}")]
    InvalidParams(String),
    #[error("Unable to resolve AWS credentials: {0}")]
    Credentials(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unable to connect after {attempts} attempts: {message}")]
    Connection { attempts: u32, message: String },
    #[error("Query on {table} failed: {message}")]
    Query { table: String, message: String },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

#[derive(Error, Debug)]
pub enum SftpError {
    #[error("Invalid key representation - {0}")]
    InvalidKeyRepresentation(String),
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("{files} files but {keys} destination keys")]
    LengthMismatch { files: usize, keys: usize },
}

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Tag '{0}' is not of the form lib_name-X.Y.N")]
    MalformedTag(String),
    #[error("Unknown library '{0}'")]
    UnknownLibrary(String),
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),
}

#[derive(Error, Debug)]
pub enum UtilsError {
    #[error("Validation error: {message}")]
    Validation { message: String },
    #[error("Thread error: {message}")]
    Thread { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ErrorSeverity {
    pub fn emoji(&self) -> &'static str {
        match self {
            ErrorSeverity::Critical => "🚨",
            ErrorSeverity::High => "❌",
            ErrorSeverity::Medium => "⚠️",
            ErrorSeverity::Low => "ℹ️",
        }
    }
}

impl AppError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Cli(_) => ErrorSeverity::Medium,
            AppError::Api(api_error) => match api_error {
                ApiError::Unauthorized { .. } | ApiError::Credentials { .. } => {
                    ErrorSeverity::High
                }
                ApiError::Timeout { .. } => ErrorSeverity::Medium,
                ApiError::Http { status, .. } if *status >= 500 => ErrorSeverity::High,
                _ => ErrorSeverity::Medium,
            },
            AppError::Config(_) => ErrorSeverity::High,
            AppError::Storage(_) => ErrorSeverity::Medium,
            AppError::Aws(AwsError::Credentials(_)) => ErrorSeverity::High,
            AppError::Aws(_) => ErrorSeverity::Medium,
            AppError::Database(DatabaseError::Connection { .. }) => ErrorSeverity::Critical,
            AppError::Database(_) => ErrorSeverity::Medium,
            AppError::Sftp(_) => ErrorSeverity::Medium,
            AppError::Release(_) => ErrorSeverity::Low,
            AppError::Utils(_) => ErrorSeverity::Low,
        }
    }

    pub fn troubleshooting_hint(&self) -> Option<String> {
        match self {
            AppError::Cli(CliError::MissingSetting { hint, .. }) => Some(hint.clone()),
            AppError::Api(ApiError::Unauthorized { .. } | ApiError::Credentials { .. }) => Some(
                "Set GOOGLE_APPLICATION_CREDENTIALS or 'dataeng-cli config set --gcp-credentials <file>'"
                    .to_string(),
            ),
            AppError::Api(ApiError::Timeout { .. }) => {
                Some("Check your network connection and try again".to_string())
            }
            AppError::Aws(AwsError::NoRegion) => Some(
                "Set DATAENG_AWS_REGION or 'dataeng-cli config set --aws-region <region>'"
                    .to_string(),
            ),
            AppError::Release(ReleaseError::MalformedTag(_)) => {
                Some("Tags look like 'aws-1.1.0'".to_string())
            }
            _ => None,
        }
    }
}
