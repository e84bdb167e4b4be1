use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dataeng-cli")]
#[command(about = "Command line front end for the dataeng data engineering utilities")]
#[command(version)]
#[command(after_help = "Examples:
  dataeng-cli naming dags-bucket --project my-project
  dataeng-cli naming prefix tradedata orders csv --year 2024 --month 1 --day 5
  dataeng-cli tag parse aws-1.1.0
  dataeng-cli gcs exists landing raw/orders.csv
  dataeng-cli s3 ls my-bucket exports/
  dataeng-cli bq load gs://landing/raw/*.csv staging orders --skip-leading-rows 1
  dataeng-cli metadata show landing tradedata orders

Environment Variables:
  DATAENG_GCP_PROJECT              Default GCP project
  GOOGLE_APPLICATION_CREDENTIALS   Service account key file
  DATAENG_AWS_REGION               AWS region for S3
  DATAENG_LOG_LEVEL                Log level (off, error, warn, info, debug, trace)")]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Profile name to use (default: 'default')
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Custom configuration directory path
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration management (show, set)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Bucket, prefix and dataset naming conventions
    Naming {
        #[command(subcommand)]
        command: NamingCommands,
    },
    /// Sub-library version tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Amazon S3 objects
    S3 {
        #[command(subcommand)]
        command: S3Commands,
    },
    /// Google Cloud Storage objects and buckets
    Gcs {
        #[command(subcommand)]
        command: GcsCommands,
    },
    /// BigQuery datasets, tables and load jobs
    Bq {
        #[command(subcommand)]
        command: BqCommands,
    },
    /// Pipeline metadata stored in Cloud Storage
    Metadata {
        #[command(subcommand)]
        command: MetadataCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set configuration values for the selected profile
    #[command(after_help = "Examples:
  dataeng-cli config set --gcp-project analytics-prod
  dataeng-cli config set --profile staging --aws-region eu-west-1 --default")]
    Set(ConfigSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConfigSetArgs {
    /// GCP project id
    #[arg(long)]
    pub gcp_project: Option<String>,
    /// Service account key file
    #[arg(long)]
    pub gcp_credentials: Option<String>,
    /// AWS region
    #[arg(long)]
    pub aws_region: Option<String>,
    /// AWS shared config profile
    #[arg(long)]
    pub aws_profile: Option<String>,
    /// Cloud Storage endpoint override
    #[arg(long)]
    pub storage_endpoint: Option<String>,
    /// BigQuery endpoint override
    #[arg(long)]
    pub bigquery_endpoint: Option<String>,
    /// Metadata server endpoint override
    #[arg(long)]
    pub metadata_endpoint: Option<String>,
    /// MySQL connection URL
    #[arg(long)]
    pub mysql_url: Option<String>,
    /// SQL Server ADO.NET connection string
    #[arg(long)]
    pub mssql_connection_string: Option<String>,
    /// Log level
    #[arg(long)]
    pub log_level: Option<String>,
    /// Make this profile the default one
    #[arg(long)]
    pub default: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Data source, e.g. tradedata
    pub data_source: String,
    /// Data source type, e.g. orders
    pub data_source_type: String,
}

#[derive(Subcommand, Debug)]
pub enum NamingCommands {
    /// Ingestion bucket of an organisation's business group
    IngestionBucket {
        org_name: String,
        group_name: String,
        /// GCP project id (defaults to the profile project)
        #[arg(long)]
        project: Option<String>,
    },
    /// Modeling bucket of a Dataflow repository
    ModelingBucket {
        org_name: String,
        group_name: String,
        repo_name: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Composer DAGs bucket
    DagsBucket {
        #[arg(long)]
        project: Option<String>,
    },
    /// Dataflow staging bucket
    DataflowBucket {
        #[arg(long)]
        project: Option<String>,
    },
    /// Test bucket
    TestBucket {
        #[arg(long)]
        project: Option<String>,
    },
    /// gs:// location of the DAGs folder in a DAGs bucket
    DagsLocation { dags_bucket_name: String },
    /// Object prefix of one pipeline run
    #[command(after_help = "Examples:
  dataeng-cli naming prefix tradedata orders csv --year 2024 --month 1 --day 5
  dataeng-cli naming prefix tradedata orders avro --location eu --hour 7")]
    Prefix(PrefixArgs),
    /// Unique BigQuery staging dataset id
    StagingDataset(SourceArgs),
    /// _SUCCESS file location of a data source
    SuccessFile(SourceArgs),
}

#[derive(Args, Debug)]
pub struct PrefixArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Data format, e.g. csv
    pub format: String,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub year: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub month: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub day: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub hour: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub minute: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub second: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Parse a lib_name-X.Y.N tag
    Parse { tag: String },
    /// Render the tag of a library release
    Render { library: String, version: String },
    /// Requirement range accepting compatible releases
    Requirement { library: String, version: String },
    /// List every released library
    List,
}

#[derive(Subcommand, Debug)]
pub enum S3Commands {
    /// Check whether an object exists
    Exists { bucket: String, key: String },
    /// List keys under a prefix
    Ls {
        bucket: String,
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Object size in bytes
    Size { bucket: String, key: String },
    /// Delete an object
    Rm { bucket: String, key: String },
    /// Delete every object under a prefix
    RmPrefix { bucket: String, prefix: String },
    /// Upload a local file
    CpUp {
        file: PathBuf,
        bucket: String,
        key: String,
    },
    /// Download an object to a local file
    CpDown {
        bucket: String,
        key: String,
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum GcsCommands {
    /// Check whether an object exists
    Exists { bucket: String, key: String },
    /// Delete an object
    Rm { bucket: String, key: String },
    /// Delete every object under a prefix
    RmPrefix { bucket: String, prefix: String },
    /// Upload a local file
    Upload {
        file: PathBuf,
        bucket: String,
        key: String,
    },
    /// Download an object to a local file
    Download {
        bucket: String,
        key: String,
        file: PathBuf,
    },
    /// Show bucket labels
    Labels { bucket: String },
    /// Add or replace a bucket label
    Label {
        bucket: String,
        key: String,
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BqCommands {
    /// Create a dataset
    CreateDataset {
        dataset: String,
        #[arg(long, default_value = "EU")]
        location: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Delete a dataset
    DeleteDataset {
        dataset: String,
        /// Delete the tables it contains as well
        #[arg(long)]
        delete_contents: bool,
        #[arg(long)]
        project: Option<String>,
    },
    /// Delete a table
    DeleteTable {
        dataset: String,
        table: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Load files from Cloud Storage into a table
    Load(LoadArgs),
}

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  dataeng-cli bq load gs://landing/raw/*.csv staging orders --skip-leading-rows 1
  dataeng-cli bq load gs://landing/raw/*.avro staging orders --format AVRO --use-avro-logical-types")]
pub struct LoadArgs {
    /// Source URI, wildcards allowed
    pub gcs_uri: String,
    pub dataset: String,
    pub table: String,
    /// Source format: CSV, NEWLINE_DELIMITED_JSON, AVRO, PARQUET
    #[arg(long, default_value = "CSV")]
    pub format: String,
    #[arg(long, default_value = "WRITE_TRUNCATE")]
    pub write_disposition: String,
    /// JSON file holding the table schema fields
    #[arg(long)]
    pub schema_file: Option<PathBuf>,
    #[arg(long)]
    pub autodetect: bool,
    #[arg(long)]
    pub skip_leading_rows: Option<u32>,
    /// Partition by day on this column
    #[arg(long)]
    pub partition_field: Option<String>,
    #[arg(long)]
    pub use_avro_logical_types: bool,
    /// Job location, e.g. EU
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum MetadataCommands {
    /// Print the metadata document of a data source
    Show {
        bucket: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write the _SUCCESS file of a data source
    MarkSuccess {
        bucket: String,
        #[command(flatten)]
        source: SourceArgs,
    },
}
