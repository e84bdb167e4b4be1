use crate::cli::display::TableDisplay;
use crate::cli::main_types::{
    BqCommands, ConfigCommands, ConfigSetArgs, GcsCommands, LoadArgs, MetadataCommands,
    NamingCommands, S3Commands, TagCommands,
};
use dataeng::api::models::{TableFieldSchema, TimePartitioning};
use dataeng::bigquery::{BigQueryService, LoadRequest};
use dataeng::config::{Config, Profile};
use dataeng::error::{AppError, CliError};
use dataeng::metadata::MetadataService;
use dataeng::naming::{
    PrefixParts, get_dags_bucket_name, get_dags_location, get_dataflow_bucket_name,
    get_ingestion_bucket_name, get_modeling_bucket_name, get_prefix, get_staging_dataset_id,
    get_success_file_location, get_test_bucket_name,
};
use dataeng::release::{Library, Version, VersionTag};
use dataeng::storage::{GcsService, S3Service, UploadSource};
use dataeng::utils::logging::{parse_level, print_verbose};
use dataeng::utils::validation::{parse_gcs_uri, validate_url};
use serde_json::json;
use std::path::Path;

fn project_or_default(project: Option<String>, default: Option<&str>) -> Result<String, AppError> {
    project
        .or_else(|| default.map(str::to_string))
        .ok_or_else(|| {
            CliError::MissingSetting {
                setting: "gcp_project".to_string(),
                hint: "Pass --project, run 'dataeng-cli config set --gcp-project <id>' or set DATAENG_GCP_PROJECT".to_string(),
            }
            .into()
        })
}

fn outcome(done: bool, success: &str, failure: &str) {
    if done {
        println!("✅ {}", success);
    } else {
        println!("❌ {}", failure);
    }
}

#[derive(Default)]
pub struct ConfigHandler;

impl ConfigHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(
        &self,
        command: ConfigCommands,
        mut config: Config,
        profile: Option<&str>,
        config_dir: Option<&Path>,
        verbose: bool,
    ) -> Result<(), AppError> {
        match command {
            ConfigCommands::Show => {
                print_verbose(verbose, "Attempting config show command");

                let display = TableDisplay::new();
                println!(
                    "Config file: {}",
                    Config::config_file_path(config_dir)?.display()
                );
                println!("Default Profile: {}", config.profile_name(None));

                if config.profiles.is_empty() {
                    println!("\nNo profiles configured");
                    return Ok(());
                }

                let mut names: Vec<&String> = config.profiles.keys().collect();
                names.sort();
                for name in names {
                    let Some(settings) = config.get_profile(name) else {
                        continue;
                    };
                    println!("\n[{}]", name);
                    println!("{}", display.render_key_values(&profile_rows(settings)));
                }
                Ok(())
            }
            ConfigCommands::Set(args) => {
                let name = config.profile_name(profile).to_string();
                print_verbose(
                    verbose,
                    &format!("Attempting config set for profile '{}': {:?}", name, args),
                );

                if let Some(level) = &args.log_level {
                    parse_level(level)?;
                }
                for endpoint in [
                    &args.storage_endpoint,
                    &args.bigquery_endpoint,
                    &args.metadata_endpoint,
                ]
                .into_iter()
                .flatten()
                {
                    validate_url(endpoint)?;
                }

                let make_default = args.default;
                let update = profile_update(args);
                if update == Profile::default() && !make_default {
                    return Err(AppError::Cli(CliError::InvalidArguments(
                        "No configuration values provided. See 'dataeng-cli config set --help'"
                            .to_string(),
                    )));
                }

                let mut settings = config.get_profile(&name).cloned().unwrap_or_default();
                settings.merge(update);
                config.set_profile(name.clone(), settings);
                if make_default {
                    config.default_profile = Some(name.clone());
                }

                let path = config.save(config_dir)?;
                println!("✅ Set profile '{}'", name);
                println!("Configuration saved to {}", path.display());
                Ok(())
            }
        }
    }
}

fn profile_update(args: ConfigSetArgs) -> Profile {
    Profile {
        gcp_project: args.gcp_project,
        gcp_credentials: args.gcp_credentials,
        aws_region: args.aws_region,
        aws_profile: args.aws_profile,
        storage_endpoint: args.storage_endpoint,
        bigquery_endpoint: args.bigquery_endpoint,
        metadata_endpoint: args.metadata_endpoint,
        mysql_url: args.mysql_url,
        mssql_connection_string: args.mssql_connection_string,
        log_level: args.log_level,
    }
}

fn profile_rows(profile: &Profile) -> Vec<(&'static str, serde_json::Value)> {
    let masked = |value: &Option<String>| value.as_ref().map(|_| "********");
    vec![
        ("gcp_project", json!(profile.gcp_project)),
        ("gcp_credentials", json!(profile.gcp_credentials)),
        ("aws_region", json!(profile.aws_region)),
        ("aws_profile", json!(profile.aws_profile)),
        ("storage_endpoint", json!(profile.storage_endpoint)),
        ("bigquery_endpoint", json!(profile.bigquery_endpoint)),
        ("metadata_endpoint", json!(profile.metadata_endpoint)),
        ("mysql_url", json!(masked(&profile.mysql_url))),
        (
            "mssql_connection_string",
            json!(masked(&profile.mssql_connection_string)),
        ),
        ("log_level", json!(profile.log_level)),
    ]
}

#[derive(Default)]
pub struct NamingHandler;

impl NamingHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(
        &self,
        command: NamingCommands,
        default_project: Option<&str>,
        verbose: bool,
    ) -> Result<(), AppError> {
        print_verbose(verbose, &format!("Naming command: {:?}", command));

        let name = match command {
            NamingCommands::IngestionBucket {
                org_name,
                group_name,
                project,
            } => get_ingestion_bucket_name(
                &project_or_default(project, default_project)?,
                &org_name,
                &group_name,
            ),
            NamingCommands::ModelingBucket {
                org_name,
                group_name,
                repo_name,
                project,
            } => get_modeling_bucket_name(
                &project_or_default(project, default_project)?,
                &org_name,
                &group_name,
                &repo_name,
            ),
            NamingCommands::DagsBucket { project } => {
                get_dags_bucket_name(&project_or_default(project, default_project)?)
            }
            NamingCommands::DataflowBucket { project } => {
                get_dataflow_bucket_name(&project_or_default(project, default_project)?)
            }
            NamingCommands::TestBucket { project } => {
                get_test_bucket_name(&project_or_default(project, default_project)?)
            }
            NamingCommands::DagsLocation { dags_bucket_name } => {
                get_dags_location(&dags_bucket_name)
            }
            NamingCommands::Prefix(args) => {
                let parts = PrefixParts {
                    location: args.location.as_deref(),
                    year: args.year.as_deref(),
                    month: args.month.as_deref(),
                    day: args.day.as_deref(),
                    hour: args.hour.as_deref(),
                    minute: args.minute.as_deref(),
                    second: args.second.as_deref(),
                };
                get_prefix(
                    &args.source.data_source,
                    &args.source.data_source_type,
                    &args.format,
                    parts,
                )
            }
            NamingCommands::StagingDataset(source) => {
                get_staging_dataset_id(&source.data_source, &source.data_source_type)
            }
            NamingCommands::SuccessFile(source) => {
                get_success_file_location(&source.data_source, &source.data_source_type)
            }
        };

        println!("{}", name);
        Ok(())
    }
}

#[derive(Default)]
pub struct TagHandler;

impl TagHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, command: TagCommands, verbose: bool) -> Result<(), AppError> {
        print_verbose(verbose, &format!("Tag command: {:?}", command));

        match command {
            TagCommands::Parse { tag } => {
                let tag: VersionTag = tag.parse()?;
                let display = TableDisplay::new();
                println!(
                    "{}",
                    display.render_key_values(&[
                        ("library", json!(tag.library.tag_name())),
                        ("version", json!(tag.version.to_string())),
                        ("package", json!(tag.library.package_name())),
                        (
                            "requirement",
                            json!(tag.library.requirement_spec(&tag.version))
                        ),
                    ])
                );
            }
            TagCommands::Render { library, version } => {
                let tag = VersionTag::new(library.parse()?, version.parse()?);
                println!("{}", tag);
            }
            TagCommands::Requirement { library, version } => {
                let library: Library = library.parse()?;
                let version: Version = version.parse()?;
                println!("{}", library.requirement_spec(&version));
            }
            TagCommands::List => {
                let rows: Vec<Vec<String>> = Library::ALL
                    .iter()
                    .map(|library| {
                        let dependencies: Vec<&str> = library
                            .dependencies()
                            .iter()
                            .map(Library::tag_name)
                            .collect();
                        vec![
                            library.tag_name().to_string(),
                            library.package_name(),
                            dependencies.join(", "),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    TableDisplay::new()
                        .render_simple_table(&["Library", "Package", "Depends on"], &rows)
                );
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct S3Handler;

impl S3Handler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(
        &self,
        command: S3Commands,
        s3: &S3Service,
        verbose: bool,
    ) -> Result<(), AppError> {
        print_verbose(verbose, &format!("S3 command: {:?}", command));

        match command {
            S3Commands::Exists { bucket, key } => {
                let exists = s3.is_s3_key_exists(&bucket, &key).await?;
                println!("{}", exists);
            }
            S3Commands::Ls { bucket, prefix } => match s3.list_s3_keys(&bucket, &prefix).await? {
                Some(keys) => {
                    for key in keys {
                        println!("{}", key);
                    }
                }
                None => println!("❌ s3://{} is forbidden or does not exist", bucket),
            },
            S3Commands::Size { bucket, key } => match s3.get_s3_object_size(&bucket, &key).await? {
                Some(size) => println!("{}", size),
                None => println!("❌ s3://{}/{} does not exist", bucket, key),
            },
            S3Commands::Rm { bucket, key } => {
                s3.delete_s3_object(&bucket, &key).await?;
                println!("✅ Deleted s3://{}/{}", bucket, key);
            }
            S3Commands::RmPrefix { bucket, prefix } => {
                let deleted = s3.delete_s3_prefix(&bucket, &prefix).await?;
                println!("✅ Deleted {} objects under s3://{}/{}", deleted, bucket, prefix);
            }
            S3Commands::CpUp { file, bucket, key } => {
                s3.upload_s3_object(UploadSource::from(file.as_path()), &bucket, &key)
                    .await?;
                println!("✅ Uploaded {} to s3://{}/{}", file.display(), bucket, key);
            }
            S3Commands::CpDown { bucket, key, file } => {
                let done = s3.download_s3_object(&bucket, &key, &file).await?;
                outcome(
                    done,
                    &format!("Downloaded s3://{}/{} to {}", bucket, key, file.display()),
                    &format!("s3://{}/{} is forbidden or does not exist", bucket, key),
                );
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct GcsHandler;

impl GcsHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(
        &self,
        command: GcsCommands,
        gcs: &GcsService,
        verbose: bool,
    ) -> Result<(), AppError> {
        print_verbose(verbose, &format!("GCS command: {:?}", command));

        match command {
            GcsCommands::Exists { bucket, key } => {
                println!("{}", gcs.is_gcs_key_exists(&bucket, &key).await?);
            }
            GcsCommands::Rm { bucket, key } => {
                gcs.delete_gcs_object(&bucket, &key).await?;
                println!("✅ Deleted gs://{}/{}", bucket, key);
            }
            GcsCommands::RmPrefix { bucket, prefix } => {
                let deleted = gcs.delete_gcs_prefix(&bucket, &prefix).await?;
                println!("✅ Deleted {} objects under gs://{}/{}", deleted, bucket, prefix);
            }
            GcsCommands::Upload { file, bucket, key } => {
                let done = gcs
                    .upload_object_to_gcs(UploadSource::from(file.as_path()), &bucket, &key)
                    .await?;
                outcome(
                    done,
                    &format!("Uploaded {} to gs://{}/{}", file.display(), bucket, key),
                    &format!("gs://{} does not exist", bucket),
                );
            }
            GcsCommands::Download { bucket, key, file } => {
                let done = gcs.download_object_from_gcs(&bucket, &key, &file).await?;
                outcome(
                    done,
                    &format!("Downloaded gs://{}/{} to {}", bucket, key, file.display()),
                    &format!("gs://{}/{} does not exist", bucket, key),
                );
            }
            GcsCommands::Labels { bucket } => match gcs.get_bucket_labels(&bucket).await? {
                Some(labels) => {
                    let mut rows: Vec<Vec<String>> =
                        labels.into_iter().map(|(k, v)| vec![k, v]).collect();
                    rows.sort();
                    println!(
                        "{}",
                        TableDisplay::new().render_simple_table(&["Label", "Value"], &rows)
                    );
                }
                None => println!("❌ gs://{} is forbidden or does not exist", bucket),
            },
            GcsCommands::Label { bucket, key, value } => {
                let done = gcs.add_bucket_label(&bucket, &key, &value).await?;
                outcome(
                    done,
                    &format!("Label {}={} set on gs://{}", key, value, bucket),
                    &format!("gs://{} is forbidden or does not exist", bucket),
                );
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct BqHandler;

impl BqHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(
        &self,
        command: BqCommands,
        bigquery: &BigQueryService,
        verbose: bool,
    ) -> Result<(), AppError> {
        print_verbose(verbose, &format!("BigQuery command: {:?}", command));

        match command {
            BqCommands::CreateDataset {
                dataset,
                location,
                project,
            } => {
                let created = bigquery
                    .create_bq_dataset(&location, &dataset, project.as_deref())
                    .await?;
                match created {
                    Some(created) => println!(
                        "✅ Created dataset {}.{}",
                        created.dataset_reference.project_id, created.dataset_reference.dataset_id
                    ),
                    None => println!("Dataset {} already exists", dataset),
                }
            }
            BqCommands::DeleteDataset {
                dataset,
                delete_contents,
                project,
            } => {
                let done = bigquery
                    .delete_bq_dataset(&dataset, delete_contents, project.as_deref())
                    .await?;
                outcome(
                    done,
                    &format!("Deleted dataset {}", dataset),
                    &format!("Dataset {} does not exist", dataset),
                );
            }
            BqCommands::DeleteTable {
                dataset,
                table,
                project,
            } => {
                let done = bigquery
                    .delete_bq_table(&dataset, &table, project.as_deref())
                    .await?;
                outcome(
                    done,
                    &format!("Deleted table {}.{}", dataset, table),
                    &format!("Table {}.{} does not exist", dataset, table),
                );
            }
            BqCommands::Load(args) => {
                let request = load_request(args)?;
                match bigquery.load_gcs_to_bq(&request).await? {
                    Some(done) => println!(
                        "✅ Load job {} finished in {:.1}s",
                        done.job_id,
                        done.elapsed.as_secs_f64()
                    ),
                    None => println!(
                        "❌ {} or {}.{} does not exist",
                        request.gcs_location, request.dataset_id, request.table_id
                    ),
                }
            }
        }
        Ok(())
    }
}

fn load_request(args: LoadArgs) -> Result<LoadRequest, AppError> {
    parse_gcs_uri(&args.gcs_uri)?;
    let mut request = LoadRequest::new(args.format, args.gcs_uri, args.dataset, args.table);
    request.project_id = args.project;
    request.write_disposition = args.write_disposition;
    request.autodetect = args.autodetect;
    request.skip_leading_rows = args.skip_leading_rows;
    request.location = args.location;
    request.use_avro_logical_types = args.use_avro_logical_types;
    request.time_partitioning = args
        .partition_field
        .map(|field| TimePartitioning::day(Some(field)));

    if let Some(path) = args.schema_file {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CliError::InvalidArguments(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let fields: Vec<TableFieldSchema> = serde_json::from_str(&content).map_err(|e| {
            CliError::InvalidArguments(format!("Invalid schema in {}: {}", path.display(), e))
        })?;
        request.schema = Some(fields);
    }

    Ok(request)
}

#[derive(Default)]
pub struct MetadataHandler;

impl MetadataHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(
        &self,
        command: MetadataCommands,
        service: MetadataService,
        verbose: bool,
    ) -> Result<(), AppError> {
        print_verbose(
            verbose,
            &format!("Metadata command on {}: {:?}", service.bucket(), command),
        );

        match command {
            MetadataCommands::Show { source, .. } => {
                match service
                    .get_metadata(&source.data_source, &source.data_source_type)
                    .await?
                {
                    Some(metadata) => {
                        let json = metadata.to_json().map_err(|e| {
                            CliError::InvalidArguments(format!("Cannot render metadata: {}", e))
                        })?;
                        println!("{}", json);
                    }
                    None => println!(
                        "No metadata for {}/{}",
                        source.data_source, source.data_source_type
                    ),
                }
            }
            MetadataCommands::MarkSuccess { source, .. } => {
                let location =
                    get_success_file_location(&source.data_source, &source.data_source_type);
                let content = service.mark_success(&location).await?;
                println!(
                    "✅ Marked gs://{}/{} at {}",
                    service.bucket(),
                    location,
                    content
                );
            }
        }
        Ok(())
    }
}
