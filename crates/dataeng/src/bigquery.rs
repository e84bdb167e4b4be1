//! BigQuery datasets, tables and load jobs over the v2 REST API

use reqwest::{Method, Url};
use std::time::{Duration, Instant};

use crate::api::client::GoogleApiClient;
use crate::api::models::{
    Dataset, DatasetReference, Job, JobConfiguration, JobConfigurationLoad, JobReference, Table,
    TableDefinition, TableFieldSchema, TableReference, TableSchema, TimePartitioning,
};
use crate::error::{ApiError, CliError};

pub const DEFAULT_BIGQUERY_URL: &str = "https://bigquery.googleapis.com";
pub const WRITE_TRUNCATE: &str = "WRITE_TRUNCATE";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Options of a load job from Cloud Storage
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Source format, e.g. `CSV`, `NEWLINE_DELIMITED_JSON` or `AVRO`
    pub format: String,
    pub gcs_location: String,
    pub dataset_id: String,
    pub table_id: String,
    pub project_id: Option<String>,
    pub write_disposition: String,
    pub schema: Option<Vec<TableFieldSchema>>,
    pub autodetect: bool,
    pub time_partitioning: Option<TimePartitioning>,
    pub skip_leading_rows: Option<u32>,
    /// Job location, e.g. `EU`
    pub location: Option<String>,
    pub use_avro_logical_types: bool,
}

impl LoadRequest {
    pub fn new(
        format: impl Into<String>,
        gcs_location: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            format: format.into(),
            gcs_location: gcs_location.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
            project_id: None,
            write_disposition: WRITE_TRUNCATE.to_string(),
            schema: None,
            autodetect: false,
            time_partitioning: None,
            skip_leading_rows: None,
            location: None,
            use_avro_logical_types: false,
        }
    }

    fn configuration(&self, project_id: &str) -> JobConfigurationLoad {
        JobConfigurationLoad {
            source_uris: vec![self.gcs_location.clone()],
            destination_table: TableReference {
                project_id: project_id.to_string(),
                dataset_id: self.dataset_id.clone(),
                table_id: self.table_id.clone(),
            },
            source_format: self.format.clone(),
            write_disposition: self.write_disposition.clone(),
            schema: self.schema.clone().map(|fields| TableSchema { fields }),
            autodetect: self.autodetect,
            time_partitioning: self.time_partitioning.clone(),
            skip_leading_rows: self.skip_leading_rows.filter(|rows| *rows > 0),
            use_avro_logical_types: self.use_avro_logical_types,
        }
    }
}

/// A finished load job
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub job_id: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct BigQueryService {
    client: GoogleApiClient,
    poll_interval: Duration,
}

impl BigQueryService {
    pub fn new(client: GoogleApiClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Explicit project, else the client project
    fn project<'a>(&'a self, project_id: Option<&'a str>) -> crate::Result<&'a str> {
        project_id
            .or_else(|| self.client.project_id())
            .ok_or_else(|| {
                CliError::MissingSetting {
                    setting: "gcp_project".to_string(),
                    hint: "Pass a project or set DATAENG_GCP_PROJECT".to_string(),
                }
                .into()
            })
    }

    fn url(&self, project_id: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut all = vec!["bigquery", "v2", "projects", project_id];
        all.extend_from_slice(segments);
        self.client.url(&all)
    }

    /// Create a dataset; `None` when it already exists
    pub async fn create_bq_dataset(
        &self,
        location: &str,
        dataset_id: &str,
        project_id: Option<&str>,
    ) -> crate::Result<Option<Dataset>> {
        let project_id = self.project(project_id)?;
        log::info!(
            "Creating dataset {}.{} in {}.",
            project_id,
            dataset_id,
            location
        );

        let dataset = Dataset {
            dataset_reference: DatasetReference {
                project_id: project_id.to_string(),
                dataset_id: dataset_id.to_string(),
            },
            location: Some(location.to_string()),
            id: None,
        };

        match self
            .client
            .send_json(Method::POST, &self.url(project_id, &["datasets"])?, &dataset)
            .await
        {
            Ok(created) => Ok(Some(created)),
            Err(e) if e.is_conflict() => {
                log::debug!("{}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a dataset; false when it does not exist
    pub async fn delete_bq_dataset(
        &self,
        dataset_id: &str,
        delete_contents: bool,
        project_id: Option<&str>,
    ) -> crate::Result<bool> {
        let project_id = self.project(project_id)?;
        log::info!("Deleting dataset {}.{}.", project_id, dataset_id);

        let mut url = self.url(project_id, &["datasets", dataset_id])?;
        if delete_contents {
            url.query_pairs_mut().append_pair("deleteContents", "true");
        }

        match self.client.delete(&url).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                log::debug!("{}", e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create a table from a schema definition. Partitioning from the
    /// definition is applied unless `ignore_partitioning` is set.
    pub async fn create_bq_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        definition: &TableDefinition,
        ignore_partitioning: bool,
        project_id: Option<&str>,
    ) -> crate::Result<Table> {
        let project_id = self.project(project_id)?;

        let table = Table {
            table_reference: TableReference {
                project_id: project_id.to_string(),
                dataset_id: dataset_id.to_string(),
                table_id: table_id.to_string(),
            },
            schema: Some(TableSchema {
                fields: definition.schema.clone(),
            }),
            time_partitioning: if ignore_partitioning {
                None
            } else {
                definition.time_partitioning.clone()
            },
            id: None,
        };

        log::info!("Creating {}.{}", dataset_id, table_id);
        let created = self
            .client
            .send_json(
                Method::POST,
                &self.url(project_id, &["datasets", dataset_id, "tables"])?,
                &table,
            )
            .await?;
        Ok(created)
    }

    /// Delete a table; false when it does not exist
    pub async fn delete_bq_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        project_id: Option<&str>,
    ) -> crate::Result<bool> {
        let project_id = self.project(project_id)?;
        log::info!("Deleting {}.{}.{}", project_id, dataset_id, table_id);

        let url = self.url(project_id, &["datasets", dataset_id, "tables", table_id])?;
        match self.client.delete(&url).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                log::error!("{}", e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run a load job and wait for it. `None` when the destination or the
    /// source does not exist.
    pub async fn load_gcs_to_bq(&self, request: &LoadRequest) -> crate::Result<Option<LoadOutcome>> {
        let project_id = self.project(request.project_id.as_deref())?;
        log::info!(
            "Loading {} into {}.{}.{} from {}",
            request.format,
            project_id,
            request.dataset_id,
            request.table_id,
            request.gcs_location
        );

        let start = Instant::now();
        let job_id = format!("dataeng_load_{}", uuid::Uuid::new_v4().simple());
        let job = Job {
            job_reference: Some(JobReference {
                project_id: project_id.to_string(),
                job_id: job_id.clone(),
                location: request.location.clone(),
            }),
            configuration: JobConfiguration {
                load: Some(request.configuration(project_id)),
            },
            status: None,
        };

        let submitted: Job = match self
            .client
            .send_json(Method::POST, &self.url(project_id, &["jobs"])?, &job)
            .await
        {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                log::warn!("{}", e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if !self
            .wait_for_job(project_id, &job_id, request.location.as_deref(), submitted)
            .await?
        {
            return Ok(None);
        }

        let elapsed = start.elapsed();
        log::info!("Loading data into BigQuery took {:?}", elapsed);
        Ok(Some(LoadOutcome { job_id, elapsed }))
    }

    /// Poll until the job is done. False when it finished with `notFound`.
    async fn wait_for_job(
        &self,
        project_id: &str,
        job_id: &str,
        location: Option<&str>,
        mut job: Job,
    ) -> crate::Result<bool> {
        loop {
            if let Some(status) = job.status.as_ref().filter(|s| s.is_done()) {
                return match &status.error_result {
                    Some(error) if error.reason.as_deref() == Some("notFound") => {
                        log::warn!(
                            "Job {} failed: {}",
                            job_id,
                            error.message.as_deref().unwrap_or("not found")
                        );
                        Ok(false)
                    }
                    Some(error) => Err(ApiError::JobFailed {
                        job_id: job_id.to_string(),
                        reason: error
                            .message
                            .clone()
                            .or_else(|| error.reason.clone())
                            .unwrap_or_else(|| "unknown error".to_string()),
                    }
                    .into()),
                    None => Ok(true),
                };
            }

            log::debug!("Waiting for job {}", job_id);
            tokio::time::sleep(self.poll_interval).await;

            let mut url = self.url(project_id, &["jobs", job_id])?;
            if let Some(location) = location {
                url.query_pairs_mut().append_pair("location", location);
            }
            job = self.client.get_json(&url).await?;
        }
    }
}
