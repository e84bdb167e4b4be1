use dataeng::AppError;
use dataeng::api::auth::{GoogleCredentials, TokenSource};
use dataeng::api::client::GoogleApiClient;
use dataeng::api::models::{TableDefinition, TableFieldSchema, TimePartitioning};
use dataeng::bigquery::{BigQueryService, LoadRequest};
use dataeng::error::ApiError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bigquery(server: &MockServer) -> BigQueryService {
    let credentials = GoogleCredentials::new(
        TokenSource::Static("test-token".to_string()),
        Some("analytics".to_string()),
    )
    .unwrap();
    let client = GoogleApiClient::new(&server.uri(), Arc::new(credentials)).unwrap();
    BigQueryService::new(client).with_poll_interval(Duration::from_millis(5))
}

fn job_body(state: &str, error: Option<serde_json::Value>) -> serde_json::Value {
    let mut status = json!({ "state": state });
    if let Some(error) = error {
        status["errorResult"] = error;
    }
    json!({
        "jobReference": {"projectId": "analytics", "jobId": "job"},
        "configuration": {},
        "status": status
    })
}

#[tokio::test]
async fn test_create_dataset_conflict_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/analytics/datasets"))
        .and(body_partial_json(json!({
            "datasetReference": {"projectId": "analytics", "datasetId": "staging"},
            "location": "EU"
        })))
        .respond_with(ResponseTemplate::new(409).set_body_string("Already Exists"))
        .mount(&server)
        .await;

    let service = bigquery(&server);
    let created = service
        .create_bq_dataset("EU", "staging", None)
        .await
        .unwrap();
    assert!(created.is_none());
}

#[tokio::test]
async fn test_delete_dataset_with_contents() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/bigquery/v2/projects/other/datasets/staging"))
        .and(query_param("deleteContents", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/bigquery/v2/projects/analytics/datasets/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = bigquery(&server);
    assert!(service
        .delete_bq_dataset("staging", true, Some("other"))
        .await
        .unwrap());
    assert!(!service
        .delete_bq_dataset("missing", false, None)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_create_table_ignores_partitioning_on_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/analytics/datasets/staging/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tableReference": {"projectId": "analytics", "datasetId": "staging", "tableId": "events"}
        })))
        .mount(&server)
        .await;

    let definition = TableDefinition {
        schema: vec![TableFieldSchema {
            name: "event_date".to_string(),
            field_type: "DATE".to_string(),
            mode: None,
            description: None,
            fields: None,
        }],
        time_partitioning: Some(TimePartitioning::day(Some("event_date".to_string()))),
    };

    let service = bigquery(&server);
    let table = service
        .create_bq_table("staging", "events", &definition, true, None)
        .await
        .unwrap();
    assert_eq!(table.table_reference.table_id, "events");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("timePartitioning").is_none());
    assert_eq!(body["schema"]["fields"][0]["type"], "DATE");
}

#[tokio::test]
async fn test_load_waits_until_done() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/analytics/jobs"))
        .and(body_partial_json(json!({
            "configuration": {"load": {
                "sourceUris": ["gs://landing/raw/*.csv"],
                "sourceFormat": "CSV",
                "writeDisposition": "WRITE_TRUNCATE",
                "skipLeadingRows": 1
            }}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("RUNNING", None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/bigquery/v2/projects/analytics/jobs/dataeng_load_[0-9a-f]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("DONE", None)))
        .mount(&server)
        .await;

    let mut request = LoadRequest::new("CSV", "gs://landing/raw/*.csv", "staging", "events");
    request.skip_leading_rows = Some(1);

    let outcome = bigquery(&server)
        .load_gcs_to_bq(&request)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.job_id.starts_with("dataeng_load_"));
}

#[tokio::test]
async fn test_load_failure_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/analytics/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body(
            "DONE",
            Some(json!({"reason": "invalid", "message": "Bad CSV row"})),
        )))
        .mount(&server)
        .await;

    let request = LoadRequest::new("CSV", "gs://landing/raw/*.csv", "staging", "events");
    let result = bigquery(&server).load_gcs_to_bq(&request).await;

    match result {
        Err(AppError::Api(ApiError::JobFailed { reason, .. })) => assert_eq!(reason, "Bad CSV row"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_load_into_missing_dataset_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/analytics/jobs"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found: Dataset"))
        .mount(&server)
        .await;

    let request = LoadRequest::new("AVRO", "gs://landing/raw/*.avro", "missing", "events");
    assert!(bigquery(&server).load_gcs_to_bq(&request).await.unwrap().is_none());
}

#[tokio::test]
async fn test_load_from_missing_source_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/analytics/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body(
            "DONE",
            Some(json!({
                "reason": "notFound",
                "message": "Not found: URI gs://landing/missing/*.csv"
            })),
        )))
        .mount(&server)
        .await;

    let request = LoadRequest::new("CSV", "gs://landing/missing/*.csv", "staging", "events");
    assert!(bigquery(&server).load_gcs_to_bq(&request).await.unwrap().is_none());
}
