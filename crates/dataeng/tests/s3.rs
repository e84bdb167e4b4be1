use aws_credential_types::Credentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use dataeng::AppError;
use dataeng::error::StorageError;
use dataeng::storage::S3Service;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUCKET_PATH: &str = r"^/landing/?$";

fn s3(server: &MockServer) -> S3Service {
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("eu-west-1"))
        .credentials_provider(Credentials::new("AKID", "SECRET", None, None, "test"))
        .endpoint_url(server.uri())
        .force_path_style(true)
        .retry_config(RetryConfig::disabled())
        .build();
    S3Service::from_client(aws_sdk_s3::Client::from_conf(config))
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/xml")
        .set_body_string(body)
}

fn list_page(keys: &[String], next_token: Option<&str>) -> ResponseTemplate {
    let contents: String = keys
        .iter()
        .map(|key| format!("<Contents><Key>{}</Key><Size>3</Size></Contents>", key))
        .collect();
    let continuation = next_token
        .map(|token| format!("<NextContinuationToken>{}</NextContinuationToken>", token))
        .unwrap_or_default();

    xml(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>landing</Name><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>{}</IsTruncated>{}{}</ListBucketResult>"#,
        keys.len(),
        next_token.is_some(),
        continuation,
        contents
    ))
}

fn s3_error(status: u16, code: &str) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("content-type", "application/xml")
        .set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>{}</Code><Message>{}</Message><RequestId>req</RequestId></Error>"#,
            code, code
        ))
}

fn keys(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{}/{:04}.csv", prefix, i)).collect()
}

async fn mount_two_pages(server: &MockServer, first: Vec<String>, second: Vec<String>) {
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .and(query_param("continuation-token", "page-2"))
        .respond_with(list_page(&second, None))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(list_page(&first, Some("page-2")))
        .with_priority(2)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_keys_follows_continuation() {
    let server = MockServer::start().await;
    mount_two_pages(
        &server,
        vec!["raw/".to_string(), "raw/a.csv".to_string()],
        vec!["raw/b.csv".to_string()],
    )
    .await;

    let listed = s3(&server).list_s3_keys("landing", "/raw").await.unwrap();
    assert_eq!(
        listed,
        Some(vec!["raw/a.csv".to_string(), "raw/b.csv".to_string()])
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0]
        .url
        .query_pairs()
        .any(|(name, value)| name == "prefix" && value == "raw/"));
}

#[tokio::test]
async fn test_list_keys_in_missing_bucket_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(s3_error(404, "NoSuchBucket"))
        .mount(&server)
        .await;

    assert_eq!(s3(&server).list_s3_keys("landing", "raw").await.unwrap(), None);
}

#[tokio::test]
async fn test_key_exists_matches_exact_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .and(query_param("prefix", "raw/a"))
        .respond_with(list_page(&["raw/a.csv".to_string()], None))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .and(query_param("prefix", "raw/a.csv"))
        .respond_with(list_page(&["raw/a.csv".to_string()], None))
        .mount(&server)
        .await;

    let service = s3(&server);
    assert!(service.is_s3_key_exists("landing", "raw/a.csv").await.unwrap());
    assert!(!service.is_s3_key_exists("landing", "raw/a").await.unwrap());
}

#[tokio::test]
async fn test_key_in_forbidden_bucket_does_not_exist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(s3_error(403, "AccessDenied"))
        .mount(&server)
        .await;

    assert!(!s3(&server).is_s3_key_exists("landing", "raw/a.csv").await.unwrap());
}

#[tokio::test]
async fn test_download_missing_object_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/landing/missing.csv"))
        .respond_with(s3_error(404, "NoSuchKey"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing.csv");

    let service = s3(&server);
    assert!(!service
        .download_s3_object("landing", "missing.csv", &target)
        .await
        .unwrap());
    assert!(!target.exists());
    assert_eq!(
        service.get_s3_object_size("landing", "missing.csv").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_delete_prefix_sends_batches_of_1000() {
    let server = MockServer::start().await;
    mount_two_pages(&server, keys("raw", 0..1000), keys("raw", 1000..1001)).await;
    Mock::given(method("POST"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"></DeleteResult>"#
                .to_string(),
        ))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/landing/raw"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let deleted = s3(&server).delete_s3_prefix("landing", "raw").await.unwrap();
    assert_eq!(deleted, 1001);

    let batches: Vec<usize> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.method.as_str() == "POST")
        .map(|request| String::from_utf8_lossy(&request.body).matches("<Key>").count())
        .collect();
    assert_eq!(batches, vec![1000, 1]);
}

#[tokio::test]
async fn test_delete_prefix_reports_refused_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(list_page(&keys("raw", 0..2), None))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Error><Key>raw/0001.csv</Key><Code>AccessDenied</Code><Message>Access Denied</Message></Error></DeleteResult>"#
                .to_string(),
        ))
        .mount(&server)
        .await;

    match s3(&server).delete_s3_prefix("landing", "raw").await {
        Err(AppError::Storage(StorageError::S3 { message, .. })) => {
            assert!(message.contains("1 of 2 keys"));
            assert!(message.contains("raw/0001.csv"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_prefix_in_missing_bucket_deletes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(BUCKET_PATH))
        .respond_with(s3_error(404, "NoSuchBucket"))
        .mount(&server)
        .await;

    assert_eq!(s3(&server).delete_s3_prefix("landing", "raw").await.unwrap(), 0);
}
