//! HTTP-level tests for the aptly client against a mock server

use aptpub_client::{
    AptlyApi, AptlyClient, ClientConfig, ClientError, CreateSnapshotRequest, Credentials,
    PackageQuery,
};
use aptpub_core::{PackageRef, PublicationId};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> AptlyClient {
    AptlyClient::new(&ClientConfig::new(server.uri()).unwrap()).unwrap()
}

#[tokio::test]
async fn test_connect_reads_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Version": "1.5.0"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = AptlyClient::connect(&ClientConfig::new(server.uri()).unwrap())
        .await
        .unwrap();
    assert_eq!(client.version().await.unwrap(), "1.5.0");
}

#[tokio::test]
async fn test_remote_error_maps_status_and_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/snapshots/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "snapshot not found"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_snapshot("missing").await.unwrap_err();
    match &err {
        ClientError::Remote {
            status,
            reason,
            method,
            path,
        } => {
            assert_eq!(*status, 404);
            assert_eq!(reason, "snapshot not found");
            assert_eq!(method, "GET");
            assert_eq!(path, "/snapshots/missing");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_non_json_body_is_returned_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/graph"))
        .respond_with(ResponseTemplate::new(200).set_body_string("digraph aptly {}"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let value = client.get("/graph", &[]).await.unwrap();
    assert_eq!(value, json!("digraph aptly {}"));
}

#[tokio::test]
async fn test_dry_run_skips_mutations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/snapshots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).unwrap().with_dry_run(true);
    let client = AptlyClient::new(&config).unwrap();
    assert!(client.is_dry_run());

    let request = CreateSnapshotRequest {
        name: "main-1".to_string(),
        description: String::new(),
        source_snapshots: Vec::new(),
        package_refs: Vec::new(),
    };
    client.create_snapshot(&request).await.unwrap();
    assert!(client.list_snapshots().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_basic_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/publish"))
        .and(header("authorization", "Basic dXNlcjpzZWNyZXQ="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .unwrap()
        .with_credentials(Credentials::basic("user", "secret"));
    let client = AptlyClient::new(&config).unwrap();
    assert!(client.list_publishes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_packages_sends_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/snapshots/main-1/packages"))
        .and(query_param("q", "Name (= nginx) | Name (= curl)"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["Pamd64 nginx 1.24.0-1 6f2c"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let query = PackageQuery::names(["nginx", "curl"]);
    let refs = client
        .snapshot_packages("main-1", Some(&query))
        .await
        .unwrap();
    assert_eq!(refs, vec![PackageRef::parse("Pamd64 nginx 1.24.0-1 6f2c").unwrap()]);
}

#[tokio::test]
async fn test_list_snapshots_sorted_by_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/snapshots"))
        .and(query_param("sort", "time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Name": "main-1", "CreatedAt": "2024-01-01T00:00:00Z", "Description": "first"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let snapshots = client.list_snapshots().await.unwrap();
    assert_eq!(snapshots[0].name, "main-1");
    assert_eq!(snapshots[0].description, "first");
}

#[tokio::test]
async fn test_drop_publish_uses_escaped_prefix_and_force() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/publish/s3:mirror:ubuntu_xenial__extra/nightly"))
        .and(query_param("force", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let id = PublicationId::parse("s3:mirror:ubuntu/xenial_extra/nightly", "").unwrap();
    client.drop_publish(&id, true).await.unwrap();
}

#[tokio::test]
async fn test_delete_repo_packages_sends_refs() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/repos/main/packages"))
        .and(body_json(json!({"PackageRefs": ["Pamd64 foo 1.0 abc"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let refs = vec![PackageRef::parse("Pamd64 foo 1.0 abc").unwrap()];
    client.delete_repo_packages("main", &refs).await.unwrap();
}
