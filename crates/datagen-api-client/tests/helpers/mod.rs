use std::time::Duration;

use datagen_api_client::ApiClient;
use datagen_core::{DirectoryDownloader, Workflow, WorkflowConfig};
use mockito::{Matcher, Mock, ServerGuard};
use tempfile::TempDir;

/// A workflow wired to a mock generation service and a scratch download dir.
pub struct TestApp {
    pub server: ServerGuard,
    pub workflow: Workflow<ApiClient, DirectoryDownloader>,
    pub download_dir: TempDir,
}

/// Setup a workflow against a fresh mock server
pub async fn setup_test_app() -> TestApp {
    let server = mockito::Server::new_async().await;
    let download_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let client = ApiClient::new(server.url(), None, Duration::from_secs(5))
        .expect("Failed to create API client");
    let workflow = Workflow::new(
        client,
        DirectoryDownloader::new(download_dir.path()),
        WorkflowConfig {
            stage_timeout: Duration::from_secs(5),
            ..WorkflowConfig::default()
        },
    );

    TestApp {
        server,
        workflow,
        download_dir,
    }
}

/// Mock a successful generate call.
pub async fn mock_generate_ok(
    server: &mut ServerGuard,
    message: &str,
    output_file: &str,
    expected_calls: usize,
) -> Mock {
    server
        .mock("POST", "/generate-csv")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({ "message": message, "output_file": output_file }).to_string(),
        )
        .expect(expected_calls)
        .create_async()
        .await
}

/// Mock a download of `filename` answering `status` with `body`.
pub async fn mock_download(
    server: &mut ServerGuard,
    filename: &str,
    status: usize,
    body: &str,
    expected_calls: usize,
) -> Mock {
    server
        .mock("GET", "/download_csv/")
        .match_query(Matcher::UrlEncoded(
            "filename".to_string(),
            filename.to_string(),
        ))
        .with_status(status)
        .with_header("content-type", "text/csv; charset=utf-8")
        .with_body(body)
        .expect(expected_calls)
        .create_async()
        .await
}
