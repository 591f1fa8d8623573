//! Probe client integration tests against a mock HTTP server

use super::*;
use crate::error::AppError;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Mock probe endpoints under fixed paths
pub struct MockProbeServer {
    server: MockServer,
}

impl MockProbeServer {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    pub fn url(&self, request_path: &str) -> String {
        format!("{}{}", self.server.uri(), request_path)
    }

    pub async fn mock_latency(&self, status_code: u16, delay_ms: Option<u64>) {
        let mut template = ResponseTemplate::new(status_code).set_body_string("fl=1\nip=127.0.0.1\n");
        if let Some(delay) = delay_ms {
            template = template.set_delay(Duration::from_millis(delay));
        }

        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_download(&self, requested_bytes: u64, served_bytes: usize) {
        Mock::given(method("GET"))
            .and(path("/down"))
            .and(query_param("bytes", requested_bytes.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; served_bytes]))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_upload(&self) {
        Mock::given(method("POST"))
            .and(path("/up"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&self.server)
            .await;
    }

    pub fn endpoints(&self, download_bytes: u64, upload_bytes: u64) -> ProbeEndpoints {
        let config = Config {
            latency_url: self.url("/ping"),
            download_url: self.url("/down"),
            upload_url: self.url("/up"),
            download_bytes,
            upload_bytes,
            ..Config::default()
        };
        ProbeEndpoints::from_config(&config).unwrap()
    }

    pub fn client(&self, probe_timeout: Duration) -> HttpProbeClient {
        HttpProbeClient::with_endpoints(self.endpoints(2048, 1024), probe_timeout, ProbeLogger::silent()).unwrap()
    }
}

mod probe_client_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_latency_counts_any_status_as_completed() {
        let server = MockProbeServer::new().await;
        server.mock_latency(404, None).await;

        let sample = server.client(Duration::from_secs(5)).latency().await.unwrap();
        assert_eq!(sample.status, Some(404));
        assert_eq!(sample.payload_bytes, 0);
    }

    #[tokio::test]
    async fn test_latency_includes_server_delay() {
        let server = MockProbeServer::new().await;
        server.mock_latency(200, Some(100)).await;

        let sample = server.client(Duration::from_secs(5)).latency().await.unwrap();
        assert!(sample.elapsed >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_requests_disable_caching() {
        let server = MockProbeServer::new().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("cache-control", "no-store"))
            .and(header("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server.server)
            .await;

        // Without both headers the mock server answers 404
        let sample = server.client(Duration::from_secs(5)).latency().await.unwrap();
        assert_eq!(sample.status, Some(204));
    }

    #[tokio::test]
    async fn test_download_requests_size_and_reads_body() {
        let server = MockProbeServer::new().await;
        server.mock_download(2048, 2048).await;

        let sample = server.client(Duration::from_secs(5)).download().await.unwrap();
        assert_eq!(sample.status, Some(200));
        assert_eq!(sample.payload_bytes, 2048);
        assert_eq!(sample.transferred_bytes, 2048);
    }

    #[tokio::test]
    async fn test_short_download_keeps_nominal_size() {
        let server = MockProbeServer::new().await;
        server.mock_download(2048, 10).await;

        let sample = server.client(Duration::from_secs(5)).download().await.unwrap();
        assert_eq!(sample.payload_bytes, 2048);
        assert_eq!(sample.transferred_bytes, 10);
    }

    #[tokio::test]
    async fn test_upload_posts_zero_filled_payload() {
        let server = MockProbeServer::new().await;
        server.mock_upload().await;

        let sample = server.client(Duration::from_secs(5)).upload().await.unwrap();
        assert_eq!(sample.status, Some(200));
        assert_eq!(sample.payload_bytes, 1024);

        let requests = server.server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.len(), 1024);
        assert!(requests[0].body.iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_probe_timeout_is_enforced() {
        let server = MockProbeServer::new().await;
        server.mock_latency(200, Some(2_000)).await;

        let result = server.client(Duration::from_millis(200)).latency().await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_an_error() {
        let config = Config {
            latency_url: "http://127.0.0.1:9/ping".to_string(),
            ..Config::default()
        };
        let client = HttpProbeClient::new(&config, ProbeLogger::silent()).unwrap();

        assert!(client.latency().await.is_err());
    }

    #[tokio::test]
    async fn test_page_load_measures_full_fetch() {
        let server = MockProbeServer::new().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server.server)
            .await;

        let client = server.client(Duration::from_secs(5));
        let elapsed_ms = client.measure_page_load(&server.url("/page")).await.unwrap();
        assert!(elapsed_ms >= 50.0);
    }
}
