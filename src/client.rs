//! HTTP probe client and timing measurements

#[cfg(test)]
mod integration_tests;

use crate::{
    error::{AppError, Result},
    logging::ProbeLogger,
    models::{Config, ProbeSample},
    types::ProbeKind,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA},
    Client, Url,
};
use std::{
    future::Future,
    time::{Duration, Instant},
};
use tokio::time::timeout;

/// The three timed round-trips of a measurement run
///
/// Implementations report transport failures as errors; the pipeline turns
/// them into failed probe outcomes.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Time one request to the latency endpoint
    async fn latency(&self) -> Result<ProbeSample>;

    /// Time fetching the download payload, body included
    async fn download(&self) -> Result<ProbeSample>;

    /// Time posting the upload payload
    async fn upload(&self) -> Result<ProbeSample>;
}

/// Resolved probe endpoints and payload sizes
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeEndpoints {
    pub latency_url: Url,
    /// Already carries the `bytes` query pair
    pub download_url: Url,
    pub upload_url: Url,
    pub download_bytes: u64,
    pub upload_bytes: u64,
}

impl ProbeEndpoints {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            latency_url: Url::parse(&config.latency_url)?,
            download_url: config.download_url_with_size()?,
            upload_url: Url::parse(&config.upload_url)?,
            download_bytes: config.download_bytes,
            upload_bytes: config.upload_bytes,
        })
    }

    pub fn url_for(&self, kind: ProbeKind) -> &Url {
        match kind {
            ProbeKind::Latency => &self.latency_url,
            ProbeKind::Download => &self.download_url,
            ProbeKind::Upload => &self.upload_url,
        }
    }
}

/// reqwest-backed probe client
pub struct HttpProbeClient {
    client: Client,
    endpoints: ProbeEndpoints,
    probe_timeout: Duration,
    logger: ProbeLogger,
}

impl HttpProbeClient {
    /// Create a new probe client from configuration
    pub fn new(config: &Config, logger: ProbeLogger) -> Result<Self> {
        let endpoints = ProbeEndpoints::from_config(config)?;
        Self::with_endpoints(endpoints, config.timeout(), logger)
    }

    pub fn with_endpoints(endpoints: ProbeEndpoints, probe_timeout: Duration, logger: ProbeLogger) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(probe_timeout)
            .user_agent(crate::defaults::USER_AGENT)
            .default_headers(no_store_headers())
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoints,
            probe_timeout,
            logger,
        })
    }

    pub fn endpoints(&self) -> &ProbeEndpoints {
        &self.endpoints
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Time a full page fetch (headers and body) in milliseconds
    pub async fn measure_page_load(&self, url: &str) -> Result<f64> {
        let url = Url::parse(url)?;
        let start = Instant::now();

        let (status, _) = self
            .bounded("page load", async {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status().as_u16();
                let received = drain_body(response).await?;
                Ok::<_, AppError>((status, received))
            })
            .await?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.logger.log_http_request(url.as_str(), "GET", Some(status), elapsed_ms).await;
        Ok(elapsed_ms)
    }

    /// Apply the per-probe timeout to a whole request, body transfer included
    async fn bounded<T, F>(&self, what: &str, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        timeout(self.probe_timeout, request).await.map_err(|_| {
            AppError::timeout(format!(
                "{} request exceeded {:.1}s",
                what,
                self.probe_timeout.as_secs_f64()
            ))
        })?
    }

    async fn report<T>(&self, kind: ProbeKind, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            self.logger
                .log_probe_failure(kind, self.endpoints.url_for(kind).as_str(), error)
                .await;
        }
        result
    }

    async fn time_latency(&self) -> Result<ProbeSample> {
        let url = self.endpoints.latency_url.clone();
        let start = Instant::now();

        // Any HTTP status counts: the round-trip completed
        let response = self
            .bounded("latency", async {
                Ok::<_, AppError>(self.client.get(url.clone()).send().await?)
            })
            .await?;
        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        self.logger
            .log_http_request(url.as_str(), "GET", Some(status), elapsed.as_secs_f64() * 1000.0)
            .await;
        Ok(ProbeSample::new(elapsed, 0).with_status(status))
    }

    async fn time_download(&self) -> Result<ProbeSample> {
        let url = self.endpoints.download_url.clone();
        let expected = self.endpoints.download_bytes;
        let start = Instant::now();

        let (status, received) = self
            .bounded("download", async {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status().as_u16();
                let received = drain_body(response).await?;
                Ok::<_, AppError>((status, received))
            })
            .await?;
        let elapsed = start.elapsed();

        self.logger
            .log_http_request(url.as_str(), "GET", Some(status), elapsed.as_secs_f64() * 1000.0)
            .await;
        if received < expected {
            self.logger.log_short_body(url.as_str(), expected, received).await;
        }

        Ok(ProbeSample::new(elapsed, expected)
            .with_transferred(received)
            .with_status(status))
    }

    async fn time_upload(&self) -> Result<ProbeSample> {
        let url = self.endpoints.upload_url.clone();
        let size = self.endpoints.upload_bytes;
        let payload = vec![0u8; size as usize];
        let start = Instant::now();

        // Timing stops once the response head arrives; the body is not read
        let response = self
            .bounded("upload", async {
                Ok::<_, AppError>(self.client.post(url.clone()).body(payload).send().await?)
            })
            .await?;
        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        self.logger
            .log_http_request(url.as_str(), "POST", Some(status), elapsed.as_secs_f64() * 1000.0)
            .await;
        Ok(ProbeSample::new(elapsed, size).with_status(status))
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn latency(&self) -> Result<ProbeSample> {
        let result = self.time_latency().await;
        self.report(ProbeKind::Latency, result).await
    }

    async fn download(&self) -> Result<ProbeSample> {
        let result = self.time_download().await;
        self.report(ProbeKind::Download, result).await
    }

    async fn upload(&self) -> Result<ProbeSample> {
        let result = self.time_upload().await;
        self.report(ProbeKind::Upload, result).await
    }
}

/// Headers that keep caches out of the measurement
pub fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Read a response body to the end, returning the number of bytes seen
async fn drain_body(response: reqwest::Response) -> Result<u64> {
    let mut stream = response.bytes_stream();
    let mut received = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::http_request(format!("Failed to read response body: {}", e)))?;
        received += chunk.len() as u64;
    }

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_from_default_config() {
        let endpoints = ProbeEndpoints::from_config(&Config::default()).unwrap();

        assert_eq!(endpoints.latency_url.as_str(), crate::defaults::DEFAULT_LATENCY_URL);
        assert_eq!(
            endpoints.download_url.as_str(),
            "https://speed.cloudflare.com/__down?bytes=1000000"
        );
        assert_eq!(endpoints.upload_bytes, 500_000);
        assert_eq!(endpoints.url_for(ProbeKind::Upload), &endpoints.upload_url);
    }

    #[test]
    fn test_endpoints_reject_invalid_url() {
        let config = Config {
            latency_url: "not a url".to_string(),
            ..Config::default()
        };
        let result = ProbeEndpoints::from_config(&config);
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_no_store_headers() {
        let headers = no_store_headers();
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let config = Config {
            timeout_seconds: 3,
            ..Config::default()
        };
        let client = HttpProbeClient::new(&config, ProbeLogger::silent()).unwrap();
        assert_eq!(client.probe_timeout(), Duration::from_secs(3));
        assert_eq!(client.endpoints().download_bytes, 1_000_000);
    }

    #[tokio::test]
    async fn test_page_load_rejects_invalid_url() {
        let client = HttpProbeClient::new(&Config::default(), ProbeLogger::silent()).unwrap();
        assert!(client.measure_page_load("::nope::").await.is_err());
    }
}
