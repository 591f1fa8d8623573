//! Sequential measurement pipeline
//!
//! One run performs, strictly in order:
//! - connection metadata lookup (best effort)
//! - latency probe
//! - download probe
//! - upload probe
//! - scoring, followed by the cosmetic delivery delay
//!
//! A failing probe never stops the run. Its outcome is recorded as failed and
//! resolved through the sentinel policy when the result is scored. Progress is
//! published as [`StepEvent`]s on a channel whose receiver can be taken once.

use crate::{
    client::ProbeClient,
    connection::ConnectionInfoProvider,
    error::Result,
    logging::Logger,
    models::{Config, MeasurementResult, ProbeOutcome, ProbeSample},
    scoring::{latency_ms, throughput_mbps, SentinelPolicy},
    types::{ProbeKind, TestStep},
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// Tunables of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Pause between scoring and delivery
    pub result_delay: Duration,
    pub sentinel_policy: SentinelPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            result_delay: crate::defaults::DEFAULT_RESULT_DELAY,
            sentinel_policy: SentinelPolicy::default(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            result_delay: config.result_delay(),
            ..Self::default()
        }
    }
}

/// Progress notification for one pipeline step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub step: TestStep,
    pub status_text: &'static str,
    pub progress_percent: u8,
}

impl StepEvent {
    pub fn for_step(step: TestStep) -> Self {
        Self {
            step,
            status_text: step.status_text(),
            progress_percent: step.progress_percent(),
        }
    }
}

/// Receiving end of the step events; ends when the run finishes
#[derive(Debug)]
pub struct StepEvents {
    receiver: mpsc::UnboundedReceiver<StepEvent>,
}

impl StepEvents {
    /// Next event, or `None` once the run is over
    pub async fn next(&mut self) -> Option<StepEvent> {
        self.receiver.recv().await
    }

    /// Drain every remaining event
    pub async fn collect(mut self) -> Vec<StepEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Runs the three probes once and produces a [`MeasurementResult`]
pub struct MeasurementPipeline {
    client: Arc<dyn ProbeClient>,
    connection: Box<dyn ConnectionInfoProvider>,
    options: PipelineOptions,
    logger: Logger,
    events_tx: mpsc::UnboundedSender<StepEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<StepEvent>>,
}

impl MeasurementPipeline {
    pub fn new(
        client: Arc<dyn ProbeClient>,
        connection: Box<dyn ConnectionInfoProvider>,
        options: PipelineOptions,
        logger: Logger,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client,
            connection,
            options,
            logger,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Step events of this run; `None` after the first call
    pub fn take_events(&mut self) -> Option<StepEvents> {
        self.events_rx.take().map(|receiver| StepEvents { receiver })
    }

    /// Run the pipeline and hand the result to `on_complete`
    pub async fn run_then<F>(self, page_load_ms: f64, on_complete: F)
    where
        F: FnOnce(MeasurementResult),
    {
        on_complete(self.run(page_load_ms).await);
    }

    /// Run the pipeline to completion
    ///
    /// Consumes the pipeline, so a run can happen only once. Never fails.
    pub async fn run(self, page_load_ms: f64) -> MeasurementResult {
        let Self {
            client,
            connection,
            options,
            logger,
            events_tx,
            events_rx,
        } = self;
        // An untaken receiver has no reader
        drop(events_rx);

        let emit = |step: TestStep| {
            // A dropped receiver only means nobody is watching
            let _ = events_tx.send(StepEvent::for_step(step));
        };

        let operation = logger.start_operation("measurement").await;
        emit(TestStep::Starting);

        let (network_type, connection_type) = match connection.connection_info() {
            Some(info) => (info.network_type().to_string(), info.connection_type().to_string()),
            None => (String::new(), String::new()),
        };
        // Every later entry of this run carries the connection metadata
        logger
            .add_context_field("network_type".to_string(), &network_type)
            .await;
        logger
            .add_context_field("connection_type".to_string(), &connection_type)
            .await;
        logger.debug("Resolved connection metadata").log().await;

        emit(TestStep::Latency);
        let ping = settle(&logger, ProbeKind::Latency, client.latency().await, |sample| {
            latency_ms(sample.elapsed)
        })
        .await;

        emit(TestStep::Download);
        let download = settle(&logger, ProbeKind::Download, client.download().await, |sample| {
            throughput_mbps(sample.payload_bytes, sample.elapsed)
        })
        .await;

        emit(TestStep::Upload);
        let upload = settle(&logger, ProbeKind::Upload, client.upload().await, |sample| {
            throughput_mbps(sample.payload_bytes, sample.elapsed)
        })
        .await;

        emit(TestStep::Analyzing);
        let mut result = MeasurementResult::new(
            page_load_ms,
            ping,
            download,
            upload,
            network_type,
            connection_type,
            options.sentinel_policy,
        );
        if let Some(session_id) = logger.session_id().await {
            result = result.with_session_id(session_id);
        }

        logger
            .info(&format!(
                "Measurement scored {}/100 ({})",
                result.overall_score(),
                result.tier()
            ))
            .field("ping_latency_ms", result.ping_latency_ms())
            .field("download_mbps", result.download_mbps())
            .field("upload_mbps", result.upload_mbps())
            .field("score", result.score())
            .log()
            .await;

        emit(TestStep::Complete);
        drop(events_tx);

        if !options.result_delay.is_zero() {
            tokio::time::sleep(options.result_delay).await;
        }

        logger
            .end_operation(&operation, "measurement", result.failed_probes().is_empty())
            .await;
        result
    }
}

/// Turn a probe result into an outcome, logging what happened
async fn settle<F>(logger: &Logger, kind: ProbeKind, result: Result<ProbeSample>, metric: F) -> ProbeOutcome
where
    F: FnOnce(&ProbeSample) -> f64,
{
    match result {
        Ok(sample) => {
            let value = metric(&sample);
            logger
                .info(&format!("{} probe: {:.2} {}", kind, value, kind.unit()))
                .field("probe", kind)
                .sample(&sample)
                .log()
                .await;
            ProbeOutcome::measured(value)
        }
        Err(error) => {
            logger
                .warn(&format!("{} probe failed, using fallback value", kind))
                .field("probe", kind)
                .error_info(&error)
                .log()
                .await;
            ProbeOutcome::failed(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::{StaticConnectionInfo, Unavailable},
        error::AppError,
        types::NetworkTier,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Scripted probe client recording the order of calls
    struct ScriptedClient {
        latency: Option<Duration>,
        download: Option<Duration>,
        upload: Option<Duration>,
        calls: Mutex<Vec<ProbeKind>>,
    }

    impl ScriptedClient {
        fn healthy() -> Self {
            // 50 ms, 1 MB in 0.4 s = 20 Mbps, 500 KB in 0.8 s = 5 Mbps
            Self::new(
                Some(Duration::from_millis(50)),
                Some(Duration::from_millis(400)),
                Some(Duration::from_millis(800)),
            )
        }

        fn new(latency: Option<Duration>, download: Option<Duration>, upload: Option<Duration>) -> Self {
            Self {
                latency,
                download,
                upload,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(&self, kind: ProbeKind, elapsed: Option<Duration>, payload_bytes: u64) -> Result<ProbeSample> {
            self.calls.lock().unwrap().push(kind);
            elapsed
                .map(|elapsed| ProbeSample::new(elapsed, payload_bytes).with_status(200))
                .ok_or_else(|| AppError::network(format!("{} endpoint unreachable", kind)))
        }

        fn calls(&self) -> Vec<ProbeKind> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProbeClient for ScriptedClient {
        async fn latency(&self) -> Result<ProbeSample> {
            self.respond(ProbeKind::Latency, self.latency, 0)
        }

        async fn download(&self) -> Result<ProbeSample> {
            self.respond(ProbeKind::Download, self.download, 1_000_000)
        }

        async fn upload(&self) -> Result<ProbeSample> {
            self.respond(ProbeKind::Upload, self.upload, 500_000)
        }
    }

    fn no_delay() -> PipelineOptions {
        PipelineOptions {
            result_delay: Duration::ZERO,
            ..PipelineOptions::default()
        }
    }

    fn pipeline(client: Arc<ScriptedClient>) -> MeasurementPipeline {
        MeasurementPipeline::new(client, Box::new(Unavailable), no_delay(), Logger::silent("PIPELINE"))
    }

    #[tokio::test]
    async fn test_probes_run_in_order_and_score() {
        let client = Arc::new(ScriptedClient::healthy());
        let result = pipeline(client.clone()).run(1250.0).await;

        assert_eq!(client.calls(), vec![ProbeKind::Latency, ProbeKind::Download, ProbeKind::Upload]);
        assert_eq!(result.ping_latency_ms(), 50.0);
        assert_eq!(result.download_mbps(), 20.0);
        assert_eq!(result.upload_mbps(), 5.0);
        assert_eq!(result.overall_score(), 98);
        assert_eq!(result.tier(), NetworkTier::Strong);
        assert_eq!(result.page_load_time_ms(), 1250.0);
    }

    #[tokio::test]
    async fn test_single_failure_takes_sentinel() {
        let client = Arc::new(ScriptedClient::new(
            Some(Duration::from_millis(50)),
            None,
            Some(Duration::from_millis(800)),
        ));
        let result = pipeline(client.clone()).run(0.0).await;

        assert_eq!(client.calls().len(), 3);
        assert_eq!(result.ping_latency_ms(), 50.0);
        assert_eq!(result.download_mbps(), 0.1);
        assert_eq!(result.upload_mbps(), 5.0);
        assert_eq!(result.failed_probes(), vec![ProbeKind::Download]);
        assert!(result
            .outcome(ProbeKind::Download)
            .failure_reason()
            .unwrap()
            .contains("unreachable"));
    }

    #[tokio::test]
    async fn test_all_failures_score_one() {
        let client = Arc::new(ScriptedClient::new(None, None, None));
        let result = pipeline(client).run(0.0).await;

        assert_eq!(result.ping_latency_ms(), 999.0);
        assert_eq!(result.overall_score(), 1);
        assert_eq!(result.tier(), NetworkTier::Weak);
    }

    #[tokio::test]
    async fn test_custom_sentinel_policy_is_used() {
        let options = PipelineOptions {
            result_delay: Duration::ZERO,
            sentinel_policy: SentinelPolicy {
                latency_ms: 2000.0,
                download_mbps: 0.0,
                upload_mbps: 0.0,
            },
        };
        let client = Arc::new(ScriptedClient::new(None, None, None));
        let result = MeasurementPipeline::new(client, Box::new(Unavailable), options, Logger::silent("PIPELINE"))
            .run(0.0)
            .await;

        assert_eq!(result.ping_latency_ms(), 2000.0);
        assert_eq!(result.overall_score(), 0);
    }

    #[tokio::test]
    async fn test_step_events_sequence() {
        let mut pipeline = pipeline(Arc::new(ScriptedClient::healthy()));
        let events = pipeline.take_events().unwrap();

        let (result, events) = tokio::join!(pipeline.run(0.0), events.collect());

        let steps: Vec<TestStep> = events.iter().map(|e| e.step).collect();
        assert_eq!(
            steps,
            vec![
                TestStep::Starting,
                TestStep::Latency,
                TestStep::Download,
                TestStep::Upload,
                TestStep::Analyzing,
                TestStep::Complete,
            ]
        );
        let progress: Vec<u8> = events.iter().map(|e| e.progress_percent).collect();
        assert_eq!(progress, vec![0, 10, 30, 60, 90, 100]);
        assert_eq!(events[1].status_text, "Measuring response time...");
        assert_eq!(events[5].status_text, "Test completed!");
        assert_eq!(result.overall_score(), 98);
    }

    #[tokio::test]
    async fn test_events_can_be_taken_once() {
        let mut pipeline = pipeline(Arc::new(ScriptedClient::healthy()));
        assert!(pipeline.take_events().is_some());
        assert!(pipeline.take_events().is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_block() {
        let mut pipeline = pipeline(Arc::new(ScriptedClient::healthy()));
        drop(pipeline.take_events());

        let result = pipeline.run(0.0).await;
        assert_eq!(result.overall_score(), 98);
    }

    #[tokio::test]
    async fn test_connection_metadata() {
        let result = pipeline(Arc::new(ScriptedClient::healthy())).run(0.0).await;
        assert_eq!(result.network_type(), "");
        assert_eq!(result.connection_type(), "");

        let provider = StaticConnectionInfo::new(Some("4g".to_string()), None);
        let logger = Logger::silent("PIPELINE");
        let result = MeasurementPipeline::new(
            Arc::new(ScriptedClient::healthy()),
            Box::new(provider),
            no_delay(),
            logger.named("PIPELINE"),
        )
        .run(0.0)
        .await;
        assert_eq!(result.network_type(), "4g");
        assert_eq!(result.connection_type(), "unknown");

        // Later log entries of the run carry the metadata
        assert_eq!(logger.context_field("network_type").await, Some(serde_json::json!("4g")));
        assert_eq!(
            logger.context_field("connection_type").await,
            Some(serde_json::json!("unknown"))
        );
    }

    #[tokio::test]
    async fn test_run_then_delivers_once() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();

        pipeline(Arc::new(ScriptedClient::healthy()))
            .run_then(0.0, move |result| sink.lock().unwrap().push(result.overall_score()))
            .await;

        assert_eq!(*delivered.lock().unwrap(), vec![98]);
    }

    #[tokio::test]
    async fn test_result_delay_is_applied() {
        let options = PipelineOptions {
            result_delay: Duration::from_millis(50),
            ..PipelineOptions::default()
        };
        let pipeline = MeasurementPipeline::new(
            Arc::new(ScriptedClient::healthy()),
            Box::new(Unavailable),
            options,
            Logger::silent("PIPELINE"),
        );

        let start = Instant::now();
        pipeline.run(0.0).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_result_carries_logger_session() {
        let logger = Logger::silent("PIPELINE");
        logger.set_session_id("session-42".to_string()).await;

        let result = MeasurementPipeline::new(
            Arc::new(ScriptedClient::healthy()),
            Box::new(Unavailable),
            no_delay(),
            logger,
        )
        .run(0.0)
        .await;
        assert_eq!(result.session_id(), "session-42");
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            result_delay_ms: 0,
            ..Config::default()
        };
        let options = PipelineOptions::from_config(&config);
        assert_eq!(options.result_delay, Duration::ZERO);
        assert_eq!(options.sentinel_policy, SentinelPolicy::REFERENCE);
    }
}
