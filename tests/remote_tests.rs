//! Remote sink tests against an in-memory logging client
//!
//! The remote writer drives its client on the provider worker thread, so sinks are
//! exercised from plain test threads; only direct client calls run under
//! `tokio_test::block_on`.

#![cfg(feature = "remote")]

use async_trait::async_trait;
use rust_sink_logging::core::RpcError;
use rust_sink_logging::prelude::*;
use rust_sink_logging::sinks::{ClientError, LabelProvider, RemoteLogEntry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Call {
    log_name: String,
    resource: String,
    entries: Vec<RemoteLogEntry>,
}

#[derive(Default)]
struct FakeClient {
    calls: parking_lot::Mutex<Vec<Call>>,
    latency: Option<Duration>,
}

impl FakeClient {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .flat_map(|call| call.entries.iter())
            .filter_map(|entry| entry.text().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl LoggingClient for FakeClient {
    async fn write_log_entries(
        &self,
        log_name: &str,
        resource: &MonitoredResource,
        _labels: Option<&HashMap<String, String>>,
        entries: Vec<RemoteLogEntry>,
    ) -> std::result::Result<(), ClientError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().push(Call {
            log_name: log_name.to_string(),
            resource: resource.kind.clone(),
            entries,
        });
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("write rejected")]
struct Rejected(#[source] RpcError);

struct RejectingClient;

#[async_trait]
impl LoggingClient for RejectingClient {
    async fn write_log_entries(
        &self,
        _: &str,
        _: &MonitoredResource,
        _: Option<&HashMap<String, String>>,
        _: Vec<RemoteLogEntry>,
    ) -> std::result::Result<(), ClientError> {
        Err(Box::new(Rejected(RpcError::new(8, "quota exceeded"))))
    }
}

fn env_label(
    _category: &str,
    _event_id: &EventId,
    level: LogLevel,
    _context: &WebContext,
    labels: &mut HashMap<String, String>,
) {
    labels.insert("env".into(), "test".into());
    labels.insert("level".into(), level.to_string());
}

#[test]
fn test_fake_client_records_calls() {
    let client = FakeClient::default();
    tokio_test::block_on(client.write_log_entries(
        "projects/p/logs/x",
        &MonitoredResource::global(),
        None,
        Vec::new(),
    ))
    .unwrap();
    assert_eq!(client.calls.lock()[0].log_name, "projects/p/logs/x");
}

#[test]
fn test_remote_sink_delivers_batches_in_order() {
    let client = Arc::new(FakeClient::default());
    let sink = RemoteSink::from_config(
        SinkConfig::new("proj", "api"),
        MonitoredResource::new("k8s_container").with_label("cluster", "east"),
        Arc::clone(&client) as Arc<dyn LoggingClient>,
        Vec::new(),
    )
    .expect("Failed to create remote sink");
    let provider = LoggerProvider::builder()
        .batch_size(10)
        .batch_window(Duration::from_millis(50))
        .build(sink);
    let logger = provider.create_logger("api");
    for i in 0..25 {
        logger.info(format!("request {}", i));
    }
    assert!(provider.dispose());

    let expected: Vec<String> = (0..25).map(|i| format!("request {}", i)).collect();
    assert_eq!(client.texts(), expected);

    let calls = client.calls.lock();
    assert!(calls.len() >= 3);
    for call in calls.iter() {
        assert_eq!(call.log_name, "projects/proj/logs/api");
        assert_eq!(call.resource, "k8s_container");
        assert!(call.entries.len() <= 10);
    }
    assert_eq!(provider.metrics().batches(), calls.len() as u64);
}

#[test]
fn test_client_timers_run_on_writer_runtime() {
    let client = Arc::new(FakeClient::with_latency(Duration::from_millis(5)));
    let sink = RemoteSink::from_config(
        SinkConfig::new("proj", "api"),
        MonitoredResource::global(),
        Arc::clone(&client) as Arc<dyn LoggingClient>,
        Vec::new(),
    )
    .unwrap();
    let provider = LoggerProvider::new(sink);
    provider.create_logger("slow").warn("delayed");
    assert!(provider.dispose());
    assert_eq!(client.texts(), vec!["delayed".to_string()]);
}

#[test]
fn test_rpc_failures_are_reported_not_propagated() {
    let sink = RemoteSink::from_config(
        SinkConfig::new("proj", "api"),
        MonitoredResource::global(),
        Arc::new(RejectingClient),
        Vec::new(),
    )
    .unwrap();
    let provider = LoggerProvider::new(sink);
    let logger = provider.create_logger("quota");
    logger.error("first");
    logger.error("second");
    assert!(provider.dispose());

    assert_eq!(provider.metrics().failed(), 0);
    assert_eq!(provider.metrics().delivered(), 2);
}

#[test]
fn test_labels_and_error_reports() {
    let client = Arc::new(FakeClient::default());
    let config = SinkConfig::new("proj", "api")
        .with_service_version("2.0")
        .with_category_handling(CategoryHandling::IncludeAsLabel);
    let providers: Vec<Arc<dyn LabelProvider>> = vec![Arc::new(env_label)];
    let sink = RemoteSink::from_config(
        config,
        MonitoredResource::global(),
        Arc::clone(&client) as Arc<dyn LoggingClient>,
        providers,
    )
    .unwrap();
    let provider = LoggerProvider::new(sink);
    let logger = provider.create_logger("payments");
    logger.log_error(
        LogLevel::Critical,
        "settlement failed",
        std::io::Error::new(std::io::ErrorKind::TimedOut, "bank timeout"),
    );
    assert!(provider.dispose());

    let calls = client.calls.lock();
    let entry = &calls[0].entries[0];
    assert_eq!(entry.labels["category"], "payments");
    assert_eq!(entry.labels["env"], "test");
    assert_eq!(entry.labels["level"], "CRITICAL");
    assert!(entry.text().is_none());

    let value = serde_json::to_value(entry).unwrap();
    let report = &value["jsonPayload"];
    assert_eq!(report["message"], "settlement failed\nbank timeout");
    assert_eq!(report["serviceContext"]["version"], "2.0");
    assert_eq!(value["severity"], "CRITICAL");
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = RemoteSink::from_config(
        SinkConfig::new("", "api"),
        MonitoredResource::global(),
        Arc::new(FakeClient::default()),
        Vec::new(),
    );
    assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
}
