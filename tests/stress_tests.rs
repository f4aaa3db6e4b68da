//! Stress tests for the provider worker
//!
//! These tests verify:
//! - No message is lost when many threads log concurrently
//! - Per-thread ordering survives interleaving
//! - Bulk sinks keep batches within the configured cap under load
//! - Shutdown while producers are still running stays consistent

use rust_sink_logging::prelude::*;
use rust_sink_logging::sinks::{
    BulkPayloadWriter, GenericBulkSink, PayloadFactory, PayloadWriter,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const PER_THREAD: usize = 2_000;

struct Collect(Arc<parking_lot::Mutex<Vec<String>>>);

impl Sink for Collect {
    fn log(&self, message: &LogMessage) -> rust_sink_logging::Result<()> {
        self.0.lock().push(message.message().to_string());
        Ok(())
    }

    fn dispose(&self) -> rust_sink_logging::Result<()> {
        Ok(())
    }
}

fn parse(line: &str) -> (usize, usize) {
    let (thread, seq) = line.split_once(':').expect("thread:seq");
    (thread.parse().unwrap(), seq.parse().unwrap())
}

#[test]
fn test_concurrent_loggers_lose_nothing() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let provider = Arc::new(LoggerProvider::new(Collect(Arc::clone(&seen))));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = provider.create_logger(format!("worker-{}", t));
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(format!("{}:{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(provider.shutdown(Duration::from_secs(30)));

    let seen = seen.lock();
    assert_eq!(seen.len(), THREADS * PER_THREAD);

    let mut last: HashMap<usize, usize> = HashMap::new();
    for line in seen.iter() {
        let (t, i) = parse(line);
        if let Some(previous) = last.insert(t, i) {
            assert!(previous < i, "thread {} out of order: {} after {}", t, i, previous);
        }
    }
    assert_eq!(provider.metrics().delivered(), (THREADS * PER_THREAD) as u64);
    assert_eq!(provider.metrics().dropped(), 0);
}

#[derive(Debug)]
struct Plain;

impl PayloadFactory for Plain {
    type Payload = String;

    fn create_payload(&self, message: &LogMessage) -> String {
        message.message().to_string()
    }
}

#[derive(Clone, Default)]
struct BatchStats {
    batches: Arc<AtomicUsize>,
    items: Arc<AtomicUsize>,
    largest: Arc<AtomicUsize>,
}

impl PayloadWriter<String> for BatchStats {
    fn write_payload(&self, payload: String) -> rust_sink_logging::Result<()> {
        self.write_payloads(vec![payload])
    }

    fn dispose(&self) -> rust_sink_logging::Result<()> {
        Ok(())
    }
}

impl BulkPayloadWriter<String> for BatchStats {
    fn write_payloads(&self, payloads: Vec<String>) -> rust_sink_logging::Result<()> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.items.fetch_add(payloads.len(), Ordering::SeqCst);
        self.largest.fetch_max(payloads.len(), Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_bulk_batches_stay_within_cap_under_load() {
    let stats = BatchStats::default();
    let provider = Arc::new(
        LoggerProvider::builder()
            .batch_size(64)
            .batch_window(Duration::from_millis(5))
            .build(GenericBulkSink::new(Plain, stats.clone())),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = provider.create_logger("bulk");
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.debug(format!("{}:{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(provider.shutdown(Duration::from_secs(30)));

    assert_eq!(stats.items.load(Ordering::SeqCst), THREADS * PER_THREAD);
    assert!(stats.largest.load(Ordering::SeqCst) <= 64);
    assert_eq!(
        provider.metrics().batches(),
        stats.batches.load(Ordering::SeqCst) as u64
    );
}

#[test]
fn test_shutdown_during_logging_accounts_for_every_message() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let provider = Arc::new(LoggerProvider::new(Collect(Arc::clone(&seen))));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = provider.create_logger("racing");
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.warn(format!("{}:{}", t, i));
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    provider.shutdown(Duration::from_secs(30));
    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = provider.metrics();
    let attempted = (THREADS * PER_THREAD) as u64;
    assert_eq!(metrics.pushed() + metrics.dropped(), attempted);
    assert_eq!(seen.lock().len() as u64, metrics.delivered());
    assert!(metrics.delivered() <= metrics.pushed());
}
