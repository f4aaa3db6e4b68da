//! Criterion benchmarks for rust_sink_logging

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_sink_logging::core::FixSizePool;
use rust_sink_logging::outputs::ByteSequenceOutput;
use rust_sink_logging::payload::LogEntry;
use rust_sink_logging::prelude::*;
use rust_sink_logging::sinks::{FluentdPayloadFactory, PayloadFactory, TextPayload};
use std::sync::Arc;
use std::time::Duration;

struct NullSink;

impl Sink for NullSink {
    fn log(&self, message: &LogMessage) -> rust_sink_logging::Result<()> {
        black_box(message.message().len());
        Ok(())
    }

    fn dispose(&self) -> rust_sink_logging::Result<()> {
        Ok(())
    }
}

struct NullOutput;

impl ByteSequenceOutput for NullOutput {
    fn write(&self, data: &[u8]) -> rust_sink_logging::Result<()> {
        black_box(data.len());
        Ok(())
    }

    fn dispose(&self) -> rust_sink_logging::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("logging");
    group.throughput(Throughput::Elements(1));

    let provider = LoggerProvider::new(NullSink);
    let logger = provider.create_logger("bench");

    group.bench_function("info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("formatted_macro", |b| {
        b.iter(|| rust_sink_logging::info!(logger, "request {} took {}ms", black_box(42), 7));
    });

    group.finish();
    provider.shutdown(Duration::from_secs(10));
}

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let provider = LoggerProvider::builder()
        .min_level(LogLevel::Error)
        .build(NullSink);
    let logger = provider.create_logger("bench");

    group.bench_function("filtered_debug", |b| {
        b.iter(|| rust_sink_logging::debug!(logger, "filtered {}", black_box(1)));
    });

    group.finish();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");
    group.throughput(Throughput::Elements(4 * 250));

    let provider = Arc::new(LoggerProvider::new(NullSink));

    group.bench_function("4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let logger = provider.create_logger(format!("thread-{}", t));
                    std::thread::spawn(move || {
                        for i in 0..250 {
                            logger.info(format!("message {}", i));
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join();
            }
        });
    });

    group.finish();
}

// ============================================================================
// Payload Benchmarks
// ============================================================================

fn bench_payloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("payloads");
    group.throughput(Throughput::Elements(1));

    let message = LogMessage::new(
        "orders",
        LogLevel::Warning,
        EventId::new(17),
        None,
        "inventory below threshold for sku 4411",
    );

    group.bench_function("text_render_into", |b| {
        let mut buffer = String::new();
        b.iter(|| {
            TextPayload::for_message(
                black_box(&message),
                None,
                EventIdHandling::IncludeValidIds,
                CategoryHandling::IncludeInMessage,
            )
            .render_into(&mut buffer);
            black_box(buffer.len())
        });
    });

    let formatted = FormattedSink::with_output(Box::new(NullOutput));
    group.bench_function("formatted_line", |b| {
        b.iter(|| formatted.log(black_box(&message)));
    });

    let factory = FluentdPayloadFactory::new(
        SinkConfig::new("bench", "svc")
            .with_category_handling(CategoryHandling::IncludeAsLabel),
        Vec::new(),
    );
    group.bench_function("fluentd_entry_json", |b| {
        let mut buffer = Vec::with_capacity(512);
        b.iter(|| {
            let entry = factory.create_payload(black_box(&message));
            buffer.clear();
            let _ = serde_json::to_writer(&mut buffer, &*entry);
            black_box(buffer.len())
        });
    });

    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(1));

    let pool: FixSizePool<LogEntry> = FixSizePool::new(64);
    group.bench_function("rent_give_back", |b| {
        b.iter(|| {
            let entry = pool.rent_or_else(LogEntry::default);
            pool.give_back(black_box(entry));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_logging,
    bench_level_filtering,
    bench_concurrent_logging,
    bench_payloads,
    bench_pool
);
criterion_main!(benches);
