//! Integration tests for the request adapter over the simulated engine
//!
//! These tests validate the synchronous request contract end to end:
//! - Chunk ordering across arbitrary notification boundaries
//! - Empty and failed jobs
//! - Isolation between concurrent requests
//! - Wait timeout and job serialization policy

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aitalk_bridge::config::{DrainConfig, RequestConfig};
use aitalk_bridge::engine::backend::{Call, Delivery, JobScript, SimulatedEngine};
use aitalk_bridge::engine::{abi, JobKind, Status};
use aitalk_bridge::telemetry::{JobEvent, TelemetryCollector};
use aitalk_bridge::{AdapterError, Engine, RequestAdapter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn adapter_with(
    engine: &Arc<SimulatedEngine>,
    request: RequestConfig,
    drain: DrainConfig,
) -> RequestAdapter {
    RequestAdapter::new(
        engine.clone(),
        request,
        drain,
        TelemetryCollector::new(256, 256),
    )
}

fn adapter(engine: &Arc<SimulatedEngine>) -> RequestAdapter {
    adapter_with(engine, RequestConfig::default(), DrainConfig::default())
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Three notifications of 4096, 4096 and 812 bytes, then close
#[test]
fn test_three_notification_scenario() {
    let engine = Arc::new(SimulatedEngine::new());
    let expected = pattern(4096 + 4096 + 812);
    engine.push_script(JobScript::text(expected.clone()).notify(vec![4096, 4096, 812]));
    let adapter = adapter(&engine);

    let output = adapter
        .text_to_intermediate("こんにちは".as_bytes())
        .unwrap();

    assert_eq!(output.len(), 4096 + 4096 + 812);
    assert_eq!(output, expected);
    assert_eq!(engine.closed_jobs(), 1);
    assert!(engine.sessions().is_empty());
}

#[test]
fn test_close_without_chunks_yields_empty_output() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.push_script(JobScript::text(Vec::new()).notify(Vec::new()));
    let adapter = adapter(&engine);

    let output = adapter.text_to_intermediate(b"").unwrap();

    assert!(output.is_empty());
    assert_eq!(engine.closed_jobs(), 1);
}

#[test]
fn test_arbitrary_boundaries_preserve_order() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let engine = Arc::new(SimulatedEngine::new());
    let adapter = adapter_with(
        &engine,
        RequestConfig::default(),
        DrainConfig {
            text_chunk_capacity: 7,
            audio_chunk_capacity: 5,
        },
    );

    for _ in 0..25 {
        let total = rng.gen_range(0..400);
        let text = pattern(total);
        let mut sizes = Vec::new();
        let mut remaining = total;
        while remaining > 0 {
            let size = rng.gen_range(1..=remaining.min(64));
            sizes.push(size);
            remaining -= size;
        }
        engine.push_script(JobScript::text(text.clone()).notify(sizes.clone()));
        assert_eq!(adapter.text_to_intermediate(b"t").unwrap(), text);

        let samples: Vec<i16> = text.iter().map(|b| i16::from(*b) * 100 - 12_000).collect();
        engine.push_script(JobScript::audio(samples.clone()).notify(sizes));
        assert_eq!(adapter.intermediate_to_audio(b"a").unwrap(), samples);
    }
    assert_eq!(engine.open_jobs(), 0);
}

/// Capacity-sized batches rely on the failing fetch to end the pass
#[test]
fn test_exactly_full_batches() {
    let engine = Arc::new(SimulatedEngine::new());
    let adapter = adapter_with(
        &engine,
        RequestConfig::default(),
        DrainConfig {
            text_chunk_capacity: 8,
            audio_chunk_capacity: 8,
        },
    );
    let expected = pattern(32);
    engine.push_script(JobScript::text(expected.clone()).notify(vec![8, 16, 8]));

    assert_eq!(adapter.text_to_intermediate(b"x").unwrap(), expected);
}

#[test]
fn test_slow_drain_is_never_cut_short() {
    let engine = Arc::new(SimulatedEngine::new());
    let expected = pattern(300);
    engine.push_script(
        JobScript::text(expected.clone())
            .notify(vec![100, 100, 100])
            .notification_delay(Duration::from_millis(2))
            .fetch_delay(Duration::from_millis(3)),
    );
    let adapter = adapter_with(
        &engine,
        RequestConfig::default(),
        DrainConfig {
            text_chunk_capacity: 16,
            audio_chunk_capacity: 16,
        },
    );

    assert_eq!(adapter.text_to_intermediate(b"x").unwrap(), expected);
}

#[test]
fn test_inline_delivery_completes_before_wait() {
    let engine = Arc::new(SimulatedEngine::with_delivery(Delivery::Inline));
    let adapter = adapter(&engine);

    assert_eq!(adapter.text_to_intermediate(b"inline").unwrap(), b"inline".to_vec());
    assert_eq!(adapter.intermediate_to_audio(&[128]).unwrap(), vec![0]);
}

#[test]
fn test_submission_failure_leaves_nothing_behind() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.fail_on(Call::BeginAudio, Status::TOO_MANY_JOBS);
    let adapter = adapter(&engine);

    let started = Instant::now();
    let err = adapter.intermediate_to_audio(b"kana").unwrap_err();

    assert_eq!(
        err,
        AdapterError::SubmissionFailed {
            kind: JobKind::IntermediateToAudio,
            code: Status::TOO_MANY_JOBS
        }
    );
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(engine.sessions().is_empty());
    assert_eq!(engine.call_count(Call::CloseAudio), 0);
}

#[test]
fn test_finalization_failure_discards_buffer() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.fail_on(Call::CloseText, Status::INTERNAL_ERROR);
    let adapter = adapter(&engine);

    let err = adapter.text_to_intermediate(b"complete data").unwrap_err();

    assert_eq!(
        err,
        AdapterError::FinalizationFailed {
            kind: JobKind::TextToIntermediate,
            code: Status::INTERNAL_ERROR
        }
    );
    assert!(engine.sessions().is_empty());
}

#[test]
fn test_concurrent_requests_do_not_cross_deliver() {
    let engine = Arc::new(SimulatedEngine::new().with_default_notification_units(3));
    let adapter = Arc::new(adapter_with(
        &engine,
        RequestConfig::default(),
        DrainConfig {
            text_chunk_capacity: 2,
            audio_chunk_capacity: 2,
        },
    ));

    let handles: Vec<_> = (0..8u8)
        .map(|worker| {
            let adapter = Arc::clone(&adapter);
            thread::spawn(move || {
                for round in 0..10u8 {
                    let input: Vec<u8> = (0..50u8)
                        .map(|i| worker.wrapping_mul(31).wrapping_add(round).wrapping_add(i))
                        .collect();
                    let output = adapter.text_to_intermediate(&input).unwrap();
                    assert_eq!(output, input, "worker {} round {}", worker, round);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.closed_jobs(), 80);
    assert!(engine.sessions().is_empty());
}

#[test]
fn test_serialized_jobs_never_overlap() {
    let engine = Arc::new(SimulatedEngine::new().with_default_notification_units(4));
    let adapter = Arc::new(adapter_with(
        &engine,
        RequestConfig {
            wait_timeout_ms: None,
            serialize_jobs: true,
        },
        DrainConfig::default(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let adapter = Arc::clone(&adapter);
            thread::spawn(move || {
                for _ in 0..5 {
                    adapter.text_to_intermediate(&pattern(40)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.peak_open_jobs(), 1);
    assert_eq!(engine.closed_jobs(), 20);
}

#[test]
fn test_wait_timeout_closes_job() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.push_script(JobScript::text(pattern(10)).without_close());
    let adapter = adapter_with(
        &engine,
        RequestConfig {
            wait_timeout_ms: Some(30),
            serialize_jobs: false,
        },
        DrainConfig::default(),
    );

    let err = adapter.text_to_intermediate(b"x").unwrap_err();

    assert_eq!(
        err,
        AdapterError::WaitTimedOut {
            kind: JobKind::TextToIntermediate,
            timeout_ms: 30
        }
    );
    assert_eq!(engine.open_jobs(), 0);
    assert!(engine.sessions().is_empty());
}

#[test]
fn test_late_callbacks_after_timeout_are_dropped() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.push_script(
        JobScript::text(pattern(10)).notification_delay(Duration::from_millis(80)),
    );
    let adapter = adapter_with(
        &engine,
        RequestConfig {
            wait_timeout_ms: Some(10),
            serialize_jobs: false,
        },
        DrainConfig::default(),
    );

    assert!(matches!(
        adapter.text_to_intermediate(b"x"),
        Err(AdapterError::WaitTimedOut { .. })
    ));

    // the scripted thread keeps notifying into an unregistered token
    thread::sleep(Duration::from_millis(250));
    assert!(engine.sessions().is_empty());

    // a fresh request on the same adapter is unaffected
    assert_eq!(adapter.text_to_intermediate(b"next").unwrap(), b"next".to_vec());
}

#[test]
fn test_unexpected_reason_surfaces_on_timeout() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.push_script(
        JobScript::audio(vec![1, 2, 3])
            .with_unexpected(abi::PH_LABEL)
            .without_close(),
    );
    let adapter = adapter_with(
        &engine,
        RequestConfig {
            wait_timeout_ms: Some(30),
            serialize_jobs: false,
        },
        DrainConfig::default(),
    );

    let err = adapter.intermediate_to_audio(b"x").unwrap_err();

    assert_eq!(
        err,
        AdapterError::UnexpectedCallbackReason {
            kind: JobKind::IntermediateToAudio,
            reason: abi::PH_LABEL
        }
    );
}

#[test]
fn test_unexpected_reason_does_not_block_normal_close() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.push_script(JobScript::text(b"ok".to_vec()).with_unexpected(abi::BOOKMARK));
    let adapter = adapter(&engine);

    assert_eq!(adapter.text_to_intermediate(b"x").unwrap(), b"ok".to_vec());
}

#[test]
fn test_lifecycle_events_are_published() {
    let engine = Arc::new(SimulatedEngine::new());
    engine.push_script(JobScript::text(pattern(20)).notify(vec![10, 10]));
    let adapter = adapter(&engine);
    let mut rx = adapter.telemetry().subscribe();

    adapter.text_to_intermediate(b"x").unwrap();

    let mut events = Vec::new();
    while let Ok(timed) = rx.try_recv() {
        events.push(timed.event);
    }
    // drains may be published before the submitting thread reports the job
    assert!(events
        .iter()
        .any(|event| matches!(event, JobEvent::Submitted { .. })));
    assert!(matches!(
        events.last(),
        Some(JobEvent::Closed {
            total_units: 20,
            ..
        })
    ));
    let drained: usize = events
        .iter()
        .filter_map(|event| match event {
            JobEvent::ChunksDrained { units, .. } => Some(*units),
            _ => None,
        })
        .sum();
    assert_eq!(drained, 20);

    let snapshot = adapter.telemetry().snapshot();
    assert_eq!(snapshot.total_events as usize, events.len());
}
