//! Concurrent callers sharing one service

use crate::test_utils::*;
use nimbus_attest::ConcatAttestor;
use nimbus_core::FieldMargins;
use nimbus_crypto::AesGcmCodec;
use nimbus_pipeline::{
    AttestationService, InMemoryAuthorizer, Permission, Pipeline, RecordStore, SqliteKeyStore,
    SqliteRecordStore,
};
use std::collections::HashSet;
use std::sync::Arc;

const ADMIN_KEY: &str = "concurrency-admin";
const STATIONS: usize = 4;
const RUNS_PER_STATION: usize = 3;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_stations_share_one_service() {
    init_tracing();
    let records_path = temp_db("nimbus_concurrent_records");
    let keys_path = temp_db("nimbus_concurrent_keys");

    let records = Arc::new(SqliteRecordStore::open(&records_path).unwrap());
    let pipeline =
        Pipeline::new(AesGcmCodec::new(), ConcatAttestor::new(), FieldMargins::default()).unwrap();
    let svc = Arc::new(AttestationService::new(
        pipeline,
        signers().clone(),
        records.clone(),
        Arc::new(SqliteKeyStore::open(&keys_path).unwrap()),
        Arc::new(InMemoryAuthorizer::with_admin("admin", ADMIN_KEY)),
    ));

    let mut handles = Vec::new();
    for station in 0..STATIONS {
        let client = svc
            .setup_client(
                ADMIN_KEY,
                &format!("station-{}", station),
                &[Permission::FetchStore, Permission::ReadHistory],
            )
            .unwrap();
        let svc = svc.clone();

        // Signing is CPU-bound; keep it off the async workers.
        handles.push(tokio::task::spawn_blocking(move || {
            let ids = (0..RUNS_PER_STATION)
                .map(|run| {
                    let samples = if run % 2 == 0 {
                        consistent_samples()
                    } else {
                        outlier_samples()
                    };
                    svc.attest_and_store(client.api_key(), &samples)
                        .unwrap()
                        .record_id
                })
                .collect::<Vec<_>>();
            (client, ids)
        }));
    }

    let mut ids = HashSet::new();
    let mut clients = Vec::new();
    for handle in handles {
        let (client, stored) = handle.await.unwrap();
        ids.extend(stored.iter().copied());
        clients.push((client, stored));
    }

    assert_eq!(ids.len(), STATIONS * RUNS_PER_STATION);
    assert_eq!(records.count().unwrap(), STATIONS * RUNS_PER_STATION);

    // Each station reads back exactly its own records, in order.
    for (client, stored) in &clients {
        let history = svc.historical(client.api_key()).unwrap();
        let read: Vec<_> = history.iter().map(|entry| entry.record_id).collect();
        assert_eq!(&read, stored);
        for entry in &history {
            assert!(entry.reading.temperature == 20.5 || entry.reading.temperature == 20.25);
        }
    }
    assert!(svc.historical(ADMIN_KEY).unwrap().is_empty());

    let attestor = svc.pipeline().attestor().metrics();
    assert_eq!(attestor.attestations, (STATIONS * RUNS_PER_STATION) as u64);
    assert_eq!(attestor.rejected, 0);

    for path in [&records_path, &keys_path] {
        let _ = std::fs::remove_file(path);
    }
}

#[tokio::test]
async fn test_parallel_pipeline_runs_are_independent() {
    init_tracing();
    let pipeline = Arc::new(
        Pipeline::new(AesGcmCodec::new(), ConcatAttestor::new(), FieldMargins::default()).unwrap(),
    );

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::task::spawn_blocking(move || {
                let temperature = 18.0 + i as f64;
                let samples = vec![
                    sample("tomorrow-io", temperature),
                    sample("openweather", temperature),
                    sample("weatherapi", temperature),
                ];
                let output = pipeline.run(&samples, signers()).unwrap();
                let reading = pipeline.open(&output.record, &output.transit_key).unwrap();
                (temperature, reading.temperature)
            })
        })
        .collect();

    for handle in handles {
        let (expected, actual) = handle.await.unwrap();
        assert_eq!(expected, actual);
    }
}
