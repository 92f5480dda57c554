//! Tamper detection on stored records
//!
//! Each test stores one honest record through the service, copies it into a
//! second record store with one thing altered, and reads history back through
//! a service over the altered store and the original key store.

use crate::test_utils::*;
use nimbus_attest::ConcatAttestor;
use nimbus_core::FieldMargins;
use nimbus_crypto::{sha256_hex, AesGcmCodec, CodecError, TransitKey};
use nimbus_pipeline::{
    AttestationRecord, AttestationService, InMemoryAuthorizer, InMemoryKeyStore,
    InMemoryRecordStore, Pipeline, PipelineError, RecordStore, TransitKeyStore,
};
use std::sync::Arc;

const ADMIN_KEY: &str = "tamper-admin";

type Service = AttestationService<AesGcmCodec, ConcatAttestor>;

fn service(records: Arc<dyn RecordStore>, keys: Arc<dyn TransitKeyStore>) -> Service {
    let pipeline =
        Pipeline::new(AesGcmCodec::new(), ConcatAttestor::new(), FieldMargins::default()).unwrap();
    AttestationService::new(
        pipeline,
        signers().clone(),
        records,
        keys,
        Arc::new(InMemoryAuthorizer::with_admin("admin", ADMIN_KEY)),
    )
}

/// Store one honest record, then serve history from a copy altered by `alter`.
fn history_after(alter: impl FnOnce(&mut AttestationRecord)) -> (AttestationRecord, Service) {
    init_tracing();
    let keys: Arc<InMemoryKeyStore> = Arc::new(InMemoryKeyStore::new());
    let honest = service(Arc::new(InMemoryRecordStore::new()), keys.clone());
    let record = honest.attest_and_store(ADMIN_KEY, &outlier_samples()).unwrap();

    let mut altered = record.clone();
    alter(&mut altered);
    let tampered_store = Arc::new(InMemoryRecordStore::new());
    tampered_store.insert("admin", &altered).unwrap();

    (record, service(tampered_store, keys))
}

#[test]
fn test_untouched_copy_reads_back() {
    let (record, svc) = history_after(|_| {});

    let history = svc.historical(ADMIN_KEY).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].record_id, record.record_id);
    assert_eq!(history[0].reading.temperature, 20.25);
}

#[test]
fn test_flipped_ciphertext_byte_fails_hash_check() {
    let (_, svc) = history_after(|r| r.sealed.ciphertext[40] ^= 0x01);

    assert!(matches!(
        svc.historical(ADMIN_KEY),
        Err(PipelineError::Codec(CodecError::TamperedData(_)))
    ));
}

#[test]
fn test_rehashed_ciphertext_fails_authentication() {
    // Attacker alters the payload and recomputes the hash to match.
    let (_, svc) = history_after(|r| {
        let last = r.sealed.ciphertext.len() - 1;
        r.sealed.ciphertext[last] ^= 0x01;
        r.sealed.integrity_hash = sha256_hex(&r.sealed.ciphertext);
    });

    assert!(matches!(
        svc.historical(ADMIN_KEY),
        Err(PipelineError::Codec(CodecError::TamperedData(_)))
    ));
}

#[test]
fn test_altered_hash_fails() {
    let (_, svc) = history_after(|r| r.sealed.integrity_hash = sha256_hex(b"forged"));

    assert!(matches!(
        svc.historical(ADMIN_KEY),
        Err(PipelineError::Codec(CodecError::TamperedData(_)))
    ));
}

#[test]
fn test_truncated_ciphertext_fails() {
    let (_, svc) = history_after(|r| {
        r.sealed.ciphertext.truncate(10);
        r.sealed.integrity_hash = sha256_hex(&r.sealed.ciphertext);
    });

    assert!(matches!(
        svc.historical(ADMIN_KEY),
        Err(PipelineError::Codec(CodecError::TamperedData(_)))
    ));
}

#[test]
fn test_forged_signature_caught_by_audit() {
    let (record, svc) = history_after(|r| r.attestation.signature[300] ^= 0x01);

    // Readback only needs the hash and key; provenance is the auditor's check.
    assert_eq!(svc.historical(ADMIN_KEY).unwrap().len(), 1);
    assert!(!svc.audit(ADMIN_KEY, &record.record_id).unwrap());
}

#[test]
fn test_relabelled_identity_caught_by_audit() {
    let (record, svc) = history_after(|r| r.attestation.identities[0] = "Mallory".to_string());
    assert!(!svc.audit(ADMIN_KEY, &record.record_id).unwrap());
}

#[test]
fn test_wrong_transit_key_fails() {
    init_tracing();
    let honest = service(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryKeyStore::new()),
    );
    let record = honest.attest_and_store(ADMIN_KEY, &consistent_samples()).unwrap();

    let records = Arc::new(InMemoryRecordStore::new());
    records.insert("admin", &record).unwrap();
    let keys = Arc::new(InMemoryKeyStore::new());
    keys.put(record.record_id, &TransitKey::generate()).unwrap();

    assert!(matches!(
        service(records, keys).historical(ADMIN_KEY),
        Err(PipelineError::Codec(CodecError::TamperedData(_)))
    ));
}

#[test]
fn test_one_bad_record_fails_whole_history() {
    init_tracing();
    let records = Arc::new(InMemoryRecordStore::new());
    let keys = Arc::new(InMemoryKeyStore::new());
    let svc = service(records.clone(), keys.clone());

    let good = svc.attest_and_store(ADMIN_KEY, &consistent_samples()).unwrap();
    assert_eq!(svc.historical(ADMIN_KEY).unwrap().len(), 1);

    let mut bad = good.clone();
    bad.record_id = uuid::Uuid::new_v4();
    bad.sealed.ciphertext[0] ^= 0xff;
    records.insert("admin", &bad).unwrap();
    keys.put(bad.record_id, &TransitKey::generate()).unwrap();

    assert!(svc.historical(ADMIN_KEY).is_err());
}

#[test]
fn test_open_verified_rejects_forged_signature() {
    init_tracing();
    let pipeline =
        Pipeline::new(AesGcmCodec::new(), ConcatAttestor::new(), FieldMargins::default()).unwrap();
    let output = pipeline.run(&consistent_samples(), signers()).unwrap();

    let mut record = output.record.clone();
    record.attestation.signature[0] ^= 0x01;

    assert!(matches!(
        pipeline.open_verified(&record, &output.transit_key, &signers().verifiers()),
        Err(PipelineError::AttestationRejected(id)) if id == record.record_id
    ));
    // Hash and key are still intact.
    assert!(pipeline.open(&record, &output.transit_key).is_ok());
}
