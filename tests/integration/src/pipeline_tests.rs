//! Pipeline runs from provider samples to verified records

use crate::test_utils::*;
use nimbus_attest::{
    aggregate, verify_aggregate, AttestError, ConcatAttestor, SignerIdentity, SignerSet, Verifier,
    VerifierSet,
};
use nimbus_consensus::FieldOutcome;
use nimbus_core::{Config, FieldMargins, ReconciledReading, WeatherField};
use nimbus_crypto::{AesGcmCodec, TransitKey};
use nimbus_pipeline::{AttestationRecord, Pipeline, PipelineError};

fn pipeline() -> Pipeline<AesGcmCodec, ConcatAttestor> {
    Pipeline::new(AesGcmCodec::new(), ConcatAttestor::new(), FieldMargins::default())
        .expect("default margins are valid")
}

#[test]
fn test_consistent_sources_end_to_end() {
    init_tracing();
    let pipeline = pipeline();

    let output = pipeline.run(&consistent_samples(), signers()).unwrap();

    assert_eq!(output.reconciliation.reading.temperature, 20.5);
    assert!(output.reconciliation.fully_consistent());
    assert_eq!(output.record.attestation.len(), 3 * 256);
    assert!(pipeline
        .verify_record(&output.record, &signers().verifiers())
        .unwrap());

    let reading = pipeline.open(&output.record, &output.transit_key).unwrap();
    assert_eq!(reading.temperature, 20.5);
    assert_eq!(reading.timestamp, observed_at());
}

#[test]
fn test_outlier_excluded_end_to_end() {
    init_tracing();
    let output = pipeline().run(&outlier_samples(), signers()).unwrap();

    assert_eq!(output.reconciliation.reading.temperature, 20.25);
    assert_eq!(
        output.reconciliation.excluded_sources(),
        vec![
            (WeatherField::Temperature, "weatherapi"),
            (WeatherField::TemperatureApparent, "weatherapi"),
        ]
    );
    assert_eq!(output.reconciliation.reading.humidity, 62.0);
}

#[test]
fn test_two_sources_disagreeing_are_flagged() {
    init_tracing();
    let samples = vec![sample("tomorrow-io", 10.0), sample("openweather", 20.0)];

    let output = pipeline().run(&samples, signers()).unwrap();
    let temperature = output
        .reconciliation
        .resolution(WeatherField::Temperature)
        .unwrap();

    assert_eq!(temperature.outcome, FieldOutcome::Unresolved);
    assert_eq!(temperature.value, 15.0);
    assert!(!output.reconciliation.fully_consistent());
}

#[test]
fn test_record_survives_json_transport() {
    init_tracing();
    let pipeline = pipeline();
    let output = pipeline.run(&consistent_samples(), signers()).unwrap();

    let json = output.record.to_json().unwrap();
    let key_text = output.transit_key.to_base64();
    assert_eq!(key_text.len(), 24);
    assert!(!json.contains(&key_text));

    let record = AttestationRecord::from_json(&json).unwrap();
    let key = TransitKey::from_base64(&key_text).unwrap();
    let reading: ReconciledReading = pipeline
        .open_verified(&record, &key, &signers().verifiers())
        .unwrap();
    assert_eq!(reading, output.reconciliation.reading);
}

#[test]
fn test_extreme_pressure_survives_seal_and_open() {
    init_tracing();
    let pipeline = pipeline();
    let samples: Vec<_> = consistent_samples()
        .into_iter()
        .map(|s| s.with(WeatherField::Pressure, 1e307))
        .collect();

    let output = pipeline.run(&samples, signers()).unwrap();
    assert_eq!(output.reconciliation.reading.pressure, 1e307);

    let reading = pipeline
        .open_verified(&output.record, &output.transit_key, &signers().verifiers())
        .unwrap();
    assert_eq!(reading.pressure, 1e307);
    assert_eq!(reading.temperature, 20.5);
}

#[test]
fn test_record_wire_form() {
    init_tracing();
    let output = pipeline().run(&consistent_samples(), signers()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output.record.to_json().unwrap()).unwrap();

    let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "aggregateSignature",
            "ciphertext",
            "identities",
            "integrityHash",
            "recordId",
            "timestamp"
        ]
    );
    assert_eq!(value["identities"], serde_json::json!(IDENTITIES));
    assert_eq!(
        value["aggregateSignature"].as_str().unwrap().len(),
        2 * 3 * 256
    );
    assert_eq!(value["integrityHash"].as_str().unwrap().len(), 64);
}

#[test]
fn test_weather_2024_middle_slice_flip() {
    init_tracing();
    let data = b"weather-2024";
    let signatures: Vec<_> = signers().iter().map(|s| s.sign(data).unwrap()).collect();
    let mut attestation = aggregate(&signatures);

    assert!(verify_aggregate(&signers().verifiers(), data, &attestation).unwrap());

    let slice = attestation.len() / 3;
    attestation.signature[slice + slice / 2] ^= 0x80;
    assert!(!verify_aggregate(&signers().verifiers(), data, &attestation).unwrap());
}

#[test]
fn test_verifiers_from_pem_check_stored_record() {
    init_tracing();
    let output = pipeline().run(&consistent_samples(), signers()).unwrap();

    // Downstream auditors only hold identities and PEM public keys.
    let verifiers: Vec<Verifier> = signers()
        .iter()
        .map(|s| Verifier::from_pem(s.identity(), &s.public_key_pem().unwrap()).unwrap())
        .collect();
    let verifiers = VerifierSet::new(verifiers).unwrap();

    assert!(verify_aggregate(
        &verifiers,
        &output.record.sealed.ciphertext,
        &output.record.attestation
    )
    .unwrap());
}

#[test]
fn test_signer_reloaded_from_pem_signs_identically() {
    let original = &signers().as_slice()[0];
    let pem = original.private_key_pem().unwrap();
    let reloaded = SignerIdentity::from_pem(original.identity(), &pem).unwrap();

    assert_eq!(reloaded.fingerprint(), original.fingerprint());
    assert_eq!(reloaded.sign(b"x").unwrap(), original.sign(b"x").unwrap());
}

#[test]
fn test_legacy_parallel_arrays_rejected_when_unequal() {
    let identities: Vec<String> = IDENTITIES.iter().map(|s| s.to_string()).collect();
    let keys: Vec<_> = signers()
        .iter()
        .take(2)
        .map(|s| s.public_key().clone())
        .collect();

    assert!(matches!(
        VerifierSet::from_parts(&identities, &keys),
        Err(AttestError::SignerCountMismatch { identities: 3, keys: 2 })
    ));
}

#[test]
fn test_mixed_key_sizes_fail_self_check_with_key_mismatch() {
    init_tracing();
    let legacy = SignerIdentity::generate_with_bits("LegacyStation", 1024).unwrap();
    let mixed = SignerSet::new(vec![signers().as_slice()[0].clone(), legacy]).unwrap();

    assert!(matches!(
        pipeline().run(&consistent_samples(), &mixed),
        Err(PipelineError::Attest(AttestError::KeyMismatch(_)))
    ));
}

#[test]
fn test_pipeline_from_toml_config() {
    init_tracing();
    let config = Config::from_toml_str(
        r#"
        [consensus]
        min_sources = 4

        [consensus.margins]
        temperature = 1.0
        "#,
    )
    .unwrap();
    let pipeline = Pipeline::standard(&config.consensus).unwrap();

    assert!(matches!(
        pipeline.run(&outlier_samples(), signers()),
        Err(PipelineError::Consensus(_))
    ));

    let mut samples = outlier_samples();
    samples.push(sample("visualcrossing", 20.5));
    let output = pipeline.run(&samples, signers()).unwrap();

    // A 100% margin treats the 40.0 reading as consistent.
    assert_eq!(
        output
            .reconciliation
            .resolution(WeatherField::Temperature)
            .unwrap()
            .outcome,
        FieldOutcome::Consistent
    );
    assert_eq!(output.reconciliation.reading.temperature, 25.25);
}

#[test]
fn test_reconciliation_is_idempotent_across_runs() {
    let pipeline = pipeline();
    let samples = outlier_samples();

    let first = pipeline.run(&samples, signers()).unwrap();
    let second = pipeline.run(&samples, signers()).unwrap();

    assert_eq!(first.reconciliation, second.reconciliation);
    // Fresh key and nonce per seal.
    assert_ne!(first.record.sealed.ciphertext, second.record.sealed.ciphertext);
    assert_ne!(first.record.record_id, second.record.record_id);
}

mod sealed_reading_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn opened_reading_equals_reconciled_reading(
            temps in prop::collection::vec(-40.0f64..50.0, 3..6)
        ) {
            let pipeline = pipeline();
            let samples: Vec<_> = temps
                .iter()
                .enumerate()
                .map(|(i, t)| sample(&format!("provider-{}", i), *t))
                .collect();

            let output = pipeline.run(&samples, signers()).unwrap();
            let reading = pipeline
                .open_verified(&output.record, &output.transit_key, &signers().verifiers())
                .unwrap();

            prop_assert_eq!(reading, output.reconciliation.reading);
            prop_assert!(output.record.sealed.verify_integrity());
        }
    }
}
