//! End-to-end tests for the Nimbus workspace
//!
//! This suite validates:
//! - Full pipeline runs from provider samples to stored, attested records
//! - Tamper detection on stored ciphertext, hashes, signatures and keys
//! - The attestation service with both in-memory and SQLite stores
//! - Concurrent runs sharing one pipeline and one set of stores
//! - Configuration loading feeding the pipeline

pub mod test_utils;

#[cfg(test)]
mod pipeline_tests;

#[cfg(test)]
mod tamper_tests;


#[cfg(test)]
mod concurrency_tests;
