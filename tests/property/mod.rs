//! Property-based tests for relink.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that the
//! backoff schedule, endpoint validation and handle generations hold their
//! invariants for every input.

pub mod generation;
