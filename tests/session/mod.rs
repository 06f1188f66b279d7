//! Scenario tests for the reconnection controller.
//!
//! Test organization:
//! - support.rs: scripted connector and test harness
//! - backoff.rs: retry delays, cooldown and attempt resets
//! - lifecycle.rs: stale events, start/stop and construction failures
//! - endpoint.rs: endpoint switches and restarts
//! - actions.rs: outbound actions and domain observers

mod actions;
mod backoff;
mod lifecycle;
