//! prload harness library
//!
//! Drives HTTP traffic against a pr-review-manager instance and validates
//! latency and error-rate thresholds under a virtual-user ramp. The harness
//! owns the test lifecycle (setup, iteration, teardown); the runner owns the
//! ramp profile and result collection.

pub mod client;
pub mod config;
pub mod fixture;
pub mod harness;
pub mod metrics;
pub mod runner;
pub mod scenario;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::{Config, RampStage, Thresholds};
pub use fixture::{FixtureSet, RunId};
pub use harness::Harness;
pub use metrics::{ErrorRate, HarnessEvent, RunResults};
pub use runner::LoadRunner;
pub use scenario::{Scenario, WeightTable};
