//! Check accounting and run results
//!
//! Actors emit [`HarnessEvent`]s over a channel; a single collector task
//! tallies them into [`RunResults`]. The only mutable state shared directly
//! between actors is the [`ErrorRate`] accumulator, which is a pair of
//! atomic counters: a commutative increment needs no lock.

use crate::config::Thresholds;
use crate::scenario::Scenario;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Process-wide check failure accumulator. Reset only between independent
/// runs; reads are eventually consistent, which is enough for rate
/// threshold evaluation.
#[derive(Debug, Default)]
pub struct ErrorRate {
    failures: AtomicU64,
    total: AtomicU64,
}

impl ErrorRate {
    /// Record one boolean: a failed check contributes 1, a passed check 0
    pub fn add(&self, failed: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Fraction of recorded checks that failed; 0.0 when nothing recorded
    pub fn rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.failures() as f64 / total as f64
    }

    pub fn reset(&self) {
        self.failures.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }
}

/// Outcome of one named boolean assertion about an HTTP response
#[derive(Debug, Clone, Copy)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
}

/// Events emitted by actors during setup and iterations
#[derive(Debug)]
pub enum HarnessEvent {
    /// One HTTP call completed (or failed at the transport level)
    Request {
        scenario: Scenario,
        /// Observed latency; absent when the transport failed
        latency: Option<Duration>,
        transport_error: bool,
    },
    /// One recorded check
    Check(CheckResult),
    /// A merge returned 404: tolerated (concurrent actors race on the same
    /// fixture PR) but counted so genuine id bugs stay visible
    MergeRaced,
}

/// Latency samples collected during a run
#[derive(Debug, Default, Clone)]
pub struct LatencyStats {
    samples: Vec<Duration>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Calculate percentile (0-100)
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort();
        let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn p95(&self) -> Option<Duration> {
        self.percentile(95.0)
    }

    pub fn p99(&self) -> Option<Duration> {
        self.percentile(99.0)
    }
}

/// Pass/fail tally for one named check
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckTally {
    pub passed: u64,
    pub failed: u64,
}

/// Aggregated outcome of one run
#[derive(Debug, Default)]
pub struct RunResults {
    pub requests_sent: u64,
    pub transport_failures: u64,
    /// Tolerated merge 404s
    pub merge_races: u64,
    /// Latencies of all completed requests
    pub latencies: LatencyStats,
    /// Request count per scenario
    pub per_scenario: BTreeMap<Scenario, u64>,
    /// Tally per named check
    pub checks: BTreeMap<&'static str, CheckTally>,
    /// Final value of the shared [`ErrorRate`] accumulator
    pub check_failure_rate: f64,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunResults {
    pub fn record(&mut self, event: HarnessEvent) {
        match event {
            HarnessEvent::Request {
                scenario,
                latency,
                transport_error,
            } => {
                self.requests_sent += 1;
                *self.per_scenario.entry(scenario).or_default() += 1;
                if transport_error {
                    self.transport_failures += 1;
                }
                if let Some(latency) = latency {
                    self.latencies.record(latency);
                }
            }
            HarnessEvent::Check(check) => {
                let tally = self.checks.entry(check.name).or_default();
                if check.passed {
                    tally.passed += 1;
                } else {
                    tally.failed += 1;
                }
            }
            HarnessEvent::MergeRaced => {
                self.merge_races += 1;
            }
        }
    }

    /// Fraction of requests that failed at the transport level
    pub fn http_failure_rate(&self) -> f64 {
        if self.requests_sent == 0 {
            return 0.0;
        }
        self.transport_failures as f64 / self.requests_sent as f64
    }

    /// Evaluate the run against declared thresholds
    pub fn meets_thresholds(&self, thresholds: &Thresholds) -> bool {
        let p95_ok = self
            .latencies
            .p95()
            .map(|p| p < thresholds.p95_latency)
            .unwrap_or(true);
        let http_ok = self.http_failure_rate() < thresholds.max_http_failure_rate;
        let checks_ok = self.check_failure_rate < thresholds.max_check_failure_rate;
        p95_ok && http_ok && checks_ok
    }

    /// Print a human-readable report
    pub fn print_summary(&self, thresholds: &Thresholds) {
        let p95_ms = self
            .latencies
            .p95()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!(
            " PRLOAD RESULTS ({:.0}s, {} requests)",
            self.duration.as_secs_f64(),
            self.requests_sent
        );
        println!("═══════════════════════════════════════════════════════════════");
        println!();
        println!(" ─── Requests per scenario ───────────────────────────────────");
        for (scenario, count) in &self.per_scenario {
            println!("   {:12} {:>8}", scenario.name(), count);
        }
        if self.merge_races > 0 {
            println!("   ({} merge 404s tolerated as races)", self.merge_races);
        }
        println!();
        println!(" ─── Checks ──────────────────────────────────────────────────");
        println!("   {:24} {:>8} {:>8}", "check", "passed", "failed");
        for (name, tally) in &self.checks {
            println!("   {:24} {:>8} {:>8}", name, tally.passed, tally.failed);
        }
        println!();
        println!(" ─── Thresholds ──────────────────────────────────────────────");
        println!(
            "   p95 latency:       {:>8.1}ms  (budget {:.0}ms)",
            p95_ms,
            thresholds.p95_latency.as_secs_f64() * 1000.0
        );
        println!(
            "   http failure rate: {:>8.4}   (max {:.4})",
            self.http_failure_rate(),
            thresholds.max_http_failure_rate
        );
        println!(
            "   check error rate:  {:>8.4}   (max {:.4})",
            self.check_failure_rate, thresholds.max_check_failure_rate
        );
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        let overall = if self.meets_thresholds(thresholds) {
            "PASS"
        } else {
            "FAIL (threshold violated)"
        };
        println!(" OVERALL: {}", overall);
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }

    /// Single-line JSON summary for CI parsing
    pub fn to_json(&self, thresholds: &Thresholds) -> String {
        let p95_str = self
            .latencies
            .p95()
            .map(|d| format!("{:.2}", d.as_secs_f64() * 1000.0))
            .unwrap_or_else(|| "null".to_string());

        format!(
            r#"{{"passed":{},"duration_secs":{:.0},"requests":{},"transport_failures":{},"merge_races":{},"p95_ms":{},"http_failure_rate":{:.6},"check_failure_rate":{:.6}}}"#,
            self.meets_thresholds(thresholds),
            self.duration.as_secs_f64(),
            self.requests_sent,
            self.transport_failures,
            self.merge_races,
            p95_str,
            self.http_failure_rate(),
            self.check_failure_rate,
        )
    }
}

/// Drain events into results until all senders are dropped
pub async fn collect(mut rx: mpsc::Receiver<HarnessEvent>) -> RunResults {
    let mut results = RunResults::default();
    while let Some(event) = rx.recv().await {
        results.record(event);
    }
    results
}
