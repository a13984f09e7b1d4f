//! Harness configuration
//!
//! Configuration is loaded from environment variables; every knob has a
//! default matching the standard run profile.

use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors raised while parsing configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid ramp stage: {0} (expected <seconds>:<actors>)")]
    InvalidStage(String),
}

/// Main harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the service under test
    pub base_url: String,
    /// Per-actor pacing between iterations
    pub pacing: PacingConfig,
    /// Observed-latency budget for the per-request latency check.
    /// This is an assertion, not a cutoff: slow requests still complete.
    pub latency_budget: Duration,
    /// Fixture seeding counts
    pub seed: SeedConfig,
    /// Virtual-user ramp profile, executed in order
    pub ramp: Vec<RampStage>,
    /// Pass/fail bounds evaluated at run end
    pub thresholds: Thresholds,
}

/// Pause applied after every iteration: `base` plus up to `jitter` extra
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub base: Duration,
    pub jitter: Duration,
}

/// How much fixture data setup creates
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Number of teams to create
    pub teams: usize,
    /// Members per team
    pub members_per_team: usize,
    /// Seed pull requests, authored round-robin over collected users
    pub pull_requests: usize,
}

/// One stage of the ramp: actor count moves linearly from the previous
/// stage's target to `target` over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampStage {
    pub duration: Duration,
    pub target: usize,
}

/// Aggregate bounds the run is judged against
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// p95 of observed request latencies must stay below this
    pub p95_latency: Duration,
    /// Fraction of requests that failed at the transport level
    pub max_http_failure_rate: f64,
    /// Fraction of recorded checks that failed
    pub max_check_failure_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            pacing: PacingConfig::default(),
            latency_budget: Duration::from_millis(300),
            seed: SeedConfig::default(),
            ramp: default_ramp(),
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            jitter: Duration::from_millis(100),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            teams: 5,
            members_per_team: 10,
            pull_requests: 10,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            p95_latency: Duration::from_millis(300),
            max_http_failure_rate: 0.001,
            max_check_failure_rate: 0.001,
        }
    }
}

/// Standard ramp: 0 -> 5 over 30s, hold 5 for 3m30s, 5 -> 8 over 30s,
/// 8 -> 0 over 30s (graceful drain)
fn default_ramp() -> Vec<RampStage> {
    vec![
        RampStage {
            duration: Duration::from_secs(30),
            target: 5,
        },
        RampStage {
            duration: Duration::from_secs(210),
            target: 5,
        },
        RampStage {
            duration: Duration::from_secs(30),
            target: 8,
        },
        RampStage {
            duration: Duration::from_secs(30),
            target: 0,
        },
    ]
}

/// Parse a ramp profile of the form `"30:5,210:5,30:8,30:0"`
/// (seconds:actors pairs, executed in order)
pub fn parse_ramp_profile(input: &str) -> Result<Vec<RampStage>, ConfigError> {
    let mut stages = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        let (secs, target) = part
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidStage(part.to_string()))?;
        let secs: u64 = secs
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidStage(part.to_string()))?;
        let target: usize = target
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidStage(part.to_string()))?;
        stages.push(RampStage {
            duration: Duration::from_secs(secs),
            target,
        });
    }
    if stages.is_empty() {
        return Err(ConfigError::InvalidStage(input.to_string()));
    }
    Ok(stages)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("BASE_URL")
            && !url.is_empty()
        {
            config.base_url = url;
        }
        if let Ok(val) = env::var("PACE_BASE_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.pacing.base = Duration::from_millis(ms);
        }
        if let Ok(val) = env::var("PACE_JITTER_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.pacing.jitter = Duration::from_millis(ms);
        }
        if let Ok(val) = env::var("LATENCY_BUDGET_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.latency_budget = Duration::from_millis(ms);
        }
        if let Ok(val) = env::var("SEED_TEAMS")
            && let Ok(n) = val.parse()
        {
            config.seed.teams = n;
        }
        if let Ok(val) = env::var("SEED_MEMBERS_PER_TEAM")
            && let Ok(n) = val.parse()
        {
            config.seed.members_per_team = n;
        }
        if let Ok(val) = env::var("SEED_PULL_REQUESTS")
            && let Ok(n) = val.parse()
        {
            config.seed.pull_requests = n;
        }
        if let Ok(val) = env::var("RAMP_PROFILE") {
            match parse_ramp_profile(&val) {
                Ok(stages) => config.ramp = stages,
                Err(e) => warn!("ignoring RAMP_PROFILE: {}", e),
            }
        }
        if let Ok(val) = env::var("P95_BUDGET_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.thresholds.p95_latency = Duration::from_millis(ms);
        }
        if let Ok(val) = env::var("MAX_HTTP_FAILURE_RATE")
            && let Ok(rate) = val.parse()
        {
            config.thresholds.max_http_failure_rate = rate;
        }
        if let Ok(val) = env::var("MAX_CHECK_FAILURE_RATE")
            && let Ok(rate) = val.parse()
        {
            config.thresholds.max_check_failure_rate = rate;
        }

        config
    }

    /// Total wall-clock duration of the ramp profile
    pub fn ramp_duration(&self) -> Duration {
        self.ramp.iter().map(|s| s.duration).sum()
    }

    /// Highest actor count reached during the ramp
    pub fn peak_actors(&self) -> usize {
        self.ramp.iter().map(|s| s.target).max().unwrap_or(0)
    }
}
