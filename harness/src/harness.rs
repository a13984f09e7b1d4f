//! Test lifecycle: setup, iteration, teardown
//!
//! The harness is failure-transparent: nothing here retries or corrects a
//! failed request. Setup tolerates partial failure and iterations record
//! failed checks and move on; the aggregate thresholds are the sole judge
//! of target health.

use crate::client::{
    AddTeamRequest, ApiClient, ClientError, CreatePrRequest, MergePrRequest, SetIsActiveRequest,
    TeamMember, Timed,
};
use crate::config::Config;
use crate::fixture::{FixtureSet, RunId};
use crate::metrics::{CheckResult, ErrorRate, HarnessEvent};
use crate::scenario::{Scenario, WeightTable};
use rand::Rng;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Name of the per-request latency check
pub const LATENCY_CHECK: &str = "response time < 300ms";

/// Owns one run's lifecycle. Shared across actors behind an `Arc`; all
/// methods take `&self`.
pub struct Harness {
    config: Config,
    client: ApiClient,
    weights: WeightTable,
    error_rate: Arc<ErrorRate>,
    events: mpsc::Sender<HarnessEvent>,
}

impl Harness {
    pub fn new(config: Config, events: mpsc::Sender<HarnessEvent>) -> Result<Self, ClientError> {
        let client = ApiClient::new(&config.base_url)?;
        Ok(Self {
            config,
            client,
            weights: WeightTable::standard(),
            error_rate: Arc::new(ErrorRate::default()),
            events,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared check failure accumulator
    pub fn error_rate(&self) -> &Arc<ErrorRate> {
        &self.error_rate
    }

    /// Probe the target's health endpoint before the run starts. Setup
    /// proceeds either way: total unavailability shows up in the thresholds.
    pub async fn probe_target(&self) {
        match self.client.health().await {
            Ok(timed) if timed.status == StatusCode::OK => {
                info!("target {} is healthy", self.client.base_url());
            }
            Ok(timed) => {
                warn!(
                    "target {} health probe returned HTTP {}",
                    self.client.base_url(),
                    timed.status
                );
            }
            Err(e) => {
                warn!(
                    "target {} looks unavailable: {}",
                    self.client.base_url(),
                    e
                );
            }
        }
    }

    /// Seed fixture data: teams with members, then pull requests authored
    /// round-robin over the collected user ids. Individual failures are
    /// logged, never fatal.
    pub async fn setup(&self, run_id: RunId) -> FixtureSet {
        let seed = &self.config.seed;
        let mut fixture = FixtureSet::new(run_id);

        info!("starting run {}, creating fresh test data", run_id);

        for team_idx in 0..seed.teams {
            let team_name = run_id.team_name(team_idx);
            let members: Vec<TeamMember> = (0..seed.members_per_team)
                .map(|member_idx| TeamMember {
                    user_id: run_id.user_id(team_idx, member_idx),
                    username: format!("User {}-{}", team_idx, member_idx),
                    is_active: true,
                })
                .collect();

            // Member ids and team names go into the fixture regardless of
            // the call's outcome; a failed creation surfaces later as failed
            // checks against the missing entities
            fixture
                .user_ids
                .extend(members.iter().map(|m| m.user_id.clone()));
            fixture.team_names.push(team_name.clone());

            match self.client.add_team(&AddTeamRequest { team_name: team_name.clone(), members }).await {
                Ok(timed) if timed.status == StatusCode::CREATED => {
                    debug!("created team {}", team_name);
                }
                Ok(timed) => {
                    warn!("failed to create team {}: HTTP {}", team_name, timed.status);
                }
                Err(e) => {
                    warn!("failed to create team {}: {}", team_name, e);
                }
            }
        }

        if fixture.user_ids.is_empty() {
            // Round-robin author selection needs at least one user
            warn!("no seed users collected, skipping pull-request seeding");
        } else {
            for n in 0..seed.pull_requests {
                let pr_id = run_id.seed_pr_id(n);
                let author_id = fixture.user_ids[n % fixture.user_ids.len()].clone();
                let req = CreatePrRequest {
                    pull_request_id: pr_id.clone(),
                    pull_request_name: format!("Setup PR {}", n),
                    author_id,
                };
                match self.client.create_pr(&req).await {
                    Ok(timed) if timed.status == StatusCode::CREATED => {
                        fixture.pr_ids.push(pr_id);
                    }
                    Ok(timed) => {
                        warn!("failed to seed {}: HTTP {}", pr_id, timed.status);
                    }
                    Err(e) => {
                        warn!("failed to seed {}: {}", pr_id, e);
                    }
                }
            }
        }

        info!(
            "setup complete: {} users, {} teams, {} pull requests",
            fixture.user_ids.len(),
            fixture.team_names.len(),
            fixture.pr_ids.len()
        );
        fixture
    }

    /// One actor iteration: select a weighted scenario, execute it, then
    /// pause (base pacing plus uniform jitter) to throttle per-actor rate
    pub async fn iteration<R: Rng>(&self, fixture: &FixtureSet, rng: &mut R) {
        let scenario = self.weights.pick(rng.random::<f64>());
        self.run_scenario(scenario, fixture, rng).await;

        let jitter_ms = self.config.pacing.jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            std::time::Duration::from_millis(rng.random_range(0..jitter_ms))
        } else {
            std::time::Duration::ZERO
        };
        tokio::time::sleep(self.config.pacing.base + jitter).await;
    }

    /// Execute one scenario, recording its success and latency checks
    pub async fn run_scenario<R: Rng>(&self, scenario: Scenario, fixture: &FixtureSet, rng: &mut R) {
        match scenario {
            Scenario::CreatePr => self.create_pr(fixture, rng).await,
            Scenario::GetTeam => self.get_team(fixture, rng).await,
            Scenario::SetActive => self.set_active(fixture, rng).await,
            Scenario::GetReviews => self.get_reviews(fixture, rng).await,
            Scenario::MergePr => self.merge_pr(fixture, rng).await,
            Scenario::GetStats => self.get_stats().await,
        }
    }

    /// Emit the final summary line. No network calls here.
    pub fn teardown(&self, fixture: &FixtureSet) {
        info!(
            "run {} completed: {} pull requests created during setup",
            fixture.run_id,
            fixture.pr_ids.len()
        );
    }

    async fn create_pr<R: Rng>(&self, fixture: &FixtureSet, rng: &mut R) {
        // A degenerate fixture (all team creations failed) still exercises
        // the endpoint; the empty author simply fails the check
        let author_id = pick(rng, &fixture.user_ids).cloned().unwrap_or_default();
        let pr_id = fixture.run_id.fresh_pr_id();
        let req = CreatePrRequest {
            pull_request_name: format!("Test PR {}", pr_id),
            pull_request_id: pr_id,
            author_id,
        };
        let outcome = self.client.create_pr(&req).await;
        self.record(Scenario::CreatePr, outcome, |s| s == StatusCode::CREATED)
            .await;
    }

    async fn get_team<R: Rng>(&self, fixture: &FixtureSet, rng: &mut R) {
        let team_name = pick(rng, &fixture.team_names).cloned().unwrap_or_default();
        let outcome = self.client.get_team(&team_name).await;
        self.record(Scenario::GetTeam, outcome, |s| s == StatusCode::OK)
            .await;
    }

    async fn set_active<R: Rng>(&self, fixture: &FixtureSet, rng: &mut R) {
        let user_id = pick(rng, &fixture.user_ids).cloned().unwrap_or_default();
        let req = SetIsActiveRequest {
            user_id,
            is_active: rng.random_bool(0.5),
        };
        let outcome = self.client.set_is_active(&req).await;
        self.record(Scenario::SetActive, outcome, |s| s == StatusCode::OK)
            .await;
    }

    async fn get_reviews<R: Rng>(&self, fixture: &FixtureSet, rng: &mut R) {
        let user_id = pick(rng, &fixture.user_ids).cloned().unwrap_or_default();
        let outcome = self.client.get_reviews(&user_id).await;
        self.record(Scenario::GetReviews, outcome, |s| s == StatusCode::OK)
            .await;
    }

    async fn merge_pr<R: Rng>(&self, fixture: &FixtureSet, rng: &mut R) {
        // No seeded PRs: nothing to merge, nothing recorded
        let Some(pr_id) = pick(rng, &fixture.pr_ids).cloned() else {
            return;
        };
        let outcome = self
            .client
            .merge_pr(&MergePrRequest {
                pull_request_id: pr_id.clone(),
            })
            .await;

        if let Ok(timed) = &outcome
            && timed.status == StatusCode::NOT_FOUND
        {
            // Concurrent actors race to merge the same fixture PR; 404 is
            // tolerated but logged and counted separately
            debug!("merge of {} returned 404 (already merged)", pr_id);
            let _ = self.events.send(HarnessEvent::MergeRaced).await;
        }

        self.record(Scenario::MergePr, outcome, |s| {
            s == StatusCode::OK || s == StatusCode::NOT_FOUND
        })
        .await;
    }

    async fn get_stats(&self) {
        let outcome = self.client.get_stats().await;
        self.record(Scenario::GetStats, outcome, |s| s == StatusCode::OK)
            .await;
    }

    /// Record exactly one success check and one latency check for a call.
    /// A transport failure fails both.
    async fn record(
        &self,
        scenario: Scenario,
        outcome: Result<Timed, ClientError>,
        passes: impl Fn(StatusCode) -> bool,
    ) {
        match outcome {
            Ok(timed) => {
                let _ = self
                    .events
                    .send(HarnessEvent::Request {
                        scenario,
                        latency: Some(timed.latency),
                        transport_error: false,
                    })
                    .await;
                self.check(scenario.check_name(), passes(timed.status)).await;
                self.check(LATENCY_CHECK, timed.latency < self.config.latency_budget)
                    .await;
            }
            Err(e) => {
                debug!("{} request failed: {}", scenario.name(), e);
                let _ = self
                    .events
                    .send(HarnessEvent::Request {
                        scenario,
                        latency: None,
                        transport_error: true,
                    })
                    .await;
                self.check(scenario.check_name(), false).await;
                self.check(LATENCY_CHECK, false).await;
            }
        }
    }

    async fn check(&self, name: &'static str, passed: bool) {
        self.error_rate.add(!passed);
        let _ = self
            .events
            .send(HarnessEvent::Check(CheckResult { name, passed }))
            .await;
    }
}

/// Uniform random element, `None` on an empty slice
fn pick<'a, R: Rng>(rng: &mut R, items: &'a [String]) -> Option<&'a String> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.random_range(0..items.len())])
    }
}
