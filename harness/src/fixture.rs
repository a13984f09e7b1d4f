//! Run identity and fixture data
//!
//! Every entity the harness creates embeds the [`RunId`], so concurrent runs
//! and repeated runs against the same target never collide on identifiers.

use std::fmt;
use uuid::Uuid;

/// Prefixes used for the seeded teams, in creation order
pub const TEAM_PREFIXES: [&str; 5] = ["backend", "frontend", "devops", "qa", "mobile"];

/// Identity of one harness run: epoch milliseconds captured at process start.
/// Passed explicitly to every naming call; never read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(u64);

impl RunId {
    /// Capture the current time as the run identity
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis() as u64)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Name for the `idx`-th seeded team
    pub fn team_name(&self, idx: usize) -> String {
        format!("{}_{}", TEAM_PREFIXES[idx % TEAM_PREFIXES.len()], self.0)
    }

    /// Id for the `member_idx`-th member of the `team_idx`-th team
    pub fn user_id(&self, team_idx: usize, member_idx: usize) -> String {
        format!("user_{}_{}_{}", self.0, team_idx, member_idx)
    }

    /// Id for the `n`-th pull request seeded during setup
    pub fn seed_pr_id(&self, n: usize) -> String {
        format!("pr_setup_{}_{}", self.0, n)
    }

    /// Fresh pull-request id for the create-PR scenario: run identity plus
    /// a random suffix, unique across concurrent actors
    pub fn fresh_pr_id(&self) -> String {
        format!("pr_{}_{}", self.0, Uuid::new_v4().simple())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable output of setup, shared read-only across all concurrent actors.
/// Entities created during iterations are never appended back here.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub run_id: RunId,
    /// Ids of all members constructed during team seeding
    pub user_ids: Vec<String>,
    /// Ids of seed pull requests whose creation returned 201
    pub pr_ids: Vec<String>,
    /// Names of all teams setup attempted to create
    pub team_names: Vec<String>,
}

impl FixtureSet {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            user_ids: Vec::new(),
            pr_ids: Vec::new(),
            team_names: Vec::new(),
        }
    }
}
