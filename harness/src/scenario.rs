//! Weighted scenario selection
//!
//! The weight table is data, not branching code: an ordered list of
//! (cumulative upper bound, scenario) pairs dispatched on a single uniform
//! draw in [0, 1).

use thiserror::Error;

/// One named operation the harness can execute during an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scenario {
    CreatePr,
    GetTeam,
    SetActive,
    GetReviews,
    MergePr,
    GetStats,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::CreatePr,
        Scenario::GetTeam,
        Scenario::SetActive,
        Scenario::GetReviews,
        Scenario::MergePr,
        Scenario::GetStats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::CreatePr => "create-pr",
            Scenario::GetTeam => "get-team",
            Scenario::SetActive => "set-active",
            Scenario::GetReviews => "get-reviews",
            Scenario::MergePr => "merge-pr",
            Scenario::GetStats => "get-stats",
        }
    }

    /// Name of the per-call success check recorded for this scenario
    pub fn check_name(&self) -> &'static str {
        match self {
            Scenario::CreatePr => "PR created",
            Scenario::GetTeam => "team retrieved",
            Scenario::SetActive => "user updated",
            Scenario::GetReviews => "reviews retrieved",
            Scenario::MergePr => "merge successful",
            Scenario::GetStats => "stats retrieved",
        }
    }
}

/// Standard scenario mix; weights sum to 1.0
pub const DEFAULT_WEIGHTS: [(Scenario, f64); 6] = [
    (Scenario::CreatePr, 0.30),
    (Scenario::GetTeam, 0.20),
    (Scenario::SetActive, 0.15),
    (Scenario::GetReviews, 0.15),
    (Scenario::MergePr, 0.10),
    (Scenario::GetStats, 0.10),
];

#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("scenario weights sum to {0}, expected 1.0")]
    BadSum(f64),

    #[error("weight for {0} must be positive, got {1}")]
    NonPositive(&'static str, f64),

    #[error("weight table is empty")]
    Empty,
}

/// Cumulative weight table: the first entry whose upper bound exceeds the
/// draw wins
#[derive(Debug, Clone)]
pub struct WeightTable {
    bounds: Vec<(f64, Scenario)>,
}

impl WeightTable {
    /// Build a table from (scenario, weight) pairs, validating that weights
    /// are positive and sum to 1.0
    pub fn new(weights: &[(Scenario, f64)]) -> Result<Self, WeightError> {
        if weights.is_empty() {
            return Err(WeightError::Empty);
        }
        let mut bounds = Vec::with_capacity(weights.len());
        let mut cumulative = 0.0;
        for (scenario, weight) in weights {
            if *weight <= 0.0 {
                return Err(WeightError::NonPositive(scenario.name(), *weight));
            }
            cumulative += weight;
            bounds.push((cumulative, *scenario));
        }
        if (cumulative - 1.0).abs() > 1e-9 {
            return Err(WeightError::BadSum(cumulative));
        }
        // Pin the last bound so float accumulation can never leave a gap at 1.0
        if let Some(last) = bounds.last_mut() {
            last.0 = 1.0;
        }
        Ok(Self { bounds })
    }

    /// The standard mix from [`DEFAULT_WEIGHTS`]
    pub fn standard() -> Self {
        match Self::new(&DEFAULT_WEIGHTS) {
            Ok(table) => table,
            // DEFAULT_WEIGHTS is positive and sums to 1.0
            Err(_) => unreachable!(),
        }
    }

    /// Select the scenario for a uniform draw in [0, 1)
    pub fn pick(&self, draw: f64) -> Scenario {
        self.bounds
            .iter()
            .find(|(upper, _)| draw < *upper)
            .map(|(_, scenario)| *scenario)
            // draw >= 1.0 cannot happen with a uniform [0,1) source; clamp anyway
            .unwrap_or(self.bounds[self.bounds.len() - 1].1)
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::standard()
    }
}
