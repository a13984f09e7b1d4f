//! Typed HTTP client for the pr-review-manager API
//!
//! Thin wrapper over reqwest that measures per-request latency. The client
//! never retries: a transport failure is surfaced to the caller and recorded
//! as a failed check, not corrected.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from the HTTP layer
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Member record sent in a team creation request
#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct AddTeamRequest {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Serialize)]
pub struct CreatePrRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

#[derive(Debug, Serialize)]
pub struct SetIsActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct MergePrRequest {
    pub pull_request_id: String,
}

/// Status code plus observed latency for one completed HTTP call.
/// Latency covers the full exchange including the response body.
#[derive(Debug, Clone, Copy)]
pub struct Timed {
    pub status: StatusCode,
    pub latency: Duration,
}

/// HTTP client for the service under test
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().pool_max_idle_per_host(32).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the target's health endpoint
    pub async fn health(&self) -> Result<Timed, ClientError> {
        self.timed(self.http.get(format!("{}/health", self.base_url)))
            .await
    }

    pub async fn add_team(&self, req: &AddTeamRequest) -> Result<Timed, ClientError> {
        self.timed(
            self.http
                .post(format!("{}/team/add", self.base_url))
                .json(req),
        )
        .await
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Timed, ClientError> {
        self.timed(
            self.http
                .get(format!("{}/team/get", self.base_url))
                .query(&[("team_name", team_name)]),
        )
        .await
    }

    pub async fn create_pr(&self, req: &CreatePrRequest) -> Result<Timed, ClientError> {
        self.timed(
            self.http
                .post(format!("{}/pullRequest/create", self.base_url))
                .json(req),
        )
        .await
    }

    pub async fn merge_pr(&self, req: &MergePrRequest) -> Result<Timed, ClientError> {
        self.timed(
            self.http
                .post(format!("{}/pullRequest/merge", self.base_url))
                .json(req),
        )
        .await
    }

    pub async fn set_is_active(&self, req: &SetIsActiveRequest) -> Result<Timed, ClientError> {
        self.timed(
            self.http
                .post(format!("{}/users/setIsActive", self.base_url))
                .json(req),
        )
        .await
    }

    pub async fn get_reviews(&self, user_id: &str) -> Result<Timed, ClientError> {
        self.timed(
            self.http
                .get(format!("{}/users/getReview", self.base_url))
                .query(&[("user_id", user_id)]),
        )
        .await
    }

    pub async fn get_stats(&self) -> Result<Timed, ClientError> {
        self.timed(self.http.get(format!("{}/stats", self.base_url)))
            .await
    }

    async fn timed(&self, req: reqwest::RequestBuilder) -> Result<Timed, ClientError> {
        let start = Instant::now();
        let resp = req.send().await?;
        let status = resp.status();
        // Drain the body so the latency sample covers the full exchange
        let _ = resp.bytes().await?;
        Ok(Timed {
            status,
            latency: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_team_request_wire_format() {
        let req = AddTeamRequest {
            team_name: "backend_1".to_string(),
            members: vec![TeamMember {
                user_id: "user_1_0_0".to_string(),
                username: "User 0-0".to_string(),
                is_active: true,
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["team_name"], "backend_1");
        assert_eq!(json["members"][0]["user_id"], "user_1_0_0");
        assert_eq!(json["members"][0]["is_active"], true);
    }

    #[test]
    fn test_create_pr_request_wire_format() {
        let req = CreatePrRequest {
            pull_request_id: "pr_setup_1_0".to_string(),
            pull_request_name: "Setup PR 0".to_string(),
            author_id: "user_1_0_0".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["pull_request_id"], "pr_setup_1_0");
        assert_eq!(json["pull_request_name"], "Setup PR 0");
        assert_eq!(json["author_id"], "user_1_0_0");
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
