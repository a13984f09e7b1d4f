//! Common test utilities
//!
//! An in-process stub of the pr-review-manager service, faithful enough for
//! harness semantics: status codes match the real service and state is kept
//! so merge races behave like production (200 on the first merge of a PR,
//! 404 afterwards).

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use prload_harness::Config;
use prload_harness::config::PacingConfig;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct MemberBody {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddTeamBody {
    pub team_name: String,
    pub members: Vec<MemberBody>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePrBody {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetIsActiveBody {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct MergePrBody {
    pub pull_request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStatus {
    Open,
    Merged,
}

/// In-memory state of the stub service
#[derive(Default)]
pub struct StubState {
    pub teams: Mutex<HashMap<String, Vec<MemberBody>>>,
    /// user_id -> is_active
    pub users: Mutex<HashMap<String, bool>>,
    pub prs: Mutex<HashMap<String, PrStatus>>,
    /// Total requests the stub has served (health probes excluded)
    requests_seen: AtomicU64,
    /// When set, every /team/add call fails with a 500
    pub fail_team_add: AtomicBool,
}

impl StubState {
    pub fn requests(&self) -> u64 {
        self.requests_seen.load(Ordering::SeqCst)
    }

    pub fn insert_user(&self, user_id: &str) {
        self.users.lock().unwrap().insert(user_id.to_string(), true);
    }

    pub fn insert_open_pr(&self, pr_id: &str) {
        self.prs
            .lock()
            .unwrap()
            .insert(pr_id.to_string(), PrStatus::Open);
    }

    pub fn merged_pr_count(&self) -> usize {
        self.prs
            .lock()
            .unwrap()
            .values()
            .filter(|s| **s == PrStatus::Merged)
            .count()
    }
}

fn error_body(code: &str, message: &str) -> Json<serde_json::Value> {
    Json(json!({ "error": { "code": code, "message": message } }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn add_team(
    State(state): State<Arc<StubState>>,
    Json(body): Json<AddTeamBody>,
) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    if state.fail_team_add.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("INTERNAL_ERROR", "injected failure"),
        );
    }

    {
        let mut users = state.users.lock().unwrap();
        for member in &body.members {
            users.insert(member.user_id.clone(), member.is_active);
        }
    }
    state
        .teams
        .lock()
        .unwrap()
        .insert(body.team_name.clone(), body.members);

    (
        StatusCode::CREATED,
        Json(json!({ "team": { "team_name": body.team_name } })),
    )
}

async fn get_team(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    let Some(team_name) = params.get("team_name") else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("INVALID_REQUEST", "team_name is required"),
        );
    };
    match state.teams.lock().unwrap().get(team_name) {
        Some(members) => (
            StatusCode::OK,
            Json(json!({ "team_name": team_name, "member_count": members.len() })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            error_body("TEAM_NOT_FOUND", "team not found"),
        ),
    }
}

async fn create_pr(
    State(state): State<Arc<StubState>>,
    Json(body): Json<CreatePrBody>,
) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    if !state.users.lock().unwrap().contains_key(&body.author_id) {
        return (
            StatusCode::NOT_FOUND,
            error_body("USER_NOT_FOUND", "author not found"),
        );
    }
    state
        .prs
        .lock()
        .unwrap()
        .insert(body.pull_request_id.clone(), PrStatus::Open);
    (
        StatusCode::CREATED,
        Json(json!({ "pr": { "pull_request_id": body.pull_request_id } })),
    )
}

async fn merge_pr(
    State(state): State<Arc<StubState>>,
    Json(body): Json<MergePrBody>,
) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    let mut prs = state.prs.lock().unwrap();
    match prs.get_mut(&body.pull_request_id) {
        Some(status @ PrStatus::Open) => {
            *status = PrStatus::Merged;
            (
                StatusCode::OK,
                Json(json!({ "pr": { "pull_request_id": body.pull_request_id } })),
            )
        }
        // Merged or unknown: same answer the real service gives
        _ => (
            StatusCode::NOT_FOUND,
            error_body("PR_NOT_FOUND", "pull request not found or already merged"),
        ),
    }
}

async fn set_is_active(
    State(state): State<Arc<StubState>>,
    Json(body): Json<SetIsActiveBody>,
) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    let mut users = state.users.lock().unwrap();
    match users.get_mut(&body.user_id) {
        Some(active) => {
            *active = body.is_active;
            (
                StatusCode::OK,
                Json(json!({ "user": { "user_id": body.user_id, "is_active": body.is_active } })),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            error_body("USER_NOT_FOUND", "user not found"),
        ),
    }
}

async fn get_reviews(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    let Some(user_id) = params.get("user_id") else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("INVALID_REQUEST", "user_id is required"),
        );
    };
    if !state.users.lock().unwrap().contains_key(user_id) {
        return (
            StatusCode::NOT_FOUND,
            error_body("USER_NOT_FOUND", "user not found"),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "user_id": user_id, "pull_requests": [] })),
    )
}

async fn get_stats(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    let prs = state.prs.lock().unwrap();
    let merged = prs.values().filter(|s| **s == PrStatus::Merged).count();
    (
        StatusCode::OK,
        Json(json!({
            "total_prs": prs.len(),
            "open_prs": prs.len() - merged,
            "merged_prs": merged,
            "reviewer_stats": [],
            "pr_stats": [],
        })),
    )
}

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(get_stats))
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_reviews))
        .route("/pullRequest/create", post(create_pr))
        .route("/pullRequest/merge", post(merge_pr))
        .with_state(state)
}

/// Spawn the stub on an ephemeral port; returns its base URL and state
pub async fn spawn_stub() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

/// Harness config pointed at the stub, with pacing fast enough for tests
/// and a latency budget generous enough to never flake on a loaded CI box
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.base_url = base_url.to_string();
    config.pacing = PacingConfig {
        base: Duration::from_millis(5),
        jitter: Duration::from_millis(2),
    };
    config.latency_budget = Duration::from_secs(5);
    config
}
