//! HTTP client for communicating with tallyd

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tally_common::schemas::{
    BadgesResponse, HealthResponse, LeaderboardResponse, PointsResponse, StatsResponse,
    StreakStatusResponse, ToggleVisibilityRequest, ToggleVisibilityResponse, USER_HEADER,
};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for communicating with tallyd
pub struct TallyClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Option<Uuid>,
}

impl TallyClient {
    pub fn new(base_url: &str, user: Option<&str>) -> Result<Self> {
        let user_id = match user {
            Some(raw) => Some(
                Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid user id {:?}", raw))?,
            ),
            None => None,
        };

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
        })
    }

    fn require_user(&self) -> Result<()> {
        if self.user_id.is_none() {
            bail!("No user set. Pass --user <uuid> or set TALLY_USER.");
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url);
        if let Some(user_id) = &self.user_id {
            request = request.header(USER_HEADER, user_id.to_string());
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to connect to tallyd at {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Request failed ({}): {}", status, text.trim());
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(user_id) = &self.user_id {
            request = request.header(USER_HEADER, user_id.to_string());
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to connect to tallyd at {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Request failed ({}): {}", status, text.trim());
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Daemon health and version
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/v1/health").await
    }

    /// Aggregated stats for the acting user
    pub async fn stats(&self) -> Result<StatsResponse> {
        self.require_user()?;
        self.get_json("/v1/stats").await
    }

    /// Read-only streak view
    pub async fn streak(&self) -> Result<StreakStatusResponse> {
        self.require_user()?;
        self.get_json("/v1/streak").await
    }

    /// Points ledger for the acting user
    pub async fn points(&self) -> Result<PointsResponse> {
        self.require_user()?;
        self.get_json("/v1/points").await
    }

    /// Badges the acting user has earned
    pub async fn badges(&self) -> Result<BadgesResponse> {
        self.require_user()?;
        self.get_json("/v1/badges").await
    }

    /// Current leaderboard
    pub async fn leaderboard(&self) -> Result<LeaderboardResponse> {
        self.require_user()?;
        self.get_json("/v1/leaderboard").await
    }

    /// Change the acting user's leaderboard visibility
    pub async fn toggle_visibility(&self, is_public: bool) -> Result<ToggleVisibilityResponse> {
        self.require_user()?;
        self.post_json(
            "/v1/leaderboard/toggle",
            &ToggleVisibilityRequest { is_public },
        )
        .await
    }
}
