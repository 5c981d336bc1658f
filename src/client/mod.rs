use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::core::ScorecardPayload;

/// Sentinel bearer token sent when demo mode runs without a signed-in
/// session.
pub const DEMO_TOKEN: &str = "dummy-token";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session expired; sign in again to load the scorecard")]
    SessionExpired,
    #[error("scorecard request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("scorecard request returned HTTP {0}")]
    Status(StatusCode),
}

/// How the scorecard request authenticates: a session access token, or the
/// demo sentinel when no session exists but demo mode is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAuth {
    Token(String),
    Demo,
}

impl SessionAuth {
    pub fn resolve(access_token: Option<String>, demo_mode: bool) -> Result<Self, ClientError> {
        match access_token {
            Some(token) if !token.is_empty() => Ok(Self::Token(token)),
            _ if demo_mode => Ok(Self::Demo),
            _ => Err(ClientError::SessionExpired),
        }
    }

    pub fn bearer_token(&self) -> &str {
        match self {
            Self::Token(token) => token,
            Self::Demo => DEMO_TOKEN,
        }
    }
}

/// Fetches scorecard payloads from the property service.
#[derive(Debug, Clone)]
pub struct ScorecardClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScorecardClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn endpoint(&self, property_id: &str) -> String {
        format!("{}/api/properties/{property_id}/scorecard", self.base_url)
    }

    pub async fn fetch_scorecard(
        &self,
        property_id: &str,
        auth: &SessionAuth,
    ) -> Result<ScorecardPayload, ClientError> {
        let endpoint = self.endpoint(property_id);
        debug!("fetching scorecard from {endpoint}");

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(auth.bearer_token())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let body = response.json::<serde_json::Value>().await?;
        Ok(ScorecardPayload::from_value(body))
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
