//! HTTP client for the poll service

pub mod utils;

use anyhow::{anyhow, Result};
use poll_service::{
    auth_middleware::METRICS_TOKEN_HEADER,
    types::{
        CreatePollRequest, PollList, PollStatsResponse, PollView, TallyResponse, VoteRequest,
        VoteResponse,
    },
};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub struct PollClient {
    http: Client,
    base_url: Url,
}

impl PollClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// The base url with `segments` appended, each one percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base url {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn list_polls(&self, created_by: Option<&str>) -> Result<PollList> {
        let mut req = self.http.get(self.endpoint(&["polls"])?);
        if let Some(created_by) = created_by {
            req = req.query(&[("createdBy", created_by)]);
        }
        send(req).await
    }

    pub async fn summary(&self) -> Result<PollStatsResponse> {
        send(self.http.get(self.endpoint(&["polls", "stats"])?)).await
    }

    pub async fn get_poll(&self, poll_id: &str, user_id: Option<&str>) -> Result<PollView> {
        let mut req = self.http.get(self.endpoint(&["polls", poll_id])?);
        if let Some(user_id) = user_id {
            req = req.query(&[("userId", user_id)]);
        }
        send(req).await
    }

    pub async fn create_poll(&self, poll: &CreatePollRequest) -> Result<PollView> {
        send(self.http.post(self.endpoint(&["polls"])?).json(poll)).await
    }

    pub async fn vote(&self, poll_id: &str, vote: &VoteRequest) -> Result<VoteResponse> {
        let url = self.endpoint(&["polls", poll_id, "vote"])?;
        send(self.http.post(url).json(vote)).await
    }

    pub async fn tally(&self, poll_id: &str) -> Result<TallyResponse> {
        send(self.http.get(self.endpoint(&["polls", poll_id, "vote"])?)).await
    }

    pub async fn close_poll(&self, poll_id: &str) -> Result<PollView> {
        send(self.http.post(self.endpoint(&["polls", poll_id, "close"])?)).await
    }

    pub async fn stats(&self, token: &str) -> Result<Value> {
        send(
            self.http
                .get(self.endpoint(&["admin", "stats"])?)
                .header(METRICS_TOKEN_HEADER, token),
        )
        .await
    }
}

/// Send a request and decode a JSON body, turning non-2xx responses into
/// errors carrying the server's message.
async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("{} ({})", error_message(&body), status))
}

/// The `error` field of a JSON error body, or the raw body
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
