//! Types for HTTP requests and responses

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::PollSummary;
use crate::store::{Poll, Tally, VoteRecord};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
    pub voted_options: Vec<String>,
    /// Selections accepted in this call
    pub total_votes: usize,
    pub poll_total_votes: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub poll_id: String,
    pub votes: BTreeMap<String, u64>,
    pub total_votes: u64,
}

impl From<Tally> for TallyResponse {
    fn from(tally: Tally) -> Self {
        Self {
            poll_id: tally.poll_id,
            votes: tally.votes,
            total_votes: tally.total_votes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub options: Vec<String>,
    #[serde(default)]
    pub allow_multiple_votes: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollListQuery {
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollStatsResponse {
    pub total_polls: u64,
    pub active_polls: u64,
    pub total_votes: u64,
}

impl From<PollSummary> for PollStatsResponse {
    fn from(summary: PollSummary) -> Self {
        Self {
            total_polls: summary.total_polls,
            active_polls: summary.active_polls,
            total_votes: summary.total_votes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub votes: u64,
}

/// A poll as the presentation layer sees it, counts included
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub options: Vec<OptionView>,
    pub total_votes: u64,
    pub created_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_voted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_votes: Option<Vec<String>>,
}

impl PollView {
    pub fn new(poll: Poll, tally: &Tally, now: DateTime<Utc>) -> Self {
        let is_active = poll.is_open(now);
        Self {
            options: poll
                .options
                .into_iter()
                .map(|option| OptionView {
                    votes: tally.count(&option.id),
                    id: option.id,
                    text: option.text,
                })
                .collect(),
            total_votes: tally.total_votes,
            id: poll.id,
            title: poll.title,
            description: poll.description,
            created_at: poll.created_at,
            ends_at: poll.ends_at,
            is_active,
            allow_multiple_votes: poll.allow_multiple_votes,
            created_by: poll.created_by,
            has_voted: None,
            user_votes: None,
        }
    }

    /// Attach the caller's own vote state
    pub fn with_voter(mut self, record: Option<VoteRecord>) -> Self {
        self.has_voted = Some(record.is_some());
        self.user_votes = Some(record.map(|r| r.option_ids).unwrap_or_default());
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollList {
    pub polls: Vec<PollView>,
}
