//! Storage abstraction for polls and votes.
//!
//! The [`PollCatalog`] owns poll definitions, the [`VoteStore`] owns vote
//! records and option counters. Both are injected into the ledger so the
//! backing implementation can be swapped without touching vote logic.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{MemoryCatalog, MemoryVoteStore};

/// A single selectable choice within a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
}

/// Poll definition as held by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: String,
    pub options: Vec<PollOption>,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Whether the poll accepts votes at `now`
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at.map_or(true, |ends_at| now < ends_at)
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|option| option.id == option_id)
    }
}

/// The record that a user voted on a poll. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub poll_id: String,
    pub user_id: String,
    pub option_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-option vote counts for a poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub poll_id: String,
    pub votes: BTreeMap<String, u64>,
    pub total_votes: u64,
}

impl Tally {
    pub fn empty(poll_id: &str) -> Self {
        Self {
            poll_id: poll_id.to_string(),
            ..Default::default()
        }
    }

    /// Count for an option, zero when it has no votes
    pub fn count(&self, option_id: &str) -> u64 {
        self.votes.get(option_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a vote is already recorded for this user")]
    AlreadyVoted,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Source of poll definitions
#[async_trait]
pub trait PollCatalog: Send + Sync {
    async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError>;

    /// All polls, newest first
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError>;

    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError>;

    /// Set the active flag. Returns false when the poll does not exist.
    async fn set_active(&self, poll_id: &str, is_active: bool) -> Result<bool, StoreError>;
}

/// Vote records and option counters
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Atomically insert `record` and add one to each of its options,
    /// returning the poll total right after the write.
    ///
    /// Fails with [`StoreError::AlreadyVoted`] without changing anything if a
    /// record for the same (poll, user) exists. Concurrent readers observe
    /// either none or all of the increments.
    async fn record_vote(&self, record: &VoteRecord) -> Result<u64, StoreError>;

    /// Counts for options that have received votes
    async fn tally(&self, poll_id: &str) -> Result<Tally, StoreError>;

    async fn vote_record(
        &self,
        poll_id: &str,
        user_id: &str,
    ) -> Result<Option<VoteRecord>, StoreError>;
}
