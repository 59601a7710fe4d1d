//! Vote ledger: the only writer of voting state.
//!
//! A vote is validated against the poll catalog, then handed to the vote
//! store as one record. The store guarantees at most one record per
//! (poll, user) and applies the option increments together with it, so the
//! ledger itself keeps no locks.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::AnonymousPolicy;
use crate::error::PollError;
use crate::store::{Poll, PollCatalog, StoreError, Tally, VoteRecord, VoteStore};
use crate::utils::is_blank;

/// Identity every anonymous caller shares under [`AnonymousPolicy::Shared`]
pub const ANONYMOUS_USER_ID: &str = "anonymous-user";

/// Who is casting a vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Voter {
    User(String),
    Anonymous { client: Option<String> },
}

impl Voter {
    /// A blank user id counts as anonymous
    pub fn from_request(user_id: Option<String>, client: Option<String>) -> Self {
        match user_id {
            Some(id) if !is_blank(&id) => Voter::User(id),
            _ => Voter::Anonymous { client },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub anonymous: AnonymousPolicy,
    /// Upper bound on catalog lookups and store reads
    pub lookup_timeout: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            anonymous: AnonymousPolicy::Shared,
            lookup_timeout: Duration::from_secs(2),
        }
    }
}

/// Outcome of a successful vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteResult {
    pub poll_id: String,
    pub user_id: String,
    pub voted_options: Vec<String>,
    /// Poll total right after this vote
    pub poll_total: u64,
}

/// Totals across every poll in the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub total_polls: u64,
    /// Polls accepting votes right now
    pub active_polls: u64,
    pub total_votes: u64,
}

#[derive(Clone)]
pub struct VoteLedger {
    catalog: Arc<dyn PollCatalog>,
    store: Arc<dyn VoteStore>,
    settings: LedgerSettings,
}

impl VoteLedger {
    pub fn new(
        catalog: Arc<dyn PollCatalog>,
        store: Arc<dyn VoteStore>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            settings,
        }
    }

    pub async fn submit_vote(
        &self,
        poll_id: &str,
        voter: Voter,
        option_ids: Vec<String>,
    ) -> Result<VoteResult, PollError> {
        self.submit_vote_at(poll_id, voter, option_ids, Utc::now())
            .await
    }

    /// Cast a vote as of `now`.
    ///
    /// Nothing is written unless every check passes; a failed call leaves the
    /// tally and vote records as they were.
    pub async fn submit_vote_at(
        &self,
        poll_id: &str,
        voter: Voter,
        option_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<VoteResult, PollError> {
        check_option_ids(&option_ids)?;
        let user_id = self.resolve_voter(voter)?;

        let poll = self.require_poll(poll_id).await?;
        if !poll.is_open(now) {
            return Err(PollError::PollClosed(poll.id));
        }

        if let Some(unknown) = option_ids.iter().find(|id| !poll.has_option(id)) {
            return Err(PollError::InvalidInput(format!(
                "Unknown option id: {}",
                unknown
            )));
        }
        if !poll.allow_multiple_votes && option_ids.len() != 1 {
            return Err(PollError::invalid(
                "This poll accepts exactly one option per vote",
            ));
        }

        let record = VoteRecord {
            poll_id: poll.id,
            user_id,
            option_ids,
            created_at: now,
        };

        // Not bounded by the lookup timeout: abandoning a write midway would
        // leave the caller unsure whether the vote landed.
        let poll_total = self.store.record_vote(&record).await?;

        Ok(VoteResult {
            poll_id: record.poll_id,
            user_id: record.user_id,
            voted_options: record.option_ids,
            poll_total,
        })
    }

    /// Current counts for every option of the poll, zero for unvoted ones
    pub async fn get_tally(&self, poll_id: &str) -> Result<Tally, PollError> {
        let poll = self.require_poll(poll_id).await?;
        self.tally_for(&poll).await
    }

    /// The record `user_id` left on a poll, if any
    pub async fn vote_record(
        &self,
        poll_id: &str,
        user_id: &str,
    ) -> Result<Option<VoteRecord>, PollError> {
        self.bounded(self.store.vote_record(poll_id, user_id)).await
    }

    pub async fn poll_with_tally(&self, poll_id: &str) -> Result<(Poll, Tally), PollError> {
        let poll = self.require_poll(poll_id).await?;
        let tally = self.tally_for(&poll).await?;
        Ok((poll, tally))
    }

    /// Polls newest first with their tallies, optionally only those
    /// created by `created_by`
    pub async fn list_polls(
        &self,
        created_by: Option<&str>,
    ) -> Result<Vec<(Poll, Tally)>, PollError> {
        let polls = self.bounded(self.catalog.list_polls()).await?;

        let mut listed = Vec::with_capacity(polls.len());
        for poll in polls {
            if created_by.is_some_and(|owner| poll.created_by.as_deref() != Some(owner)) {
                continue;
            }
            let tally = self.tally_for(&poll).await?;
            listed.push((poll, tally));
        }
        Ok(listed)
    }

    pub async fn create_poll(&self, poll: &Poll) -> Result<(), PollError> {
        // Unbounded for the same reason as the vote write.
        self.catalog.insert_poll(poll).await?;
        Ok(())
    }

    /// Stop a poll from accepting votes. Closing twice is harmless.
    pub async fn close_poll(&self, poll_id: &str) -> Result<(Poll, Tally), PollError> {
        if !self.bounded(self.catalog.set_active(poll_id, false)).await? {
            return Err(PollError::NotFound(poll_id.to_string()));
        }
        self.poll_with_tally(poll_id).await
    }

    /// Catalog-wide counts as of `now`
    pub async fn summary(&self, now: DateTime<Utc>) -> Result<PollSummary, PollError> {
        let polls = self.bounded(self.catalog.list_polls()).await?;

        let mut summary = PollSummary {
            total_polls: polls.len() as u64,
            ..Default::default()
        };
        for poll in &polls {
            if poll.is_open(now) {
                summary.active_polls += 1;
            }
            let tally = self.bounded(self.store.tally(&poll.id)).await?;
            summary.total_votes += tally.total_votes;
        }
        Ok(summary)
    }

    async fn tally_for(&self, poll: &Poll) -> Result<Tally, PollError> {
        let mut tally = self.bounded(self.store.tally(&poll.id)).await?;
        for option in &poll.options {
            tally.votes.entry(option.id.clone()).or_insert(0);
        }
        Ok(tally)
    }

    fn resolve_voter(&self, voter: Voter) -> Result<String, PollError> {
        match (voter, self.settings.anonymous) {
            (Voter::User(id), _) => Ok(id),
            (Voter::Anonymous { .. }, AnonymousPolicy::Disabled) => {
                Err(PollError::invalid("userId is required to vote"))
            }
            (
                Voter::Anonymous {
                    client: Some(client),
                },
                AnonymousPolicy::PerClient,
            ) => Ok(format!("anonymous:{}", client)),
            (Voter::Anonymous { .. }, _) => Ok(ANONYMOUS_USER_ID.to_string()),
        }
    }

    async fn require_poll(&self, poll_id: &str) -> Result<Poll, PollError> {
        self.bounded(self.catalog.get_poll(poll_id))
            .await?
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, PollError> {
        match tokio::time::timeout(self.settings.lookup_timeout, fut).await {
            Ok(result) => result.map_err(PollError::from),
            Err(_) => Err(PollError::Transient(format!(
                "lookup timed out after {}ms",
                self.settings.lookup_timeout.as_millis()
            ))),
        }
    }
}

/// Shape checks that need no poll: non-empty, non-blank, no repeats
fn check_option_ids(option_ids: &[String]) -> Result<(), PollError> {
    if option_ids.is_empty() {
        return Err(PollError::invalid("At least one option must be selected"));
    }
    if option_ids.iter().any(|id| is_blank(id)) {
        return Err(PollError::invalid("Invalid option IDs provided"));
    }

    let mut seen = HashSet::with_capacity(option_ids.len());
    if let Some(dup) = option_ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(PollError::InvalidInput(format!(
            "Option id selected more than once: {}",
            dup
        )));
    }

    Ok(())
}
