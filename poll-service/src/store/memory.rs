//! In-memory catalog and vote store

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use super::{Poll, PollCatalog, StoreError, Tally, VoteRecord, VoteStore};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// Poll catalog backed by a process-local map
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    polls: Arc<RwLock<HashMap<String, Poll>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollCatalog for MemoryCatalog {
    async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError> {
        let polls = self.polls.read().map_err(poisoned)?;
        Ok(polls.get(poll_id).cloned())
    }

    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let polls = self.polls.read().map_err(poisoned)?;
        let mut list: Vec<Poll> = polls.values().cloned().collect();
        list.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(list)
    }

    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let mut polls = self.polls.write().map_err(poisoned)?;
        polls.insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    async fn set_active(&self, poll_id: &str, is_active: bool) -> Result<bool, StoreError> {
        let mut polls = self.polls.write().map_err(poisoned)?;
        match polls.get_mut(poll_id) {
            Some(poll) => {
                poll.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Votes for a single poll. Records and counters change together under the
/// shard lock.
#[derive(Default)]
struct PollShard {
    records: HashMap<String, VoteRecord>,
    counts: HashMap<String, u64>,
    total: u64,
}

/// Vote store sharded per poll.
///
/// The index lock is only held long enough to find or create a shard, so
/// votes on different polls never wait on each other.
#[derive(Clone, Default)]
pub struct MemoryVoteStore {
    shards: Arc<RwLock<HashMap<String, Arc<Mutex<PollShard>>>>>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, poll_id: &str) -> Result<Option<Arc<Mutex<PollShard>>>, StoreError> {
        let shards = self.shards.read().map_err(poisoned)?;
        Ok(shards.get(poll_id).cloned())
    }

    fn shard_or_insert(&self, poll_id: &str) -> Result<Arc<Mutex<PollShard>>, StoreError> {
        if let Some(shard) = self.shard(poll_id)? {
            return Ok(shard);
        }
        let mut shards = self.shards.write().map_err(poisoned)?;
        Ok(shards.entry(poll_id.to_string()).or_default().clone())
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn record_vote(&self, record: &VoteRecord) -> Result<u64, StoreError> {
        let shard = self.shard_or_insert(&record.poll_id)?;
        let mut shard = shard.lock().map_err(poisoned)?;

        if shard.records.contains_key(&record.user_id) {
            return Err(StoreError::AlreadyVoted);
        }

        for option_id in &record.option_ids {
            *shard.counts.entry(option_id.clone()).or_insert(0) += 1;
        }
        shard.total += record.option_ids.len() as u64;
        shard.records.insert(record.user_id.clone(), record.clone());

        Ok(shard.total)
    }

    async fn tally(&self, poll_id: &str) -> Result<Tally, StoreError> {
        let Some(shard) = self.shard(poll_id)? else {
            return Ok(Tally::empty(poll_id));
        };
        let shard = shard.lock().map_err(poisoned)?;

        Ok(Tally {
            poll_id: poll_id.to_string(),
            votes: shard.counts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            total_votes: shard.total,
        })
    }

    async fn vote_record(
        &self,
        poll_id: &str,
        user_id: &str,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let Some(shard) = self.shard(poll_id)? else {
            return Ok(None);
        };
        let shard = shard.lock().map_err(poisoned)?;
        Ok(shard.records.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(poll_id: &str, user_id: &str, options: &[&str]) -> VoteRecord {
        VoteRecord {
            poll_id: poll_id.to_string(),
            user_id: user_id.to_string(),
            option_ids: options.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_vote_increments_counts() {
        let store = MemoryVoteStore::new();
        assert_eq!(store.record_vote(&record("p1", "u1", &["a", "b"])).await.unwrap(), 2);
        assert_eq!(store.record_vote(&record("p1", "u2", &["a"])).await.unwrap(), 3);

        let tally = store.tally("p1").await.unwrap();
        assert_eq!(tally.count("a"), 2);
        assert_eq!(tally.count("b"), 1);
        assert_eq!(tally.total_votes, 3);
    }

    #[tokio::test]
    async fn test_second_record_for_same_user_is_rejected() {
        let store = MemoryVoteStore::new();
        store
            .record_vote(&record("p1", "u1", &["a"]))
            .await
            .unwrap();

        let err = store
            .record_vote(&record("p1", "u1", &["b"]))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::AlreadyVoted);

        let tally = store.tally("p1").await.unwrap();
        assert_eq!(tally.count("b"), 0);
        assert_eq!(tally.total_votes, 1);
        let stored = store.vote_record("p1", "u1").await.unwrap().unwrap();
        assert_eq!(stored.option_ids, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_same_user_may_vote_on_different_polls() {
        let store = MemoryVoteStore::new();
        store
            .record_vote(&record("p1", "u1", &["a"]))
            .await
            .unwrap();
        store
            .record_vote(&record("p2", "u1", &["a"]))
            .await
            .unwrap();

        assert_eq!(store.tally("p1").await.unwrap().total_votes, 1);
        assert_eq!(store.tally("p2").await.unwrap().total_votes, 1);
    }

    #[tokio::test]
    async fn test_unknown_poll_has_empty_tally() {
        let store = MemoryVoteStore::new();
        let tally = store.tally("nope").await.unwrap();
        assert!(tally.votes.is_empty());
        assert_eq!(tally.total_votes, 0);
        assert!(store.vote_record("nope", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_lists_newest_first() {
        let catalog = MemoryCatalog::new();
        let now = Utc::now();
        for (id, age) in [("old", 10), ("new", 1), ("mid", 5)] {
            catalog
                .insert_poll(&Poll {
                    id: id.to_string(),
                    title: id.to_string(),
                    description: String::new(),
                    options: vec![],
                    is_active: true,
                    allow_multiple_votes: false,
                    ends_at: None,
                    created_by: None,
                    created_at: now - Duration::minutes(age),
                })
                .await
                .unwrap();
        }

        let ids: Vec<String> = catalog
            .list_polls()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        assert!(catalog.set_active("mid", false).await.unwrap());
        assert!(!catalog.set_active("missing", false).await.unwrap());
        assert!(!catalog.get_poll("mid").await.unwrap().unwrap().is_active);
    }
}
