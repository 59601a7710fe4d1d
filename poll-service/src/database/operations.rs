use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use super::sql::*;
use super::Database;
use crate::store::{Poll, PollCatalog, PollOption, StoreError, Tally, VoteRecord, VoteStore};

fn poll_from_row(row: &SqliteRow, options: Vec<PollOption>) -> Result<Poll, sqlx::Error> {
    Ok(Poll {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        options,
        is_active: row.try_get("is_active")?,
        allow_multiple_votes: row.try_get("allow_multiple_votes")?,
        ends_at: row.try_get("ends_at")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn option_from_row(row: &SqliteRow) -> Result<PollOption, sqlx::Error> {
    Ok(PollOption {
        id: row.try_get("option_id")?,
        text: row.try_get("text")?,
    })
}

fn vote_record_from_row(row: &SqliteRow) -> Result<VoteRecord, StoreError> {
    let option_ids_json: String = row.try_get("option_ids")?;
    let option_ids = serde_json::from_str(&option_ids_json)
        .map_err(|e| StoreError::Unavailable(format!("corrupt vote record: {}", e)))?;

    Ok(VoteRecord {
        poll_id: row.try_get("poll_id")?,
        user_id: row.try_get("user_id")?,
        option_ids,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl PollCatalog for Database {
    async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError> {
        let Some(row) = sqlx::query(SELECT_POLL_SQL)
            .bind(poll_id)
            .fetch_optional(self.pool())
            .await?
        else {
            return Ok(None);
        };

        let options = sqlx::query(SELECT_POLL_OPTIONS_SQL)
            .bind(poll_id)
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(option_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(poll_from_row(&row, options)?))
    }

    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let mut options_by_poll: HashMap<String, Vec<PollOption>> = HashMap::new();
        for row in sqlx::query(SELECT_ALL_POLL_OPTIONS_SQL)
            .fetch_all(self.pool())
            .await?
        {
            let poll_id: String = row.try_get("poll_id")?;
            options_by_poll
                .entry(poll_id)
                .or_default()
                .push(option_from_row(&row)?);
        }

        let rows = sqlx::query(SELECT_POLLS_SQL).fetch_all(self.pool()).await?;
        let mut polls = Vec::with_capacity(rows.len());
        for row in rows {
            let poll_id: String = row.try_get("id")?;
            let options = options_by_poll.remove(&poll_id).unwrap_or_default();
            polls.push(poll_from_row(&row, options)?);
        }

        Ok(polls)
    }

    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        debug!("Inserting poll {} with {} options", poll.id, poll.options.len());

        let mut tx = self.pool().begin().await?;

        sqlx::query(INSERT_POLL_SQL)
            .bind(&poll.id)
            .bind(&poll.title)
            .bind(&poll.description)
            .bind(poll.is_active)
            .bind(poll.allow_multiple_votes)
            .bind(poll.ends_at)
            .bind(&poll.created_by)
            .bind(poll.created_at)
            .execute(&mut *tx)
            .await?;

        for (position, option) in poll.options.iter().enumerate() {
            sqlx::query(INSERT_POLL_OPTION_SQL)
                .bind(&poll.id)
                .bind(&option.id)
                .bind(position as i64)
                .bind(&option.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_active(&self, poll_id: &str, is_active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query(UPDATE_POLL_ACTIVE_SQL)
            .bind(is_active)
            .bind(poll_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VoteStore for Database {
    async fn record_vote(&self, record: &VoteRecord) -> Result<u64, StoreError> {
        debug!(
            "Recording vote on poll {} for {} option(s)",
            record.poll_id,
            record.option_ids.len()
        );

        let option_ids_json = serde_json::to_string(&record.option_ids)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // The record insert is the first write, so the transaction takes the
        // write lock before any counter moves and a racing duplicate fails on
        // the primary key.
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(INSERT_VOTE_RECORD_SQL)
            .bind(&record.poll_id)
            .bind(&record.user_id)
            .bind(option_ids_json)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(StoreError::AlreadyVoted);
            }
            Err(e) => return Err(e.into()),
        }

        for option_id in &record.option_ids {
            sqlx::query(INCREMENT_OPTION_TALLY_SQL)
                .bind(&record.poll_id)
                .bind(option_id)
                .execute(&mut *tx)
                .await?;
        }

        let total: i64 = sqlx::query_scalar(SELECT_POLL_TOTAL_SQL)
            .bind(&record.poll_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(total.max(0) as u64)
    }

    async fn tally(&self, poll_id: &str) -> Result<Tally, StoreError> {
        let rows = sqlx::query(SELECT_TALLY_SQL)
            .bind(poll_id)
            .fetch_all(self.pool())
            .await?;

        let mut tally = Tally::empty(poll_id);
        for row in rows {
            let option_id: String = row.try_get("option_id")?;
            let votes: i64 = row.try_get("votes")?;
            let votes = votes.max(0) as u64;
            tally.total_votes += votes;
            tally.votes.insert(option_id, votes);
        }

        Ok(tally)
    }

    async fn vote_record(
        &self,
        poll_id: &str,
        user_id: &str,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let row = sqlx::query(SELECT_VOTE_RECORD_SQL)
            .bind(poll_id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(vote_record_from_row).transpose()
    }
}
