use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

use crate::config::{Config, StorageBackend};
use crate::database::constants::MEMORY_DB_PATH;
use crate::error::PollError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum VoteOutcome {
    Success,
    InvalidInput,
    NotFound,
    PollClosed,
    Conflict,
    Transient,
}

impl VoteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOutcome::Success => "success",
            VoteOutcome::InvalidInput => "invalid_input",
            VoteOutcome::NotFound => "not_found",
            VoteOutcome::PollClosed => "poll_closed",
            VoteOutcome::Conflict => "conflict",
            VoteOutcome::Transient => "transient",
        }
    }
}

impl From<&PollError> for VoteOutcome {
    fn from(e: &PollError) -> Self {
        match e {
            PollError::InvalidInput(_) | PollError::PayloadTooLarge(_) => {
                VoteOutcome::InvalidInput
            }
            PollError::NotFound(_) => VoteOutcome::NotFound,
            PollError::PollClosed(_) => VoteOutcome::PollClosed,
            PollError::Conflict => VoteOutcome::Conflict,
            PollError::Transient(_) => VoteOutcome::Transient,
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    vote_total: HashMap<VoteOutcome, u64>,
    polls_created_total: u64,
}

static METRICS: OnceCell<Mutex<Metrics>> = OnceCell::new();

fn get() -> &'static Mutex<Metrics> {
    METRICS.get_or_init(|| Mutex::new(Metrics::default()))
}

pub fn record_vote_outcome(outcome: VoteOutcome) {
    if let Ok(mut m) = get().lock() {
        *m.vote_total.entry(outcome).or_insert(0) += 1;
    }
}

pub fn record_poll_created() {
    if let Ok(mut m) = get().lock() {
        m.polls_created_total += 1;
    }
}

pub fn snapshot_as_json(config: &Config) -> serde_json::Value {
    use serde_json::json;

    let (votes, polls_created) = match get().lock() {
        Ok(m) => {
            let mut votes: Vec<(VoteOutcome, u64)> =
                m.vote_total.iter().map(|(k, v)| (*k, *v)).collect();
            votes.sort_by_key(|(outcome, _)| outcome.as_str());
            (votes, m.polls_created_total)
        }
        Err(_) => (Vec::new(), 0),
    };

    let votes: Vec<serde_json::Value> = votes
        .into_iter()
        .map(|(outcome, count)| json!({ "outcome": outcome.as_str(), "count": count }))
        .collect();

    let storage = match config.storage {
        StorageBackend::Memory => json!({ "backend": "memory" }),
        StorageBackend::Sqlite => {
            let db_bytes = db_file_size(&config.db_path);
            json!({
                "backend": "sqlite",
                "db_path": config.db_path,
                "db_size_mb": db_bytes.map(|b| round2(bytes_to_mb(b))),
                "free_storage_mb": filesystem_free_mb(&config.db_path),
            })
        }
    };

    json!({
        "vote_total": votes,
        "polls_created_total": polls_created,
        "storage": storage,
    })
}

fn db_file_size(db_path: &str) -> Option<u64> {
    if db_path == MEMORY_DB_PATH {
        return None;
    }
    std::fs::metadata(db_path)
        .ok()
        .and_then(|m| if m.is_file() { Some(m.len()) } else { None })
}

fn bytes_to_mb(bytes: u64) -> f64 {
    let mb = 1024.0 * 1024.0;
    (bytes as f64) / mb
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn filesystem_free_mb(db_path: &str) -> Option<f64> {
    use sysinfo::Disks;

    let path = std::path::Path::new(db_path).canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| round2(bytes_to_mb(d.available_space())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_outcomes() {
        record_vote_outcome(VoteOutcome::Conflict);
        record_vote_outcome(VoteOutcome::from(&PollError::Conflict));
        record_poll_created();

        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        let snapshot = snapshot_as_json(&config);

        let conflicts = snapshot["vote_total"]
            .as_array()
            .unwrap()
            .iter()
            .find(|v| v["outcome"] == "conflict")
            .unwrap();
        assert!(conflicts["count"].as_u64().unwrap() >= 2);
        assert!(snapshot["polls_created_total"].as_u64().unwrap() >= 1);
        assert_eq!(snapshot["storage"]["backend"], "memory");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(bytes_to_mb(1024 * 1024)), 1.0);
    }
}
