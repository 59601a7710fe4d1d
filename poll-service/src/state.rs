//! Shared application state

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, StorageBackend};
use crate::database::Database;
use crate::ledger::{LedgerSettings, VoteLedger};
use crate::store::{MemoryCatalog, MemoryVoteStore, PollCatalog, VoteStore};

#[derive(Clone)]
pub struct AppState {
    pub ledger: VoteLedger,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn PollCatalog>,
        store: Arc<dyn VoteStore>,
        config: Config,
    ) -> Self {
        let settings = LedgerSettings {
            anonymous: config.anonymous_voting,
            lookup_timeout: config.lookup_timeout,
        };
        Self {
            ledger: VoteLedger::new(catalog, store, settings),
            config: Arc::new(config),
        }
    }

    /// Build state with the storage backend the config selects
    pub async fn from_config(config: Config) -> Result<Self> {
        let state = match config.storage {
            StorageBackend::Memory => Self::new(
                Arc::new(MemoryCatalog::new()),
                Arc::new(MemoryVoteStore::new()),
                config,
            ),
            StorageBackend::Sqlite => {
                let db = Database::connect(&config.db_path).await?;
                Self::new(Arc::new(db.clone()), Arc::new(db), config)
            }
        };
        Ok(state)
    }
}
