// Application state shared across handlers

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::store::LedgerStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: LedgerStore,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let store = LedgerStore::open(&config.data_dir)?;
        Ok(Self { store, config })
    }

    /// State backed by an in-memory store. Used by tests.
    pub fn temporary(config: Config) -> Result<Self> {
        let store = LedgerStore::temporary()?;
        Ok(Self { store, config })
    }
}
