use std::sync::Arc;

use gala_core::Config;
use sqlx::SqlitePool;

mod bidder;
mod cascade;
mod db;
mod errors;
mod journal;
mod model;
pub mod ops;

#[cfg(test)]
mod test_util;

pub use db::*;
pub use errors::*;
pub use journal::*;

/// The gala backend: the entity store, the journal of its changes and the live feed of them.
pub struct Gala {
    pub journal: Journal,
    config: Arc<Config>,
}

impl Gala {
    /// Opens the database at `url` and starts the live feed.
    pub async fn connect(url: &str, config: Config) -> Result<Self> {
        let pool = db::connect(url).await?;

        Ok(Self::new(pool, config))
    }

    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            journal: Journal::new(pool, &config),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Disconnects every live subscriber
    pub fn shutdown(&self) {
        self.journal.shutdown();
    }
}
