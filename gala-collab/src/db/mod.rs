use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError, SqliteConnection, SqlitePool,
};
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A row that was expected to exist doesn't
    #[error("{resource}:{id} doesn't exist")]
    NotFound {
        resource: &'static str,
        id: PrimaryKey,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn any(self) -> DatabaseError;
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

impl IntoDatabaseError for sqlx::migrate::MigrateError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

impl IntoDatabaseError for serde_json::Error {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

/// A kind of row the change populator knows how to load and fill in.
#[async_trait]
pub trait Entity: Sized + Send {
    /// Name of the resource, used in errors and logs
    const RESOURCE: &'static str;

    async fn fetch(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Option<Self>>;

    /// Ids of every row of this kind
    async fn fetch_ids(conn: &mut SqliteConnection) -> Result<Vec<PrimaryKey>>;

    /// Fills in the fields that are derived from other rows.
    async fn populate(&mut self, conn: &mut SqliteConnection) -> Result<()>;

    /// Like [Entity::fetch], but a missing row is an error.
    async fn get(conn: &mut SqliteConnection, id: PrimaryKey) -> Result<Self> {
        Self::fetch(conn, id)
            .await?
            .ok_or(DatabaseError::NotFound {
                resource: Self::RESOURCE,
                id,
            })
    }
}

/// Opens the gala database, creating and migrating it as needed.
///
/// The pool holds a single connection, since every reader and writer goes through
/// the serial gate anyway.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| e.any())?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(1));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| e.any())?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| e.any())?;

    info!("Database at {url} is ready");
    Ok(pool)
}
