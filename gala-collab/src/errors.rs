use gala_core::BidderError;
use thiserror::Error;

use crate::{DatabaseError, PrimaryKey};

pub type GalaResult<T> = std::result::Result<T, GalaError>;

/// Why a change to the store was refused or failed
#[derive(Debug, Error)]
pub enum GalaError {
    /// The request breaks a business rule and can be corrected by the caller
    #[error("{0}")]
    Invalid(String),
    /// The entity the request is about doesn't exist
    #[error("{resource}:{id} doesn't exist")]
    NotFound {
        resource: &'static str,
        id: PrimaryKey,
    },
    /// The request conflicts with the entity's current state
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl GalaError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<BidderError> for GalaError {
    fn from(value: BidderError) -> Self {
        Self::Conflict(value.to_string())
    }
}
