use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gala_collab::{DatabaseError, GalaError, PrimaryKey};
use log::error;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Invalid(String),
    #[error("{resource} {id} not found")]
    NotFound {
        resource: &'static str,
        id: PrimaryKey,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("Internal server error")]
    Internal,
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<GalaError> for ServerError {
    fn from(value: GalaError) -> Self {
        match value {
            GalaError::Invalid(message) => Self::Invalid(message),
            GalaError::NotFound { resource, id } => Self::NotFound { resource, id },
            GalaError::Conflict(message) => Self::Conflict(message),
            GalaError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { resource, id } => Self::NotFound { resource, id },
            e => {
                error!("Request failed: {e:?}");
                Self::Internal
            }
        }
    }
}
