use thiserror::Error;

use orderdesk_core::DirectoryError;

pub mod memory;
pub mod permissions;
pub mod routing;

pub use memory::{InMemoryPermissionSetProvider, InMemoryRoutingDirectory};
pub use permissions::SqlPermissionSetProvider;
pub use routing::SqlRoutingDirectory;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for DirectoryError {
    fn from(value: RepositoryError) -> Self {
        DirectoryError::Unavailable(value.to_string())
    }
}
