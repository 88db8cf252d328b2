use thiserror::Error;

use lendbot_core::errors::StoreError;

pub mod account;
pub mod application;
pub mod dynamo;
pub mod memory;

pub use account::SqlAccountRepository;
pub use application::SqlApplicationRepository;
pub use dynamo::DynamoAccountRepository;
pub use memory::{InMemoryAccountRepository, InMemoryApplicationRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("dynamodb error: {0}")]
    Dynamo(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => StoreError::Unavailable(error.to_string()),
            RepositoryError::Database(_) | RepositoryError::Dynamo(_) => {
                StoreError::Backend(error.to_string())
            }
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use lendbot_core::errors::StoreError;

    use super::RepositoryError;

    #[test]
    fn pool_exhaustion_is_reported_as_unavailable() {
        let error = StoreError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(error, StoreError::Unavailable(_)));
    }

    #[test]
    fn decode_failures_keep_their_message() {
        let error = StoreError::from(RepositoryError::Decode("bad amount".to_string()));
        assert_eq!(error, StoreError::Decode("bad amount".to_string()));
    }
}
