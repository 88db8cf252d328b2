//! Seams to the external collaborators. Bootstrap wires concrete clients in;
//! tests wire in-memory fakes.

use async_trait::async_trait;

use crate::domain::account::AccountRecord;
use crate::domain::application::LoanApplication;
use crate::errors::{GenAiError, StoreError};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Every record stored under `user_name`; empty when the user is unknown.
    async fn find_accounts(&self, user_name: &str) -> Result<Vec<AccountRecord>, StoreError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn submit_application(&self, application: &LoanApplication) -> Result<(), StoreError>;
}

/// Renders a submitted application, stores it, and returns a time-limited
/// link the user can open.
#[async_trait]
pub trait ApplicationPublisher: Send + Sync {
    async fn publish(&self, application: &LoanApplication) -> Result<String, StoreError>;
}

#[async_trait]
pub trait GenAiBridge: Send + Sync {
    async fn answer(&self, utterance: &str) -> Result<String, GenAiError>;
}

/// Object storage for rendered artefacts.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str)
        -> Result<(), StoreError>;

    /// A GET link for `key` that stops working after `expires_in_secs`.
    async fn presign_get(&self, key: &str, expires_in_secs: u64) -> Result<String, StoreError>;
}
