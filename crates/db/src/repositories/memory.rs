use std::collections::HashMap;

use tokio::sync::RwLock;

use lendbot_core::domain::account::AccountRecord;
use lendbot_core::domain::application::LoanApplication;
use lendbot_core::errors::StoreError;
use lendbot_core::ports::{AccountStore, ApplicationStore};

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, Vec<AccountRecord>>>,
}

impl InMemoryAccountRepository {
    pub fn with_records(records: impl IntoIterator<Item = AccountRecord>) -> Self {
        let mut accounts: HashMap<String, Vec<AccountRecord>> = HashMap::new();
        for record in records {
            accounts.entry(record.user_name.clone()).or_default().push(record);
        }
        Self { accounts: RwLock::new(accounts) }
    }

    pub async fn insert(&self, record: AccountRecord) {
        let mut accounts = self.accounts.write().await;
        accounts.entry(record.user_name.clone()).or_default().push(record);
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryAccountRepository {
    async fn find_accounts(&self, user_name: &str) -> Result<Vec<AccountRecord>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(user_name).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryApplicationRepository {
    applications: RwLock<HashMap<String, LoanApplication>>,
}

impl InMemoryApplicationRepository {
    pub async fn list_for_user(&self, user_name: &str) -> Vec<LoanApplication> {
        let applications = self.applications.read().await;
        let mut matching = applications
            .values()
            .filter(|application| application.user_name == user_name)
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by_key(|application| application.submitted_at);
        matching
    }
}

#[async_trait::async_trait]
impl ApplicationStore for InMemoryApplicationRepository {
    async fn submit_application(&self, application: &LoanApplication) -> Result<(), StoreError> {
        let mut applications = self.applications.write().await;
        applications.insert(application.id.to_string(), application.clone());
        Ok(())
    }
}
