use std::collections::HashMap;
use std::str::FromStr;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use rust_decimal::Decimal;

use lendbot_core::domain::account::AccountRecord;
use lendbot_core::domain::application::LoanApplication;
use lendbot_core::errors::StoreError;
use lendbot_core::ports::{AccountStore, ApplicationStore};

use super::RepositoryError;

type Item = HashMap<String, AttributeValue>;

/// Accounts and pending applications kept in two DynamoDB tables, both keyed
/// on `userName`.
#[derive(Clone)]
pub struct DynamoAccountRepository {
    client: Client,
    accounts_table: String,
    pending_table: String,
}

impl DynamoAccountRepository {
    pub fn new(
        client: Client,
        accounts_table: impl Into<String>,
        pending_table: impl Into<String>,
    ) -> Self {
        Self { client, accounts_table: accounts_table.into(), pending_table: pending_table.into() }
    }

    pub async fn query_user(&self, user_name: &str) -> Result<Vec<AccountRecord>, RepositoryError> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.accounts_table)
                .key_condition_expression("userName = :u")
                .expression_attribute_values(":u", AttributeValue::S(user_name.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| RepositoryError::Dynamo(DisplayErrorContext(&e).to_string()))?;

            for item in output.items() {
                records.push(item_to_account(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!(
            event_name = "db.dynamo.accounts_queried",
            table = %self.accounts_table,
            record_count = records.len(),
            "account lookup finished"
        );
        Ok(records)
    }

    pub async fn put_application(
        &self,
        application: &LoanApplication,
    ) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(&self.pending_table)
            .set_item(Some(application_to_item(application)))
            .send()
            .await
            .map_err(|e| RepositoryError::Dynamo(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountStore for DynamoAccountRepository {
    async fn find_accounts(&self, user_name: &str) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self.query_user(user_name).await?)
    }
}

#[async_trait::async_trait]
impl ApplicationStore for DynamoAccountRepository {
    async fn submit_application(&self, application: &LoanApplication) -> Result<(), StoreError> {
        Ok(self.put_application(application).await?)
    }
}

fn item_to_account(item: &Item) -> Result<AccountRecord, RepositoryError> {
    let user_name = string_attr(item, "userName")
        .ok_or_else(|| RepositoryError::Decode("item without userName".to_string()))?;
    let plan_name = string_attr(item, "planName").unwrap_or_default();

    let mut record = AccountRecord {
        loan_amount: decimal_attr(item, "loanAmount")?,
        loan_interest: decimal_attr(item, "loanInterest")?,
        unpaid_principal: decimal_attr(item, "unpaidPrincipal")?,
        amount_due: decimal_attr(item, "amountDue")?,
        payment_amount: decimal_attr(item, "paymentAmount")?,
        due_date: string_attr(item, "dueDate"),
        ..AccountRecord::new(user_name, plan_name)
    };
    if let Some(pin) = string_attr(item, "pin") {
        record = record.with_pin(pin);
    }
    Ok(record)
}

/// Attributes were written by several tools over time; numbers show up both
/// as `N` and as `S`.
fn string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|value| match value {
        AttributeValue::S(text) | AttributeValue::N(text) => Some(text.clone()),
        _ => None,
    })
}

fn decimal_attr(item: &Item, name: &str) -> Result<Option<Decimal>, RepositoryError> {
    string_attr(item, name)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            Decimal::from_str(raw.trim())
                .map_err(|e| RepositoryError::Decode(format!("{name} `{raw}`: {e}")))
        })
        .transpose()
}

fn application_to_item(application: &LoanApplication) -> Item {
    let flag = |value: bool| AttributeValue::S(if value { "yes" } else { "no" }.to_string());

    HashMap::from([
        ("userName".to_string(), AttributeValue::S(application.user_name.clone())),
        ("planName".to_string(), AttributeValue::S(LoanApplication::PLAN_NAME.to_string())),
        ("applicationId".to_string(), AttributeValue::S(application.id.to_string())),
        ("loanValue".to_string(), AttributeValue::N(application.loan_value.to_string())),
        ("monthlyIncome".to_string(), AttributeValue::N(application.monthly_income.to_string())),
        ("workHistory".to_string(), flag(application.work_history)),
        ("creditScore".to_string(), AttributeValue::N(application.credit_score.to_string())),
        ("housingExpense".to_string(), AttributeValue::N(application.housing_expense.to_string())),
        ("debtAmount".to_string(), AttributeValue::N(application.debt_amount.to_string())),
        ("downPayment".to_string(), AttributeValue::N(application.down_payment.to_string())),
        ("coborrow".to_string(), flag(application.coborrower)),
        ("closingDate".to_string(), AttributeValue::S(application.closing_date.to_string())),
        ("submittedAt".to_string(), AttributeValue::S(application.submitted_at.to_rfc3339())),
    ])
}
