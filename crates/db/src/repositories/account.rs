use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::Row;

use lendbot_core::domain::account::AccountRecord;
use lendbot_core::errors::StoreError;
use lendbot_core::ports::AccountStore;

use super::RepositoryError;
use crate::DbPool;

/// Existing customer accounts, one row per (user, plan).
pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Vec<AccountRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_name, plan_name, loan_amount, loan_interest, unpaid_principal,
                    amount_due, payment_amount, due_date, pin
             FROM user_accounts WHERE user_name = ? ORDER BY rowid",
        )
        .bind(user_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_account).collect()
    }

    pub async fn save(&self, record: &AccountRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_accounts (user_name, plan_name, loan_amount, loan_interest,
                                        unpaid_principal, amount_due, payment_amount, due_date, pin)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_name, plan_name) DO UPDATE SET
                 loan_amount = excluded.loan_amount,
                 loan_interest = excluded.loan_interest,
                 unpaid_principal = excluded.unpaid_principal,
                 amount_due = excluded.amount_due,
                 payment_amount = excluded.payment_amount,
                 due_date = excluded.due_date,
                 pin = excluded.pin",
        )
        .bind(&record.user_name)
        .bind(&record.plan_name)
        .bind(record.loan_amount.map(|value| value.to_string()))
        .bind(record.loan_interest.map(|value| value.to_string()))
        .bind(record.unpaid_principal.map(|value| value.to_string()))
        .bind(record.amount_due.map(|value| value.to_string()))
        .bind(record.payment_amount.map(|value| value.to_string()))
        .bind(&record.due_date)
        .bind(record.pin.as_ref().map(|pin| pin.expose_secret().to_string()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountStore for SqlAccountRepository {
    async fn find_accounts(&self, user_name: &str) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self.find_by_user_name(user_name).await?)
    }
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<AccountRecord, RepositoryError> {
    let user_name: String =
        row.try_get("user_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let plan_name: String =
        row.try_get("plan_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let due_date: Option<String> =
        row.try_get("due_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let pin: Option<String> =
        row.try_get("pin").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let mut record = AccountRecord {
        loan_amount: decimal_column(row, "loan_amount")?,
        loan_interest: decimal_column(row, "loan_interest")?,
        unpaid_principal: decimal_column(row, "unpaid_principal")?,
        amount_due: decimal_column(row, "amount_due")?,
        payment_amount: decimal_column(row, "payment_amount")?,
        due_date,
        ..AccountRecord::new(user_name, plan_name)
    };
    if let Some(pin) = pin {
        record = record.with_pin(pin);
    }
    Ok(record)
}

fn decimal_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let raw: Option<String> =
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    raw.map(|value| {
        Decimal::from_str(value.trim())
            .map_err(|e| RepositoryError::Decode(format!("{column} `{value}`: {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use lendbot_core::domain::account::AccountRecord;
    use lendbot_core::ports::AccountStore;

    use super::SqlAccountRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlAccountRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlAccountRepository::new(pool)
    }

    #[tokio::test]
    async fn saved_accounts_are_found_in_insert_order() {
        let repository = repository().await;
        let mortgage = AccountRecord {
            loan_amount: Some(Decimal::from(350_000)),
            loan_interest: Some(Decimal::new(45, 1)),
            due_date: Some("2026-11-01".to_string()),
            ..AccountRecord::new("jdoe", "mortgage").with_pin("1234")
        };
        repository.save(&mortgage).await.expect("save mortgage");
        repository.save(&AccountRecord::new("jdoe", "checking")).await.expect("save checking");

        let records = repository.find_accounts("jdoe").await.expect("lookup");
        let plans = records.iter().map(|record| record.plan_name.as_str()).collect::<Vec<_>>();
        assert_eq!(plans, vec!["mortgage", "checking"]);
        assert_eq!(records[0].loan_interest, Some(Decimal::new(45, 1)));
        assert_eq!(records[0].numeric_pin(), Some(1234));
        assert!(records[1].pin.is_none());
    }

    #[tokio::test]
    async fn unknown_user_has_no_records() {
        let repository = repository().await;
        assert!(repository.find_accounts("nobody").await.expect("lookup").is_empty());
    }

    #[tokio::test]
    async fn malformed_amount_is_a_decode_error() {
        let repository = repository().await;
        sqlx::query(
            "INSERT INTO user_accounts (user_name, plan_name, loan_amount) VALUES ('x', 'loan', 'lots')",
        )
        .execute(&repository.pool)
        .await
        .expect("insert");

        let error = repository.find_accounts("x").await.expect_err("amount is not a number");
        assert!(matches!(error, lendbot_core::errors::StoreError::Decode(_)));
    }
}
