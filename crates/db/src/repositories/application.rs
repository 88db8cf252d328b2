use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

use lendbot_core::domain::application::{ApplicationId, LoanApplication};
use lendbot_core::errors::StoreError;
use lendbot_core::ports::ApplicationStore;

use super::RepositoryError;
use crate::DbPool;

pub struct SqlApplicationRepository {
    pool: DbPool,
}

impl SqlApplicationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, application: &LoanApplication) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO pending_accounts (application_id, user_name, plan_name, loan_value,
                                           monthly_income, work_history, credit_score,
                                           housing_expense, debt_amount, down_payment,
                                           coborrower, closing_date, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(application.id.to_string())
        .bind(&application.user_name)
        .bind(LoanApplication::PLAN_NAME)
        .bind(application.loan_value.to_string())
        .bind(application.monthly_income.to_string())
        .bind(application.work_history)
        .bind(i64::from(application.credit_score))
        .bind(application.housing_expense.to_string())
        .bind(application.debt_amount.to_string())
        .bind(application.down_payment.to_string())
        .bind(application.coborrower)
        .bind(application.closing_date.to_string())
        .bind(application.submitted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            event_name = "db.application.inserted",
            application_id = %application.id,
            user_name = %application.user_name,
            "pending application stored"
        );
        Ok(())
    }

    /// Pending applications for a user, oldest first.
    pub async fn list_for_user(
        &self,
        user_name: &str,
    ) -> Result<Vec<LoanApplication>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT application_id, user_name, loan_value, monthly_income, work_history,
                    credit_score, housing_expense, debt_amount, down_payment, coborrower,
                    closing_date, submitted_at
             FROM pending_accounts WHERE user_name = ? ORDER BY submitted_at, rowid",
        )
        .bind(user_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_application).collect()
    }
}

#[async_trait::async_trait]
impl ApplicationStore for SqlApplicationRepository {
    async fn submit_application(&self, application: &LoanApplication) -> Result<(), StoreError> {
        Ok(self.insert(application).await?)
    }
}

fn row_to_application(row: &sqlx::sqlite::SqliteRow) -> Result<LoanApplication, RepositoryError> {
    let id: String = column(row, "application_id")?;
    let credit_score: i64 = column(row, "credit_score")?;
    let closing_date: String = column(row, "closing_date")?;
    let submitted_at: String = column(row, "submitted_at")?;

    Ok(LoanApplication {
        id: ApplicationId(
            Uuid::parse_str(&id).map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        user_name: column(row, "user_name")?,
        loan_value: decimal(row, "loan_value")?,
        monthly_income: decimal(row, "monthly_income")?,
        work_history: column(row, "work_history")?,
        credit_score: u16::try_from(credit_score)
            .map_err(|e| RepositoryError::Decode(format!("credit_score {credit_score}: {e}")))?,
        housing_expense: decimal(row, "housing_expense")?,
        debt_amount: decimal(row, "debt_amount")?,
        down_payment: decimal(row, "down_payment")?,
        coborrower: column(row, "coborrower")?,
        closing_date: NaiveDate::parse_from_str(&closing_date, "%Y-%m-%d")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        submitted_at: DateTime::parse_from_rfc3339(&submitted_at)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
    })
}

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn decimal(row: &sqlx::sqlite::SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = column(row, name)?;
    Decimal::from_str(&raw).map_err(|e| RepositoryError::Decode(format!("{name} `{raw}`: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use lendbot_core::domain::application::{ApplicationId, LoanApplication};
    use lendbot_core::ports::ApplicationStore;

    use super::SqlApplicationRepository;
    use crate::{connect_with_settings, migrations};

    fn application(user_name: &str) -> LoanApplication {
        LoanApplication {
            id: ApplicationId::generate(),
            user_name: user_name.to_string(),
            loan_value: Decimal::from(400_000),
            monthly_income: Decimal::from(9_000),
            work_history: true,
            credit_score: 710,
            housing_expense: Decimal::from(1_200),
            debt_amount: Decimal::new(35050, 2),
            down_payment: Decimal::from(80_000),
            coborrower: false,
            closing_date: NaiveDate::from_ymd_opt(2026, 12, 15).expect("date"),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn submitted_applications_round_trip_per_user() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repository = SqlApplicationRepository::new(pool);

        let submitted = application("jdoe");
        repository.submit_application(&submitted).await.expect("submit");
        repository.submit_application(&application("asmith")).await.expect("submit other");

        let stored = repository.list_for_user("jdoe").await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, submitted.id);
        assert_eq!(stored[0].debt_amount, Decimal::new(35050, 2));
        assert_eq!(stored[0].closing_date, submitted.closing_date);
        assert!(stored[0].work_history);
    }

    #[tokio::test]
    async fn duplicate_application_id_is_a_backend_error() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repository = SqlApplicationRepository::new(pool);

        let submitted = application("jdoe");
        repository.submit_application(&submitted).await.expect("first submit");
        let error = repository.submit_application(&submitted).await.expect_err("duplicate id");
        assert!(matches!(error, lendbot_core::errors::StoreError::Backend(_)));
    }
}
