use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A loan application collected by the `LoanApplication` intent, written to
/// the pending-accounts store once the user confirms it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub user_name: String,
    pub loan_value: Decimal,
    pub monthly_income: Decimal,
    pub work_history: bool,
    pub credit_score: u16,
    pub housing_expense: Decimal,
    pub debt_amount: Decimal,
    pub down_payment: Decimal,
    pub coborrower: bool,
    pub closing_date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
}

impl LoanApplication {
    pub const PLAN_NAME: &'static str = "Loan";

    pub fn financed_amount(&self) -> Decimal {
        self.loan_value - self.down_payment
    }

    /// Monthly obligations over gross monthly income, as a percentage.
    pub fn debt_to_income_pct(&self) -> Option<Decimal> {
        if self.monthly_income <= Decimal::ZERO {
            return None;
        }
        let obligations = self.housing_expense + self.debt_amount;
        Some((obligations * Decimal::ONE_HUNDRED / self.monthly_income).round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{ApplicationId, LoanApplication};

    fn application(monthly_income: i64) -> LoanApplication {
        LoanApplication {
            id: ApplicationId::generate(),
            user_name: "jdoe".to_string(),
            loan_value: Decimal::from(400_000),
            monthly_income: Decimal::from(monthly_income),
            work_history: true,
            credit_score: 720,
            housing_expense: Decimal::from(1_500),
            debt_amount: Decimal::from(500),
            down_payment: Decimal::from(80_000),
            coborrower: false,
            closing_date: NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date"),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn financed_amount_subtracts_down_payment() {
        assert_eq!(application(10_000).financed_amount(), Decimal::from(320_000));
    }

    #[test]
    fn debt_to_income_requires_positive_income() {
        assert_eq!(application(10_000).debt_to_income_pct(), Some(Decimal::from(20)));
        assert_eq!(application(0).debt_to_income_pct(), None);
    }
}
