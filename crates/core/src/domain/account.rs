use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

/// One row of the existing-accounts table. A user may hold several plans.
#[derive(Clone, Debug)]
pub struct AccountRecord {
    pub user_name: String,
    pub plan_name: String,
    pub loan_amount: Option<Decimal>,
    pub loan_interest: Option<Decimal>,
    pub unpaid_principal: Option<Decimal>,
    pub amount_due: Option<Decimal>,
    pub payment_amount: Option<Decimal>,
    pub due_date: Option<String>,
    pub pin: Option<SecretString>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanKind {
    Mortgage,
    Checking,
    Loan,
    Other,
}

impl AccountRecord {
    pub fn new(user_name: impl Into<String>, plan_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            plan_name: plan_name.into(),
            loan_amount: None,
            loan_interest: None,
            unpaid_principal: None,
            amount_due: None,
            payment_amount: None,
            due_date: None,
            pin: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(SecretString::from(pin.into()));
        self
    }

    pub fn plan_kind(&self) -> PlanKind {
        match self.plan_name.trim().to_ascii_lowercase().as_str() {
            "mortgage" => PlanKind::Mortgage,
            "checking" => PlanKind::Checking,
            "loan" => PlanKind::Loan,
            _ => PlanKind::Other,
        }
    }

    /// Stored PIN as an integer; `None` when absent or not numeric.
    pub fn numeric_pin(&self) -> Option<i64> {
        self.pin.as_ref().and_then(|pin| pin.expose_secret().trim().parse::<i64>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::{AccountRecord, PlanKind};

    #[test]
    fn plan_kind_matches_case_insensitively() {
        assert_eq!(AccountRecord::new("a", "Mortgage").plan_kind(), PlanKind::Mortgage);
        assert_eq!(AccountRecord::new("a", "checking").plan_kind(), PlanKind::Checking);
        assert_eq!(AccountRecord::new("a", "LOAN").plan_kind(), PlanKind::Loan);
        assert_eq!(AccountRecord::new("a", "brokerage").plan_kind(), PlanKind::Other);
    }

    #[test]
    fn pin_is_redacted_in_debug_output() {
        let record = AccountRecord::new("jdoe", "mortgage").with_pin("1234");
        assert_eq!(record.numeric_pin(), Some(1234));
        assert!(!format!("{record:?}").contains("1234"));
    }
}
