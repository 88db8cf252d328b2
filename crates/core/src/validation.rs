//! Field-level slot validators.
//!
//! The pure checks take the slot's raw text. The PIN and username checks read
//! the account store and surface lookup failures as `StoreError`.

use chrono::{Datelike, NaiveDate, Utc};

use crate::errors::StoreError;
use crate::ports::AccountStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violated_slot: Option<String>,
    pub message: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, violated_slot: None, message: String::new() }
    }

    pub fn invalid(slot: impl Into<String>, message: impl Into<String>) -> Self {
        build_validation_result(false, Some(slot.into()), message)
    }
}

pub fn build_validation_result(
    is_valid: bool,
    violated_slot: Option<String>,
    message: impl Into<String>,
) -> ValidationResult {
    ValidationResult { is_valid, violated_slot, message: message.into() }
}

const FULL_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y %B %d",
];

const YEARLESS_FORMATS: &[&str] = &["%B %d %Y", "%d %B %Y"];

/// `12/15` and `12-15`: month and day, completed with the current year.
const YEARLESS_NUMERIC_FORMATS: &[(char, &str)] = &[('/', "%m/%d/%Y"), ('-', "%m-%d-%Y")];

/// `2026-12`, `2026/12`: year and month, completed with the first day.
const YEAR_MONTH_FORMATS: &[(char, &str)] = &[('-', "%Y-%m-%d"), ('/', "%Y/%m/%d")];

/// Parses a calendar date out of free text, ignoring filler words around it.
pub fn parse_date_fuzzy(value: &str) -> Option<NaiveDate> {
    let tokens = value
        .split_whitespace()
        .map(normalize_date_token)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        return None;
    }

    for width in (1..=tokens.len().min(3)).rev() {
        for window in tokens.windows(width) {
            let candidate = window.join(" ");
            if let Some(date) = parse_exact(&candidate, FULL_FORMATS) {
                return Some(date);
            }
        }
    }

    let current_year = Utc::now().year();
    for window in tokens.windows(2) {
        let candidate = format!("{} {current_year}", window.join(" "));
        if let Some(date) = parse_exact(&candidate, YEARLESS_FORMATS) {
            return Some(date);
        }
    }

    for token in &tokens {
        for (separator, format) in YEARLESS_NUMERIC_FORMATS {
            let candidate = format!("{token}{separator}{current_year}");
            if let Some(date) = parse_with(&candidate, format) {
                return Some(date);
            }
        }
    }

    for token in &tokens {
        for (separator, format) in YEAR_MONTH_FORMATS {
            let candidate = format!("{token}{separator}01");
            if let Some(date) = parse_with(&candidate, format) {
                return Some(date);
            }
        }
    }
    for window in tokens.windows(2) {
        let candidate = format!("{} 1 {}", window[0], window[1]);
        if let Some(date) = parse_exact(&candidate, &["%B %d %Y"]) {
            return Some(date);
        }
    }

    None
}

fn parse_exact(candidate: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats.iter().find_map(|format| parse_with(candidate, format))
}

/// Four-digit years only: `%Y` would otherwise read `December 2026` as
/// December 20 of year 26.
fn parse_with(candidate: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(candidate, format).ok().filter(|date| date.year() >= 1000)
}

fn normalize_date_token(token: &str) -> String {
    let trimmed = token.trim_matches(|ch: char| matches!(ch, ',' | '.' | '!' | '?' | ';' | ':'));
    let lower = trimmed.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(digits) = lower.strip_suffix(suffix) {
            if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) {
                return digits.to_string();
            }
        }
    }
    trimmed.to_string()
}

pub fn isvalid_date(value: &str) -> bool {
    parse_date_fuzzy(value).is_some()
}

pub fn isvalid_yes_or_no(value: &str) -> bool {
    matches!(value, "Yes" | "yes" | "No" | "no")
}

pub fn parse_yes_or_no(value: &str) -> Option<bool> {
    match value {
        "Yes" | "yes" => Some(true),
        "No" | "no" => Some(false),
        _ => None,
    }
}

pub fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

pub fn isvalid_credit_score(value: &str) -> bool {
    parse_integer(value).is_some_and(|score| score > 300 && score < 851)
}

pub fn isvalid_zero_or_greater(value: &str) -> bool {
    parse_integer(value).is_some_and(|amount| amount >= 0)
}

pub async fn isvalid_username(
    store: &dyn AccountStore,
    user_name: &str,
) -> Result<bool, StoreError> {
    let records = store.find_accounts(user_name).await?;
    Ok(!records.is_empty())
}

/// Compares the supplied PIN with the first stored record's PIN, both read as
/// integers.
pub async fn isvalid_pin(
    store: &dyn AccountStore,
    user_name: &str,
    pin: &str,
) -> Result<bool, StoreError> {
    let records = store.find_accounts(user_name).await?;
    let Some(record) = records.first() else {
        return Ok(false);
    };
    let Some(supplied) = parse_integer(pin) else {
        return Ok(false);
    };
    Ok(record.numeric_pin() == Some(supplied))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate, Utc};

    use super::{
        isvalid_credit_score, isvalid_date, isvalid_pin, isvalid_username, isvalid_yes_or_no,
        isvalid_zero_or_greater, parse_date_fuzzy,
    };
    use crate::domain::account::AccountRecord;
    use crate::errors::StoreError;
    use crate::ports::AccountStore;

    struct FixedAccounts(Vec<AccountRecord>);

    #[async_trait]
    impl AccountStore for FixedAccounts {
        async fn find_accounts(&self, user_name: &str) -> Result<Vec<AccountRecord>, StoreError> {
            Ok(self.0.iter().filter(|record| record.user_name == user_name).cloned().collect())
        }
    }

    struct BrokenAccounts;

    #[async_trait]
    impl AccountStore for BrokenAccounts {
        async fn find_accounts(&self, _user_name: &str) -> Result<Vec<AccountRecord>, StoreError> {
            Err(StoreError::Unavailable("table offline".to_string()))
        }
    }

    #[test]
    fn credit_score_accepts_only_301_through_850() {
        for score in -5..=1_000 {
            let expected = (301..=850).contains(&score);
            assert_eq!(isvalid_credit_score(&score.to_string()), expected, "score {score}");
        }
        assert!(!isvalid_credit_score("seven hundred"));
        assert!(isvalid_credit_score(" 720 "));
    }

    #[test]
    fn zero_or_greater_requires_non_negative_integer() {
        assert!(isvalid_zero_or_greater("0"));
        assert!(isvalid_zero_or_greater("250000"));
        assert!(!isvalid_zero_or_greater("-1"));
        assert!(!isvalid_zero_or_greater("12.5"));
        assert!(!isvalid_zero_or_greater("lots"));
    }

    #[test]
    fn yes_no_accepts_exact_literals_only() {
        for value in ["Yes", "yes", "No", "no"] {
            assert!(isvalid_yes_or_no(value), "{value} should be accepted");
        }
        for value in ["YES", "NO", "y", "n", "yeah", "", " yes"] {
            assert!(!isvalid_yes_or_no(value), "{value} should be rejected");
        }
    }

    #[test]
    fn dates_parse_without_a_fixed_format() {
        let expected = NaiveDate::from_ymd_opt(2026, 7, 4).expect("valid date");
        for value in [
            "2026-07-04",
            "07/04/2026",
            "July 4 2026",
            "July 4th, 2026",
            "4 July 2026",
            "close on July 4, 2026 please",
        ] {
            assert_eq!(parse_date_fuzzy(value), Some(expected), "{value}");
        }
        assert!(isvalid_date("March 3"));

        let this_year = Utc::now().year();
        let december_15 = NaiveDate::from_ymd_opt(this_year, 12, 15).expect("valid date");
        assert_eq!(parse_date_fuzzy("12/15"), Some(december_15));
        assert_eq!(parse_date_fuzzy("closing 12-15"), Some(december_15));

        let december_first = NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date");
        assert_eq!(parse_date_fuzzy("2026-12"), Some(december_first));
        assert_eq!(parse_date_fuzzy("2026/12"), Some(december_first));
        assert_eq!(parse_date_fuzzy("December 2026"), Some(december_first));

        assert!(!isvalid_date("750"));
        assert!(!isvalid_date("13/45"));
        assert!(!isvalid_date("someday soon"));
        assert!(!isvalid_date(""));
        assert!(!isvalid_date("2026-02-30"));
    }

    #[tokio::test]
    async fn username_and_pin_checks_read_the_store() {
        let store = FixedAccounts(vec![AccountRecord::new("jdoe", "mortgage").with_pin("1234")]);

        assert_eq!(isvalid_username(&store, "jdoe").await, Ok(true));
        assert_eq!(isvalid_username(&store, "nobody").await, Ok(false));
        assert_eq!(isvalid_pin(&store, "jdoe", "1234").await, Ok(true));
        assert_eq!(isvalid_pin(&store, "jdoe", "01234").await, Ok(true));
        assert_eq!(isvalid_pin(&store, "jdoe", "4321").await, Ok(false));
        assert_eq!(isvalid_pin(&store, "jdoe", "abcd").await, Ok(false));
        assert_eq!(isvalid_pin(&store, "nobody", "1234").await, Ok(false));
    }

    #[tokio::test]
    async fn lookup_failures_are_returned_not_swallowed() {
        let error = isvalid_username(&BrokenAccounts, "jdoe").await.expect_err("store is down");
        assert_eq!(error, StoreError::Unavailable("table offline".to_string()));
        assert!(isvalid_pin(&BrokenAccounts, "jdoe", "1234").await.is_err());
    }
}
