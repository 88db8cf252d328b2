//! Fixed-rate amortisation used by the loan calculator intent and the
//! agent's payment tool.

use rust_decimal::Decimal;
use thiserror::Error;

pub const MAX_TERM_YEARS: u32 = 40;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalculatorError {
    #[error("principal must not be negative")]
    NegativePrincipal,
    #[error("annual rate must not be negative")]
    NegativeRate,
    #[error("term must be between 1 and {MAX_TERM_YEARS} years")]
    TermOutOfRange,
    #[error("payment calculation overflowed")]
    Overflow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoanTerms {
    pub principal: Decimal,
    pub annual_rate_pct: Decimal,
    pub years: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentEstimate {
    pub principal: Decimal,
    pub annual_rate_pct: Decimal,
    pub years: u32,
    pub monthly_payment: Decimal,
    pub total_interest: Decimal,
}

/// Indicative annual rate for a credit score.
pub fn rate_for_credit_score(score: i64) -> Decimal {
    match score {
        760.. => Decimal::new(625, 2),
        700..=759 => Decimal::new(675, 2),
        660..=699 => Decimal::new(725, 2),
        620..=659 => Decimal::new(775, 2),
        _ => Decimal::new(850, 2),
    }
}

pub fn estimate_payment(terms: &LoanTerms) -> Result<PaymentEstimate, CalculatorError> {
    if terms.principal < Decimal::ZERO {
        return Err(CalculatorError::NegativePrincipal);
    }
    if terms.annual_rate_pct < Decimal::ZERO {
        return Err(CalculatorError::NegativeRate);
    }
    if terms.years == 0 || terms.years > MAX_TERM_YEARS {
        return Err(CalculatorError::TermOutOfRange);
    }

    let payments = terms.years * 12;
    let payment_count = Decimal::from(payments);
    let monthly_rate = terms.annual_rate_pct / Decimal::ONE_HUNDRED / Decimal::from(12);

    let monthly_payment = if monthly_rate.is_zero() {
        terms.principal / payment_count
    } else {
        let mut growth = Decimal::ONE;
        let base = Decimal::ONE + monthly_rate;
        for _ in 0..payments {
            growth = growth.checked_mul(base).ok_or(CalculatorError::Overflow)?;
        }
        let numerator = terms
            .principal
            .checked_mul(monthly_rate)
            .and_then(|value| value.checked_mul(growth))
            .ok_or(CalculatorError::Overflow)?;
        numerator.checked_div(growth - Decimal::ONE).ok_or(CalculatorError::Overflow)?
    }
    .round_dp(2);

    let total_interest = monthly_payment
        .checked_mul(payment_count)
        .and_then(|total| total.checked_sub(terms.principal))
        .ok_or(CalculatorError::Overflow)?
        .round_dp(2);

    Ok(PaymentEstimate {
        principal: terms.principal,
        annual_rate_pct: terms.annual_rate_pct,
        years: terms.years,
        monthly_payment,
        total_interest,
    })
}

/// Renders an amount with thousands separators, keeping its stored scale
/// (`350000` → `350,000`, `1234.5` → `1,234.5`).
pub fn format_amount(value: Decimal) -> String {
    let raw = value.to_string();
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(raw.len() + integer.len() / 3);
    grouped.push_str(sign);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}
