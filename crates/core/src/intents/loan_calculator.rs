use rust_decimal::Decimal;
use tracing::info;

use super::flow::{validate_slots, DialogStep, SlotCheck, SlotFillingFlow, SlotRule};
use super::DialogServices;
use crate::calculator::{
    estimate_payment, format_amount, rate_for_credit_score, LoanTerms, PaymentEstimate,
};
use crate::domain::dialog::{Attributes, DialogResponse, DialogTurnRequest, Intent};
use crate::errors::DialogError;
use crate::responses::{delegate, elicit_intent, elicit_slot};
use crate::validation::{parse_integer, ValidationResult};

pub const LOAN_ESTIMATE_ATTRIBUTE: &str = "LoanEstimate";

const RULES: &[SlotRule] = &[
    SlotRule {
        slot: "LoanValue",
        check: SlotCheck::NonNegative,
        prompt: "What is the price of the home you are considering?",
        invalid_message: "{value} is not a valid loan value. Please enter a whole dollar amount.",
    },
    SlotRule {
        slot: "DownPayment",
        check: SlotCheck::NonNegative,
        prompt: "How much would you put down?",
        invalid_message: "{value} is not a valid down payment. Please enter a whole dollar amount.",
    },
    SlotRule {
        slot: "CreditScore",
        check: SlotCheck::CreditScore,
        prompt: "What is your estimated credit score?",
        invalid_message: "{value} is not a valid credit score. Please enter a score between 301 and 850.",
    },
    SlotRule {
        slot: "LoanTerm",
        check: SlotCheck::TermYears,
        prompt: "Over how many years would you repay the loan?",
        invalid_message: "{value} is not a valid term. Please enter a number of years from 1 to 40.",
    },
];

const DOWN_PAYMENT_TOO_LARGE: &str =
    "Your down payment cannot be more than the price of the home. How much would you put down?";
const ESTIMATE_FAILED: &str =
    "I could not estimate a payment for that amount. What is the price of the home you are considering?";

pub(crate) async fn handle(
    _services: &DialogServices,
    request: &mut DialogTurnRequest,
) -> Result<DialogResponse, DialogError> {
    let validation = validate_calculator(request.intent());
    let step = SlotFillingFlow::DIRECT.next_step(
        request.invocation_source,
        request.intent().confirmation_state,
        validation,
    );

    let mut session_attributes = request.session_attributes().clone();
    let intent = request.intent().clone();

    match step {
        DialogStep::Elicit { slot, message } => {
            Ok(elicit_slot(session_attributes, Attributes::new(), intent, &slot, message))
        }
        DialogStep::Fulfil => match estimate(&intent) {
            Some(estimate) => {
                info!(
                    event_name = "dialog.calculator.estimated",
                    years = estimate.years,
                    rate = %estimate.annual_rate_pct,
                    "loan payment estimated"
                );
                session_attributes.insert(
                    LOAN_ESTIMATE_ATTRIBUTE.to_string(),
                    estimate.monthly_payment.to_string(),
                );
                Ok(elicit_intent(session_attributes, estimate_message(&estimate)))
            }
            None => Ok(elicit_slot(
                session_attributes,
                Attributes::new(),
                intent,
                "LoanValue",
                ESTIMATE_FAILED,
            )),
        },
        DialogStep::Confirm | DialogStep::Cancel | DialogStep::Delegate => {
            Ok(delegate(session_attributes, Attributes::new(), intent))
        }
    }
}

fn validate_calculator(intent: &Intent) -> ValidationResult {
    let result = validate_slots(intent, RULES);
    if !result.is_valid {
        return result;
    }
    if integer(intent, "DownPayment") > integer(intent, "LoanValue") {
        return ValidationResult::invalid("DownPayment", DOWN_PAYMENT_TOO_LARGE);
    }
    ValidationResult::valid()
}

fn estimate(intent: &Intent) -> Option<PaymentEstimate> {
    let principal = Decimal::from(integer(intent, "LoanValue") - integer(intent, "DownPayment"));
    let years = u32::try_from(integer(intent, "LoanTerm")).ok()?;
    let terms = LoanTerms {
        principal,
        annual_rate_pct: rate_for_credit_score(integer(intent, "CreditScore")),
        years,
    };
    estimate_payment(&terms).ok()
}

fn estimate_message(estimate: &PaymentEstimate) -> String {
    format!(
        "For a ${} loan over {} years at an estimated {}% rate, your monthly payment would be about ${}, \
         with ${} of total interest.",
        format_amount(estimate.principal),
        estimate.years,
        estimate.annual_rate_pct,
        format_amount(estimate.monthly_payment),
        format_amount(estimate.total_interest),
    )
}

fn integer(intent: &Intent, slot: &str) -> i64 {
    intent.slot_value(slot).and_then(parse_integer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{estimate, validate_calculator};
    use crate::domain::dialog::Intent;

    fn intent(values: &[(&str, &str)]) -> Intent {
        let mut intent = Intent::named("LoanCalculator");
        for (slot, value) in values {
            intent.set_slot(slot, *value);
        }
        intent
    }

    #[test]
    fn missing_term_is_elicited_last() {
        let result = validate_calculator(&intent(&[
            ("LoanValue", "250000"),
            ("DownPayment", "50000"),
            ("CreditScore", "780"),
        ]));
        assert_eq!(result.violated_slot.as_deref(), Some("LoanTerm"));
    }

    #[test]
    fn down_payment_above_price_is_rejected() {
        let result = validate_calculator(&intent(&[
            ("LoanValue", "100000"),
            ("DownPayment", "150000"),
            ("CreditScore", "700"),
            ("LoanTerm", "15"),
        ]));
        assert_eq!(result.violated_slot.as_deref(), Some("DownPayment"));
    }

    #[test]
    fn estimate_uses_credit_tier_rate() {
        let estimate = estimate(&intent(&[
            ("LoanValue", "250000"),
            ("DownPayment", "50000"),
            ("CreditScore", "780"),
            ("LoanTerm", "30"),
        ]))
        .expect("terms are valid");

        assert_eq!(estimate.principal, Decimal::from(200_000));
        assert_eq!(estimate.annual_rate_pct, Decimal::new(625, 2));
        assert_eq!(estimate.years, 30);
        assert!(estimate.monthly_payment > Decimal::from(1_199));
    }
}
