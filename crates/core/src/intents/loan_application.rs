use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::flow::{validate_slots, DialogStep, SlotCheck, SlotFillingFlow, SlotRule};
use super::verify_identity::{unknown_user_message, USER_NAME_SLOT};
use super::DialogServices;
use crate::calculator::format_amount;
use crate::domain::application::{ApplicationId, LoanApplication};
use crate::domain::dialog::{Attributes, DialogResponse, DialogTurnRequest, Intent, IntentState};
use crate::errors::{DialogError, StoreError};
use crate::responses::{build_slot, close, confirm_intent, delegate, elicit_intent, elicit_slot};
use crate::validation::{
    isvalid_username, parse_date_fuzzy, parse_integer, parse_yes_or_no, ValidationResult,
};

pub const APPLICATION_ID_ATTRIBUTE: &str = "ApplicationId";

const USER_NAME_PROMPT: &str = "What is your username?";
const DOWN_PAYMENT_TOO_LARGE: &str =
    "Your down payment cannot be more than the loan value. How much do you plan to put down?";
const CANCELLED: &str = "Okay, I have cancelled your loan application.";

const RULES: &[SlotRule] = &[
    SlotRule {
        slot: "LoanValue",
        check: SlotCheck::NonNegative,
        prompt: "What is the value of the home you would like to finance?",
        invalid_message: "{value} is not a valid loan value. Please enter a whole dollar amount.",
    },
    SlotRule {
        slot: "MonthlyIncome",
        check: SlotCheck::NonNegative,
        prompt: "What is your gross monthly income?",
        invalid_message: "{value} is not a valid income. Please enter a whole dollar amount.",
    },
    SlotRule {
        slot: "WorkHistory",
        check: SlotCheck::YesNo,
        prompt: "Have you been continuously employed for the last two years?",
        invalid_message: "Please answer yes or no. Have you been continuously employed for the last two years?",
    },
    SlotRule {
        slot: "CreditScore",
        check: SlotCheck::CreditScore,
        prompt: "What is your estimated credit score?",
        invalid_message: "{value} is not a valid credit score. Please enter a score between 301 and 850.",
    },
    SlotRule {
        slot: "HousingExpense",
        check: SlotCheck::NonNegative,
        prompt: "How much do you currently pay for housing each month?",
        invalid_message: "{value} is not a valid amount. How much do you pay for housing each month?",
    },
    SlotRule {
        slot: "DebtAmount",
        check: SlotCheck::NonNegative,
        prompt: "What is the total of your other monthly debt payments?",
        invalid_message: "{value} is not a valid amount. What do your other debts cost each month?",
    },
    SlotRule {
        slot: "DownPayment",
        check: SlotCheck::NonNegative,
        prompt: "How much do you plan to put down?",
        invalid_message: "{value} is not a valid down payment. Please enter a whole dollar amount.",
    },
    SlotRule {
        slot: "Coborrow",
        check: SlotCheck::YesNo,
        prompt: "Will anyone be co-borrowing on this loan with you?",
        invalid_message: "Please answer yes or no. Will anyone be co-borrowing on this loan?",
    },
    SlotRule {
        slot: "ClosingDate",
        check: SlotCheck::Date,
        prompt: "When would you like to close on the loan?",
        invalid_message: "I could not read {value} as a date. When would you like to close?",
    },
];

pub(crate) async fn handle(
    services: &DialogServices,
    request: &mut DialogTurnRequest,
) -> Result<DialogResponse, DialogError> {
    prefill_user_name(request);

    let validation = validate_application(services, request.intent()).await?;
    let step = SlotFillingFlow::CONFIRMED.next_step(
        request.invocation_source,
        request.intent().confirmation_state,
        validation,
    );

    let session_attributes = request.session_attributes().clone();
    let intent = request.intent().clone();

    match step {
        DialogStep::Elicit { slot, message } => {
            Ok(elicit_slot(session_attributes, Attributes::new(), intent, &slot, message))
        }
        DialogStep::Confirm => {
            let message = confirmation_message(&intent);
            Ok(confirm_intent(session_attributes, Attributes::new(), intent, message))
        }
        DialogStep::Cancel => {
            info!(event_name = "dialog.application.cancelled", "loan application cancelled");
            Ok(close(session_attributes, Attributes::new(), IntentState::Failed, intent, CANCELLED))
        }
        DialogStep::Fulfil => fulfil(services, session_attributes, &intent).await,
        DialogStep::Delegate => Ok(delegate(session_attributes, Attributes::new(), intent)),
    }
}

/// Copies a username verified earlier in the session into the empty
/// `UserName` slot.
fn prefill_user_name(request: &mut DialogTurnRequest) {
    if request.intent().slot_value(USER_NAME_SLOT).is_some() {
        return;
    }
    if let Some(user_name) = request.session_attributes().get(USER_NAME_SLOT).cloned() {
        build_slot(request.intent_mut(), USER_NAME_SLOT, user_name);
    }
}

async fn validate_application(
    services: &DialogServices,
    intent: &Intent,
) -> Result<ValidationResult, StoreError> {
    let Some(user_name) = intent.slot_value(USER_NAME_SLOT) else {
        return Ok(ValidationResult::invalid(USER_NAME_SLOT, USER_NAME_PROMPT));
    };
    if !isvalid_username(services.accounts.as_ref(), user_name).await? {
        return Ok(ValidationResult::invalid(USER_NAME_SLOT, unknown_user_message(user_name)));
    }

    let result = validate_slots(intent, RULES);
    if !result.is_valid {
        return Ok(result);
    }

    if amount(intent, "DownPayment") > amount(intent, "LoanValue") {
        return Ok(ValidationResult::invalid("DownPayment", DOWN_PAYMENT_TOO_LARGE));
    }

    Ok(ValidationResult::valid())
}

fn confirmation_message(intent: &Intent) -> String {
    let user_name = intent.slot_value(USER_NAME_SLOT).unwrap_or_default();
    let loan_value = amount(intent, "LoanValue");
    let down_payment = amount(intent, "DownPayment");
    let closing_date = intent.slot_value("ClosingDate").unwrap_or_default();
    format!(
        "Thank you, {user_name}. You are applying to finance ${} on a ${} home with a ${} down payment, \
         closing on {closing_date}. Would you like me to submit your application?",
        format_amount(loan_value - down_payment),
        format_amount(loan_value),
        format_amount(down_payment),
    )
}

async fn fulfil(
    services: &DialogServices,
    mut session_attributes: Attributes,
    intent: &Intent,
) -> Result<DialogResponse, DialogError> {
    let application = build_application(intent)?;

    services.applications.submit_application(&application).await.inspect_err(|error| {
        warn!(
            event_name = "dialog.application.submit_failed",
            application_id = %application.id,
            error = %error,
            "pending application write failed"
        );
    })?;
    info!(
        event_name = "dialog.application.submitted",
        application_id = %application.id,
        "loan application submitted"
    );

    let link = match &services.publisher {
        Some(publisher) => match publisher.publish(&application).await {
            Ok(url) => Some(url),
            Err(error) => {
                warn!(
                    event_name = "dialog.application.document_failed",
                    application_id = %application.id,
                    error = %error,
                    "application document could not be published"
                );
                None
            }
        },
        None => None,
    };

    session_attributes.insert(APPLICATION_ID_ATTRIBUTE.to_string(), application.id.to_string());

    let mut message = format!(
        "Your loan application has been submitted. Your application ID is {}.",
        application.id
    );
    if let Some(link) = link {
        message.push_str(&format!(" You can review a summary of your application here: {link}"));
    }
    Ok(elicit_intent(session_attributes, message))
}

fn build_application(intent: &Intent) -> Result<LoanApplication, DialogError> {
    let text = |slot: &str| {
        intent
            .slot_value(slot)
            .ok_or_else(|| DialogError::MalformedRequest(format!("slot {slot} is empty at fulfilment")))
    };
    let integer = |slot: &str| {
        text(slot).and_then(|value| {
            parse_integer(value)
                .ok_or_else(|| DialogError::MalformedRequest(format!("slot {slot} is not a number")))
        })
    };
    let yes_no = |slot: &str| {
        text(slot).and_then(|value| {
            parse_yes_or_no(value)
                .ok_or_else(|| DialogError::MalformedRequest(format!("slot {slot} is not yes or no")))
        })
    };

    let credit_score = u16::try_from(integer("CreditScore")?)
        .map_err(|_| DialogError::MalformedRequest("credit score out of range".to_string()))?;
    let closing_date = parse_date_fuzzy(text("ClosingDate")?)
        .ok_or_else(|| DialogError::MalformedRequest("closing date is not a date".to_string()))?;

    Ok(LoanApplication {
        id: ApplicationId::generate(),
        user_name: text(USER_NAME_SLOT)?.to_string(),
        loan_value: Decimal::from(integer("LoanValue")?),
        monthly_income: Decimal::from(integer("MonthlyIncome")?),
        work_history: yes_no("WorkHistory")?,
        credit_score,
        housing_expense: Decimal::from(integer("HousingExpense")?),
        debt_amount: Decimal::from(integer("DebtAmount")?),
        down_payment: Decimal::from(integer("DownPayment")?),
        coborrower: yes_no("Coborrow")?,
        closing_date,
        submitted_at: Utc::now(),
    })
}

fn amount(intent: &Intent, slot: &str) -> Decimal {
    intent.slot_value(slot).and_then(parse_integer).map(Decimal::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{build_application, confirmation_message};
    use crate::domain::dialog::Intent;

    fn complete_intent() -> Intent {
        let mut intent = Intent::named("LoanApplication");
        for (slot, value) in [
            ("UserName", "jdoe"),
            ("LoanValue", "400000"),
            ("MonthlyIncome", "12000"),
            ("WorkHistory", "yes"),
            ("CreditScore", "720"),
            ("HousingExpense", "2100"),
            ("DebtAmount", "450"),
            ("DownPayment", "80000"),
            ("Coborrow", "no"),
            ("ClosingDate", "December 1, 2026"),
        ] {
            intent.set_slot(slot, value);
        }
        intent
    }

    #[test]
    fn application_is_built_from_slot_values() {
        let application = build_application(&complete_intent()).expect("all slots are valid");

        assert_eq!(application.user_name, "jdoe");
        assert_eq!(application.loan_value, Decimal::from(400_000));
        assert_eq!(application.credit_score, 720);
        assert!(application.work_history);
        assert!(!application.coborrower);
        assert_eq!(
            application.closing_date,
            NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date")
        );
        assert_eq!(application.financed_amount(), Decimal::from(320_000));
    }

    #[test]
    fn confirmation_summarises_financed_amount() {
        let message = confirmation_message(&complete_intent());
        assert!(message.starts_with("Thank you, jdoe. You are applying to finance $320,000"));
        assert!(message.contains("$400,000 home with a $80,000 down payment"));
        assert!(message.ends_with("Would you like me to submit your application?"));
    }

    #[test]
    fn empty_slot_at_fulfilment_is_a_malformed_request() {
        let mut intent = complete_intent();
        intent.clear_slot("ClosingDate");
        assert!(build_application(&intent).is_err());
    }
}
