use tracing::{info, warn};

use super::flow::{DialogStep, SlotFillingFlow};
use super::DialogServices;
use crate::calculator::format_amount;
use crate::domain::account::{AccountRecord, PlanKind};
use crate::domain::dialog::{Attributes, DialogResponse, DialogTurnRequest};
use crate::errors::{DialogError, StoreError};
use crate::responses::{delegate, elicit_intent, elicit_slot};
use crate::validation::{isvalid_pin, isvalid_username, ValidationResult};

pub const USER_NAME_SLOT: &str = "UserName";
pub const PIN_SLOT: &str = "Pin";

const MISSING_USER_NAME: &str =
    "Our records indicate there are no accounts belonging to that username. Please try again.";
const INCORRECT_PIN: &str = "You have entered an incorrect PIN. Please try again.";

pub(crate) fn unknown_user_message(user_name: &str) -> String {
    format!(
        "Our records indicate there is no profile belonging to the username, {user_name}. \
         Please enter a valid username"
    )
}

pub(crate) async fn handle(
    services: &DialogServices,
    request: &mut DialogTurnRequest,
) -> Result<DialogResponse, DialogError> {
    let validation = validate_identity(services, request).await?;
    let step = SlotFillingFlow::DIRECT.next_step(
        request.invocation_source,
        request.intent().confirmation_state,
        validation,
    );

    let session_attributes = request.session_attributes().clone();
    let intent = request.intent().clone();

    match step {
        DialogStep::Elicit { slot, message } => {
            info!(event_name = "dialog.identity.elicit", slot = %slot, "re-eliciting identity slot");
            Ok(elicit_slot(session_attributes, Attributes::new(), intent, &slot, message))
        }
        DialogStep::Fulfil => {
            let user_name = intent.slot_value(USER_NAME_SLOT).unwrap_or_default().to_string();
            let records = services.accounts.find_accounts(&user_name).await.inspect_err(|error| {
                warn!(event_name = "dialog.identity.lookup_failed", error = %error, "account lookup failed");
            })?;
            let summary = account_summary(&records, &services.settings.company_name);
            info!(
                event_name = "dialog.identity.verified",
                records = records.len(),
                "identity verified"
            );
            Ok(elicit_intent(
                session_attributes,
                format!("Thank you for confirming your username and PIN, {user_name}. {summary}"),
            ))
        }
        DialogStep::Confirm | DialogStep::Cancel | DialogStep::Delegate => {
            Ok(delegate(session_attributes, Attributes::new(), intent))
        }
    }
}

/// Checks the username before the PIN. A username that exists is written to
/// the `UserName` session attribute even when the PIN check fails after it.
async fn validate_identity(
    services: &DialogServices,
    request: &mut DialogTurnRequest,
) -> Result<ValidationResult, StoreError> {
    let Some(user_name) = request.intent().slot_value(USER_NAME_SLOT).map(str::to_string) else {
        return Ok(ValidationResult::invalid(USER_NAME_SLOT, MISSING_USER_NAME));
    };

    if !isvalid_username(services.accounts.as_ref(), &user_name).await? {
        return Ok(ValidationResult::invalid(USER_NAME_SLOT, unknown_user_message(&user_name)));
    }
    request.session_attributes_mut().insert(USER_NAME_SLOT.to_string(), user_name.clone());

    let Some(pin) = request.intent().slot_value(PIN_SLOT).map(str::to_string) else {
        return Ok(ValidationResult::invalid(
            PIN_SLOT,
            format!(
                "Thank you for choosing {}, {user_name}. Please confirm your 4-digit PIN before we proceed.",
                services.settings.company_name
            ),
        ));
    };

    if !isvalid_pin(services.accounts.as_ref(), &user_name, &pin).await? {
        return Ok(ValidationResult::invalid(PIN_SLOT, INCORRECT_PIN));
    }

    Ok(ValidationResult::valid())
}

/// Summary sentence for the last record whose plan is recognised; empty when
/// none is.
pub fn account_summary(records: &[AccountRecord], company_name: &str) -> String {
    records
        .iter()
        .filter_map(|record| plan_sentence(record, company_name))
        .last()
        .unwrap_or_default()
}

fn plan_sentence(record: &AccountRecord, company_name: &str) -> Option<String> {
    let due_date = record.due_date.as_deref().unwrap_or_default();
    match record.plan_kind() {
        PlanKind::Mortgage => Some(format!(
            "Your mortgage account summary includes a ${} loan at {}% interest with ${} of unpaid principal. \
             Your next payment of ${} is scheduled for {due_date}.",
            amount(record.loan_amount),
            record.loan_interest.unwrap_or_default(),
            amount(record.unpaid_principal),
            amount(record.amount_due),
        )),
        PlanKind::Checking => Some(balance_sentence("a Savings account", record, company_name)),
        PlanKind::Loan => Some(balance_sentence("a Loan account", record, company_name)),
        PlanKind::Other => None,
    }
}

fn balance_sentence(account: &str, record: &AccountRecord, company_name: &str) -> String {
    format!(
        "I see you have {account} with {company_name}. Your account balance is ${} and your next payment \
         amount of ${} is scheduled for {}.",
        amount(record.unpaid_principal),
        amount(record.payment_amount),
        record.due_date.as_deref().unwrap_or_default(),
    )
}

fn amount(value: Option<rust_decimal::Decimal>) -> String {
    format_amount(value.unwrap_or_default())
}
