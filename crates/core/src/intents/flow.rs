use crate::domain::dialog::{ConfirmationState, Intent, InvocationSource};
use crate::validation::{
    isvalid_credit_score, isvalid_date, isvalid_yes_or_no, isvalid_zero_or_greater,
    ValidationResult,
};

/// What a slot-filling intent does next once its slots have been validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogStep {
    Elicit { slot: String, message: String },
    Confirm,
    Fulfil,
    Cancel,
    Delegate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotFillingFlow {
    pub confirm_before_fulfil: bool,
}

impl SlotFillingFlow {
    pub const DIRECT: Self = Self { confirm_before_fulfil: false };
    pub const CONFIRMED: Self = Self { confirm_before_fulfil: true };

    pub fn next_step(
        &self,
        source: InvocationSource,
        confirmation: ConfirmationState,
        validation: ValidationResult,
    ) -> DialogStep {
        if !validation.is_valid {
            let slot = validation.violated_slot.unwrap_or_default();
            return DialogStep::Elicit { slot, message: validation.message };
        }

        match (self.confirm_before_fulfil, confirmation) {
            (true, ConfirmationState::None) if source == InvocationSource::FulfillmentCodeHook => {
                DialogStep::Fulfil
            }
            (true, ConfirmationState::None) => DialogStep::Confirm,
            (true, ConfirmationState::Confirmed) => DialogStep::Fulfil,
            (true, ConfirmationState::Denied) => DialogStep::Cancel,
            (false, ConfirmationState::None) => DialogStep::Fulfil,
            (false, _) => DialogStep::Delegate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotCheck {
    NonNegative,
    YesNo,
    CreditScore,
    Date,
    TermYears,
}

impl SlotCheck {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::NonNegative => isvalid_zero_or_greater(value),
            Self::YesNo => isvalid_yes_or_no(value),
            Self::CreditScore => isvalid_credit_score(value),
            Self::Date => isvalid_date(value),
            Self::TermYears => value.trim().parse::<u32>().is_ok_and(|years| {
                (1..=crate::calculator::MAX_TERM_YEARS).contains(&years)
            }),
        }
    }
}

/// One slot of a slot-filling intent: the prompt used while it is empty and
/// the message used when its value fails `check` (`{value}` is substituted).
#[derive(Clone, Copy, Debug)]
pub struct SlotRule {
    pub slot: &'static str,
    pub check: SlotCheck,
    pub prompt: &'static str,
    pub invalid_message: &'static str,
}

/// Validates `rules` in order and stops at the first empty or invalid slot.
pub fn validate_slots(intent: &Intent, rules: &[SlotRule]) -> ValidationResult {
    for rule in rules {
        match intent.slot_value(rule.slot) {
            None => return ValidationResult::invalid(rule.slot, rule.prompt),
            Some(value) if !rule.check.accepts(value) => {
                return ValidationResult::invalid(
                    rule.slot,
                    rule.invalid_message.replace("{value}", value),
                );
            }
            Some(_) => {}
        }
    }
    ValidationResult::valid()
}
