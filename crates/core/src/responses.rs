//! Builders for the five dialog actions the engine understands.
//!
//! Every builder returns exactly one `dialogAction`. Context-bearing actions
//! carry the `intentContext` block so the engine keeps the conversation's
//! context alive for a day or twenty turns.

use crate::domain::dialog::{
    ActiveContext, Attributes, Button, DialogAction, DialogResponse, ImageResponseCard, Intent,
    IntentState, Message, ResponseSessionState, TimeToLive,
};

pub const INTENT_CONTEXT_NAME: &str = "intentContext";
pub const CONTEXT_TTL_SECONDS: u32 = 86_400;
pub const CONTEXT_TURNS_TO_LIVE: u32 = 20;

pub const QUICK_REPLY_TITLE: &str = "How can I help you?";
pub const QUICK_REPLIES: [(&str, &str); 3] = [
    ("Loan Application", "Loan Application"),
    ("Loan Calculator", "Loan Calculator"),
    ("Ask GenAI", "What kind of questions can the Assistant answer?"),
];

pub fn intent_context(context_attributes: Attributes) -> ActiveContext {
    ActiveContext {
        name: INTENT_CONTEXT_NAME.to_string(),
        context_attributes,
        time_to_live: TimeToLive {
            time_to_live_in_seconds: CONTEXT_TTL_SECONDS,
            turns_to_live: CONTEXT_TURNS_TO_LIVE,
        },
    }
}

pub fn quick_reply_card() -> ImageResponseCard {
    ImageResponseCard {
        title: QUICK_REPLY_TITLE.to_string(),
        sub_title: None,
        buttons: QUICK_REPLIES
            .iter()
            .map(|(text, value)| Button { text: (*text).to_string(), value: (*value).to_string() })
            .collect(),
    }
}

/// Asks for `slot_to_elicit`. The slot is cleared on the returned intent so
/// the engine never re-prompts while holding a stale value.
pub fn elicit_slot(
    session_attributes: Attributes,
    context_attributes: Attributes,
    mut intent: Intent,
    slot_to_elicit: &str,
    message: impl Into<String>,
) -> DialogResponse {
    intent.clear_slot(slot_to_elicit);
    DialogResponse {
        session_state: ResponseSessionState {
            active_contexts: vec![intent_context(context_attributes)],
            session_attributes,
            dialog_action: DialogAction::ElicitSlot { slot_to_elicit: slot_to_elicit.to_string() },
            intent: Some(intent),
        },
        messages: vec![plain_text(message)],
    }
}

pub fn confirm_intent(
    session_attributes: Attributes,
    context_attributes: Attributes,
    intent: Intent,
    message: impl Into<String>,
) -> DialogResponse {
    DialogResponse {
        session_state: ResponseSessionState {
            active_contexts: vec![intent_context(context_attributes)],
            session_attributes,
            dialog_action: DialogAction::ConfirmIntent,
            intent: Some(intent),
        },
        messages: vec![plain_text(message)],
    }
}

pub fn close(
    session_attributes: Attributes,
    context_attributes: Attributes,
    fulfillment_state: IntentState,
    mut intent: Intent,
    message: impl Into<String>,
) -> DialogResponse {
    intent.state = Some(fulfillment_state);
    DialogResponse {
        session_state: ResponseSessionState {
            active_contexts: vec![intent_context(context_attributes)],
            session_attributes,
            dialog_action: DialogAction::Close,
            intent: Some(intent),
        },
        messages: vec![plain_text(message)],
    }
}

/// Hands the turn back to the user with an open prompt and the quick-reply
/// card; no intent is carried.
pub fn elicit_intent(session_attributes: Attributes, message: impl Into<String>) -> DialogResponse {
    DialogResponse {
        session_state: ResponseSessionState {
            active_contexts: Vec::new(),
            session_attributes,
            dialog_action: DialogAction::ElicitIntent,
            intent: None,
        },
        messages: vec![
            plain_text(message),
            Message::ImageResponseCard { image_response_card: quick_reply_card() },
        ],
    }
}

pub fn delegate(
    session_attributes: Attributes,
    context_attributes: Attributes,
    intent: Intent,
) -> DialogResponse {
    DialogResponse {
        session_state: ResponseSessionState {
            active_contexts: vec![intent_context(context_attributes)],
            session_attributes,
            dialog_action: DialogAction::Delegate,
            intent: Some(intent),
        },
        messages: Vec::new(),
    }
}

pub fn build_slot(intent: &mut Intent, slot: &str, value: impl Into<String>) {
    intent.set_slot(slot, value);
}

fn plain_text(content: impl Into<String>) -> Message {
    Message::PlainText { content: content.into() }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        build_slot, close, confirm_intent, delegate, elicit_intent, elicit_slot, QUICK_REPLIES,
    };
    use crate::domain::dialog::{Attributes, DialogAction, Intent, IntentState, Message};

    fn attributes() -> Attributes {
        Attributes::from([("UserName".to_string(), "jdoe".to_string())])
    }

    #[test]
    fn elicit_slot_clears_the_requested_slot() {
        let mut intent = Intent::named("VerifyIdentity");
        build_slot(&mut intent, "Pin", "9999");

        let response =
            elicit_slot(attributes(), Attributes::new(), intent, "Pin", "Please try again.");

        assert_eq!(
            response.action(),
            &DialogAction::ElicitSlot { slot_to_elicit: "Pin".to_string() }
        );
        let intent = response.session_state.intent.as_ref().expect("intent is carried");
        assert_eq!(intent.slot_value("Pin"), None);
        assert_eq!(response.plain_text(), Some("Please try again."));
    }

    #[test]
    fn elicit_slot_serializes_to_engine_shape() {
        let response = elicit_slot(
            attributes(),
            Attributes::new(),
            Intent::named("VerifyIdentity"),
            "UserName",
            "Who are you?",
        );

        let value = serde_json::to_value(&response).expect("response serializes");
        assert_eq!(
            value["sessionState"]["dialogAction"],
            json!({ "type": "ElicitSlot", "slotToElicit": "UserName" })
        );
        assert_eq!(
            value["sessionState"]["activeContexts"][0],
            json!({
                "name": "intentContext",
                "contextAttributes": {},
                "timeToLive": { "timeToLiveInSeconds": 86400, "turnsToLive": 20 }
            })
        );
        assert_eq!(value["sessionState"]["sessionAttributes"]["UserName"], "jdoe");
        assert_eq!(
            value["messages"][0],
            json!({ "contentType": "PlainText", "content": "Who are you?" })
        );
    }

    #[test]
    fn elicit_intent_always_offers_three_quick_replies() {
        for message in ["", "Hello", "A much longer answer from the assistant."] {
            let response = elicit_intent(Attributes::new(), message);
            assert_eq!(response.action(), &DialogAction::ElicitIntent);
            assert!(response.session_state.intent.is_none());
            assert!(response.session_state.active_contexts.is_empty());

            let card = response
                .messages
                .iter()
                .find_map(|message| match message {
                    Message::ImageResponseCard { image_response_card } => {
                        Some(image_response_card)
                    }
                    Message::PlainText { .. } => None,
                })
                .expect("quick reply card is present");
            assert_eq!(card.title, "How can I help you?");
            let labels = card.buttons.iter().map(|button| button.text.as_str()).collect::<Vec<_>>();
            assert_eq!(labels, vec!["Loan Application", "Loan Calculator", "Ask GenAI"]);
            assert_eq!(card.buttons[2].value, QUICK_REPLIES[2].1);
        }
    }

    #[test]
    fn elicit_intent_card_serializes_with_content_type_tag() {
        let value = serde_json::to_value(elicit_intent(Attributes::new(), "Hi"))
            .expect("response serializes");

        assert_eq!(value["sessionState"]["dialogAction"], json!({ "type": "ElicitIntent" }));
        assert_eq!(value["messages"][1]["contentType"], "ImageResponseCard");
        assert_eq!(value["messages"][1]["imageResponseCard"]["buttons"][0]["text"], "Loan Application");
        assert!(value["sessionState"].get("intent").is_none());
    }

    #[test]
    fn close_marks_intent_state() {
        let response = close(
            Attributes::new(),
            Attributes::new(),
            IntentState::Failed,
            Intent::named("LoanApplication"),
            "Cancelled.",
        );

        assert_eq!(response.action(), &DialogAction::Close);
        assert_eq!(
            response.session_state.intent.as_ref().and_then(|intent| intent.state),
            Some(IntentState::Failed)
        );
    }

    #[test]
    fn confirm_and_delegate_carry_intent_context() {
        let confirm = confirm_intent(
            Attributes::new(),
            Attributes::new(),
            Intent::named("LoanApplication"),
            "Submit?",
        );
        let delegated = delegate(Attributes::new(), Attributes::new(), Intent::named("VerifyIdentity"));

        assert_eq!(confirm.action().type_name(), "ConfirmIntent");
        assert_eq!(delegated.action().type_name(), "Delegate");
        assert_eq!(confirm.session_state.active_contexts[0].name, "intentContext");
        assert_eq!(delegated.session_state.active_contexts[0].time_to_live.turns_to_live, 20);
        assert!(delegated.messages.is_empty());
    }
}
