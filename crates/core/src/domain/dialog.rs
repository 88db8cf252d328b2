//! Wire types for one dialog-engine turn.
//!
//! The request side mirrors the subset of the Lex V2 Lambda input the handlers
//! read; the response side is the `sessionState` + `messages` envelope the
//! engine expects back. Field names follow the engine's camelCase JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

pub type Attributes = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogTurnRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub input_transcript: String,
    #[serde(default)]
    pub invocation_source: InvocationSource,
    pub session_state: SessionState,
}

impl DialogTurnRequest {
    pub fn intent_name(&self) -> &str {
        &self.session_state.intent.name
    }

    pub fn session_attributes(&self) -> &Attributes {
        &self.session_state.session_attributes
    }

    pub fn session_attributes_mut(&mut self) -> &mut Attributes {
        &mut self.session_state.session_attributes
    }

    pub fn intent(&self) -> &Intent {
        &self.session_state.intent
    }

    pub fn intent_mut(&mut self) -> &mut Intent {
        &mut self.session_state.intent
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationSource {
    #[default]
    DialogCodeHook,
    FulfillmentCodeHook,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_contexts: Vec<ActiveContext>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_attributes: Attributes,
    pub intent: Intent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: BTreeMap<String, Option<Slot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IntentState>,
    #[serde(default)]
    pub confirmation_state: ConfirmationState,
}

impl Intent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: BTreeMap::new(),
            state: None,
            confirmation_state: ConfirmationState::None,
        }
    }

    /// Effective value of a slot, `None` while the user has not provided it.
    pub fn slot_value(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).and_then(Option::as_ref).and_then(Slot::effective_value)
    }

    pub fn set_slot(&mut self, slot: &str, value: impl Into<String>) {
        self.slots.insert(slot.to_string(), Some(Slot::scalar(value)));
    }

    pub fn clear_slot(&mut self, slot: &str) {
        self.slots.insert(slot.to_string(), None);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    Failed,
    Fulfilled,
    FulfillmentInProgress,
    InProgress,
    ReadyForFulfillment,
    Waiting,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationState {
    #[default]
    None,
    Confirmed,
    Denied,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default = "scalar_shape")]
    pub shape: String,
    #[serde(default)]
    pub value: SlotValue,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_value: Option<String>,
    #[serde(default)]
    pub resolved_values: Vec<String>,
}

impl Slot {
    pub fn scalar(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            shape: scalar_shape(),
            value: SlotValue {
                original_value: Some(value.clone()),
                interpreted_value: Some(value.clone()),
                resolved_values: vec![value],
            },
        }
    }

    /// Interpreted value once the engine resolved the slot, otherwise the raw
    /// text the user typed.
    pub fn effective_value(&self) -> Option<&str> {
        if !self.value.resolved_values.is_empty() {
            return self.value.interpreted_value.as_deref();
        }
        self.value.original_value.as_deref().filter(|value| !value.is_empty())
    }
}

fn scalar_shape() -> String {
    "Scalar".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveContext {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context_attributes: Attributes,
    #[serde(default)]
    pub time_to_live: TimeToLive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToLive {
    pub time_to_live_in_seconds: u32,
    pub turns_to_live: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub session_state: ResponseSessionState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl DialogResponse {
    pub fn action(&self) -> &DialogAction {
        &self.session_state.dialog_action
    }

    pub fn plain_text(&self) -> Option<&str> {
        self.messages.iter().find_map(|message| match message {
            Message::PlainText { content } => Some(content.as_str()),
            Message::ImageResponseCard { .. } => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_contexts: Vec<ActiveContext>,
    #[serde(default)]
    pub session_attributes: Attributes,
    pub dialog_action: DialogAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DialogAction {
    ElicitSlot {
        #[serde(rename = "slotToElicit")]
        slot_to_elicit: String,
    },
    ConfirmIntent,
    Close,
    ElicitIntent,
    Delegate,
}

impl DialogAction {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ElicitSlot { .. } => "ElicitSlot",
            Self::ConfirmIntent => "ConfirmIntent",
            Self::Close => "Close",
            Self::ElicitIntent => "ElicitIntent",
            Self::Delegate => "Delegate",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "contentType")]
pub enum Message {
    PlainText {
        content: String,
    },
    ImageResponseCard {
        #[serde(rename = "imageResponseCard")]
        image_response_card: ImageResponseCard,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponseCard {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub value: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ConfirmationState, DialogTurnRequest, InvocationSource, Slot};

    #[test]
    fn request_parses_engine_payload_with_null_slots() {
        let request: DialogTurnRequest = serde_json::from_value(json!({
            "sessionId": "sess-1",
            "inputTranscript": "my username is jdoe",
            "invocationSource": "DialogCodeHook",
            "sessionState": {
                "sessionAttributes": null,
                "intent": {
                    "name": "VerifyIdentity",
                    "state": "InProgress",
                    "confirmationState": "None",
                    "slots": {
                        "UserName": {
                            "shape": "Scalar",
                            "value": {
                                "originalValue": "jdoe",
                                "interpretedValue": "jdoe",
                                "resolvedValues": ["jdoe"]
                            }
                        },
                        "Pin": null
                    }
                }
            }
        }))
        .expect("engine payload should parse");

        assert_eq!(request.intent_name(), "VerifyIdentity");
        assert_eq!(request.invocation_source, InvocationSource::DialogCodeHook);
        assert_eq!(request.intent().confirmation_state, ConfirmationState::None);
        assert_eq!(request.intent().slot_value("UserName"), Some("jdoe"));
        assert_eq!(request.intent().slot_value("Pin"), None);
        assert_eq!(request.intent().slot_value("Missing"), None);
        assert!(request.session_attributes().is_empty());
    }

    #[test]
    fn unresolved_slot_falls_back_to_original_text() {
        let mut slot = Slot::scalar("1234");
        slot.value.resolved_values.clear();
        slot.value.interpreted_value = None;
        assert_eq!(slot.effective_value(), Some("1234"));

        slot.value.original_value = Some(String::new());
        assert_eq!(slot.effective_value(), None);
    }

    #[test]
    fn resolved_slot_prefers_interpreted_value() {
        let mut slot = Slot::scalar("five hundred");
        slot.value.interpreted_value = Some("500".to_string());
        assert_eq!(slot.effective_value(), Some("500"));
    }

    #[test]
    fn cleared_slot_serializes_as_null() {
        let mut request: DialogTurnRequest = serde_json::from_value(json!({
            "sessionState": { "intent": { "name": "VerifyIdentity", "slots": {} } }
        }))
        .expect("minimal payload should parse");

        request.intent_mut().set_slot("UserName", "jdoe");
        request.intent_mut().clear_slot("UserName");

        let value = serde_json::to_value(request.intent()).expect("intent serializes");
        assert_eq!(value["slots"]["UserName"], serde_json::Value::Null);
    }
}
