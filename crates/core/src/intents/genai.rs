use tracing::{info, warn};

use super::DialogServices;
use crate::domain::dialog::{Attributes, DialogResponse, DialogTurnRequest, InvocationSource};
use crate::errors::DialogError;
use crate::responses::{delegate, elicit_intent};

/// Answers free-form utterances through the LLM bridge. Validation callbacks
/// are handed back to the engine untouched.
pub(crate) async fn handle(
    services: &DialogServices,
    request: &mut DialogTurnRequest,
) -> Result<DialogResponse, DialogError> {
    let session_attributes = request.session_attributes().clone();

    if request.invocation_source != InvocationSource::DialogCodeHook {
        return Ok(delegate(session_attributes, Attributes::new(), request.intent().clone()));
    }

    let answer = services.genai.answer(&request.input_transcript).await.inspect_err(|error| {
        warn!(event_name = "dialog.genai.failed", error = %error, "llm bridge failed");
    })?;
    info!(event_name = "dialog.genai.answered", answer_len = answer.len(), "llm bridge answered");

    Ok(elicit_intent(session_attributes, answer))
}
