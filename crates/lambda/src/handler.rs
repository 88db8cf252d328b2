use lambda_runtime::LambdaEvent;
use serde_json::Value;
use tracing::{error, info};

use lendbot_core::errors::InterfaceError;
use lendbot_core::responses::elicit_intent;
use lendbot_core::{DialogTurnRequest, IntentDispatcher};

/// Lambda entry point for one dialog turn.
pub async fn handle_event(
    dispatcher: &IntentDispatcher,
    event: LambdaEvent<Value>,
) -> Result<Value, lambda_runtime::Error> {
    let (payload, context) = event.into_parts();
    Ok(handle_turn(dispatcher, payload, &context.request_id).await?)
}

/// Runs a raw engine payload through the dispatcher. Dialog failures become
/// an `ElicitIntent` carrying a user-safe message; only a payload that is not
/// a dialog turn at all is returned as an error.
pub async fn handle_turn(
    dispatcher: &IntentDispatcher,
    payload: Value,
    correlation_id: &str,
) -> Result<Value, InterfaceError> {
    let mut request: DialogTurnRequest = serde_json::from_value(payload).map_err(|e| {
        let failure = InterfaceError::BadRequest {
            message: e.to_string(),
            correlation_id: correlation_id.to_string(),
        };
        error!(
            event_name = "lambda.turn.rejected",
            correlation_id,
            error = %failure,
            "payload is not a dialog turn"
        );
        failure
    })?;
    let session_attributes = request.session_attributes().clone();

    let response = match dispatcher.dispatch(&mut request).await {
        Ok(response) => response,
        Err(failure) => {
            let failure = failure.into_interface(correlation_id);
            error!(
                event_name = "lambda.turn.failed",
                correlation_id,
                intent_name = %request.intent_name(),
                error = %failure,
                "dialog turn failed"
            );
            elicit_intent(session_attributes, failure.user_message())
        }
    };

    info!(
        event_name = "lambda.turn.responded",
        correlation_id,
        dialog_action = response.action().type_name(),
        "dialog turn answered"
    );
    serde_json::to_value(&response).map_err(|e| InterfaceError::Internal {
        message: e.to_string(),
        correlation_id: correlation_id.to_string(),
    })
}
