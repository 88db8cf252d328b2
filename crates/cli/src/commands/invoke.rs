use std::fs;
use std::path::Path;

use lendbot_core::config::LoadOptions;
use lendbot_core::errors::InterfaceError;
use lendbot_lambda::{bootstrap_with_config, handle_turn};
use serde_json::Value;

use crate::commands::{build_runtime, load_config, CommandResult, StepError};

const CORRELATION_ID: &str = "cli-invoke";

/// Replays one dialog turn from a file through the production dispatcher.
pub fn run(options: &LoadOptions, event_path: &Path) -> CommandResult {
    let event = match read_event(event_path) {
        Ok(event) => event,
        Err(message) => return CommandResult::failure("invoke", "event_read", message, 7),
    };

    let config = match load_config("invoke", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("invoke") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let app = bootstrap_with_config(config)
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 8u8))?;
        handle_turn(&app.dispatcher, event, CORRELATION_ID).await.map_err(turn_failure)
    });

    match result {
        Ok(response) => CommandResult::success_with_data(
            "invoke",
            format!("dialog turn handled ({CORRELATION_ID})"),
            Some(response),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("invoke", error_class, message, exit_code)
        }
    }
}

fn read_event(path: &Path) -> Result<Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read event `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("event `{}` is not valid JSON: {error}", path.display()))
}

fn turn_failure(error: InterfaceError) -> StepError {
    match &error {
        InterfaceError::BadRequest { .. } => ("bad_request", error.to_string(), 9),
        InterfaceError::ServiceUnavailable { .. } => ("service_unavailable", error.to_string(), 10),
        InterfaceError::Internal { .. } => ("internal", error.to_string(), 11),
    }
}
