use anyhow::Result;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;

use lendbot_core::config::{AppConfig, LoadOptions};
use lendbot_lambda::{bootstrap_with_config, handle_event, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap_with_config(config).await?;
    let dispatcher = &app.dispatcher;

    tracing::info!(
        event_name = "system.lambda.started",
        correlation_id = "bootstrap",
        "lendbot lambda waiting for events"
    );
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_event(dispatcher, event).await
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
