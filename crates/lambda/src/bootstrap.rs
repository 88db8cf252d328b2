use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use lendbot_agent::{BedrockClient, LlmBridge, LlmClient, OllamaClient, OpenAiClient};
use lendbot_core::config::{AccountsBackend, AppConfig, ConfigError, LlmProvider, LoadOptions};
use lendbot_core::ports::{AccountStore, ApplicationPublisher, ApplicationStore};
use lendbot_core::{DialogServices, DialogSettings, IntentDispatcher};
use lendbot_db::repositories::{
    DynamoAccountRepository, InMemoryAccountRepository, InMemoryApplicationRepository,
    SqlAccountRepository, SqlApplicationRepository,
};
use lendbot_db::{connect_with_settings, migrations};
use thiserror::Error;
use tracing::info;

use crate::document::{ApplicationRenderer, DocumentError, DocumentPublisher, S3DocumentStore};

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: IntentDispatcher,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    LlmClient(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("aws configuration was not loaded for {0}")]
    AwsNotLoaded(&'static str),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Builds every client once; the dispatcher shares them across invocations.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        accounts_backend = ?config.accounts.backend,
        llm_provider = ?config.llm.provider,
        "starting lendbot bootstrap"
    );

    let sdk_config = if needs_aws(&config) { Some(load_sdk_config(&config).await) } else { None };

    let (accounts, applications) = account_stores(&config, sdk_config.as_ref()).await?;
    let publisher = application_publisher(&config, sdk_config.as_ref())?;
    let llm = llm_client(&config, sdk_config.as_ref())?;

    let services = DialogServices {
        accounts,
        applications,
        publisher,
        genai: Arc::new(LlmBridge::from_config(llm, &config)),
        settings: DialogSettings { company_name: config.assistant.company_name.clone() },
    };

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        documents_enabled = services.publisher.is_some(),
        "dialog services ready"
    );

    Ok(Application { config, dispatcher: IntentDispatcher::new(services) })
}

fn needs_aws(config: &AppConfig) -> bool {
    config.accounts.backend == AccountsBackend::Dynamodb
        || config.artifacts.bucket.is_some()
        || config.llm.provider == LlmProvider::Bedrock
}

async fn load_sdk_config(config: &AppConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    loader.load().await
}

type AccountStores = (Arc<dyn AccountStore>, Arc<dyn ApplicationStore>);

async fn account_stores(
    config: &AppConfig,
    sdk_config: Option<&SdkConfig>,
) -> Result<AccountStores, BootstrapError> {
    match config.accounts.backend {
        AccountsBackend::Dynamodb => {
            let sdk_config = sdk_config.ok_or(BootstrapError::AwsNotLoaded("dynamodb"))?;
            let (Some(table), Some(pending)) =
                (&config.accounts.table_name, &config.accounts.pending_table_name)
            else {
                return Err(ConfigError::Validation(
                    "accounts.table_name and accounts.pending_table_name are required".to_string(),
                )
                .into());
            };
            let repository = Arc::new(DynamoAccountRepository::new(
                aws_sdk_dynamodb::Client::new(sdk_config),
                table.clone(),
                pending.clone(),
            ));
            Ok((repository.clone(), repository))
        }
        AccountsBackend::Sqlite => {
            let pool = connect_with_settings(
                &config.accounts.database_url,
                config.accounts.max_connections,
                config.accounts.timeout_secs,
            )
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "sqlite account store ready"
            );
            Ok((
                Arc::new(SqlAccountRepository::new(pool.clone())),
                Arc::new(SqlApplicationRepository::new(pool)),
            ))
        }
        AccountsBackend::Memory => Ok((
            Arc::new(InMemoryAccountRepository::default()),
            Arc::new(InMemoryApplicationRepository::default()),
        )),
    }
}

fn application_publisher(
    config: &AppConfig,
    sdk_config: Option<&SdkConfig>,
) -> Result<Option<Arc<dyn ApplicationPublisher>>, BootstrapError> {
    let (Some(bucket), Some(sdk_config)) = (&config.artifacts.bucket, sdk_config) else {
        return Ok(None);
    };
    let store =
        Arc::new(S3DocumentStore::new(aws_sdk_s3::Client::new(sdk_config), bucket.clone()));
    let publisher = DocumentPublisher::new(store, ApplicationRenderer::new()?, config);
    Ok(Some(Arc::new(publisher)))
}

fn llm_client(
    config: &AppConfig,
    sdk_config: Option<&SdkConfig>,
) -> Result<Arc<dyn LlmClient>, BootstrapError> {
    let client: Arc<dyn LlmClient> = match config.llm.provider {
        LlmProvider::Bedrock => {
            let sdk_config = sdk_config.ok_or(BootstrapError::AwsNotLoaded("bedrock"))?;
            Arc::new(BedrockClient::new(
                aws_sdk_bedrockruntime::Client::new(sdk_config),
                &config.llm,
            ))
        }
        LlmProvider::Ollama => Arc::new(
            OllamaClient::from_config(&config.llm)
                .map_err(|e| BootstrapError::LlmClient(format!("{e:#}")))?,
        ),
        LlmProvider::OpenAi => Arc::new(
            OpenAiClient::from_config(&config.llm)
                .map_err(|e| BootstrapError::LlmClient(format!("{e:#}")))?,
        ),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use lendbot_core::config::{AccountsBackend, AppConfig, LlmProvider};
    use lendbot_core::domain::dialog::DialogAction;
    use lendbot_core::DialogTurnRequest;
    use serde_json::json;

    use super::{bootstrap_with_config, BootstrapError};

    fn local_config(backend: AccountsBackend, provider: LlmProvider) -> AppConfig {
        let mut config = AppConfig::default();
        config.accounts.backend = backend;
        config.accounts.database_url = "sqlite::memory:".to_string();
        config.accounts.max_connections = 1;
        config.llm.provider = provider;
        config.llm.base_url = Some("http://127.0.0.1:11434".to_string());
        config
    }

    #[tokio::test]
    async fn local_stack_boots_without_aws() {
        for backend in [AccountsBackend::Memory, AccountsBackend::Sqlite] {
            let app = bootstrap_with_config(local_config(backend, LlmProvider::Ollama))
                .await
                .expect("local bootstrap should succeed");
            assert!(app.dispatcher.services().publisher.is_none());

            let mut request: DialogTurnRequest = serde_json::from_value(json!({
                "sessionState": {
                    "intent": {
                        "name": "VerifyIdentity",
                        "slots": {
                            "UserName": {
                                "value": {
                                    "originalValue": "ghost",
                                    "interpretedValue": "ghost",
                                    "resolvedValues": ["ghost"]
                                }
                            }
                        },
                        "state": "InProgress",
                        "confirmationState": "None"
                    }
                },
                "invocationSource": "DialogCodeHook"
            }))
            .expect("request");

            let response = app.dispatcher.dispatch(&mut request).await.expect("dispatch");
            assert!(matches!(response.action(), DialogAction::ElicitSlot { .. }));
        }
    }

    #[tokio::test]
    async fn openai_without_key_fails_fast() {
        let result =
            bootstrap_with_config(local_config(AccountsBackend::Memory, LlmProvider::OpenAi)).await;
        assert!(matches!(
            result,
            Err(BootstrapError::LlmClient(message)) if message.contains("api_key")
        ));
    }
}
