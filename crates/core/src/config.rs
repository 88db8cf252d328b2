use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub accounts: AccountsConfig,
    pub artifacts: ArtifactsConfig,
    pub llm: LlmConfig,
    pub aws: AwsConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct AccountsConfig {
    pub backend: AccountsBackend,
    pub table_name: Option<String>,
    pub pending_table_name: Option<String>,
    pub database_url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ArtifactsConfig {
    pub bucket: Option<String>,
    pub key_prefix: String,
    pub presign_expiry_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_iterations: u32,
    pub memory_window: usize,
}

#[derive(Clone, Debug, Default)]
pub struct AwsConfig {
    pub region: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub company_name: String,
    pub persona_prefix: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountsBackend {
    Dynamodb,
    Sqlite,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Bedrock,
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub accounts_backend: Option<AccountsBackend>,
    pub database_url: Option<String>,
    pub artifacts_bucket: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            accounts: AccountsConfig {
                backend: AccountsBackend::Sqlite,
                table_name: None,
                pending_table_name: None,
                database_url: "sqlite://lendbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            artifacts: ArtifactsConfig {
                bucket: None,
                key_prefix: "applications".to_string(),
                presign_expiry_secs: 600,
            },
            llm: LlmConfig {
                provider: LlmProvider::Bedrock,
                model: "anthropic.claude-v2".to_string(),
                api_key: None,
                base_url: None,
                max_tokens: 350,
                timeout_secs: 60,
                max_iterations: 5,
                memory_window: 5,
            },
            aws: AwsConfig::default(),
            assistant: AssistantConfig {
                company_name: "Octank Financial".to_string(),
                persona_prefix: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for AccountsBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(Self::Dynamodb),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported accounts backend `{other}` (expected dynamodb|sqlite|memory)"
            ))),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bedrock" => Ok(Self::Bedrock),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected bedrock|ollama|openai)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        let mut backend_in_file = false;
        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            backend_in_file =
                patch.accounts.as_ref().is_some_and(|accounts| accounts.backend.is_some());
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("lendbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides(backend_in_file)?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Effective configuration as JSON with secrets replaced by a marker.
    pub fn redacted(&self) -> Value {
        json!({
            "accounts": {
                "backend": self.accounts.backend,
                "table_name": self.accounts.table_name,
                "pending_table_name": self.accounts.pending_table_name,
                "database_url": self.accounts.database_url,
                "max_connections": self.accounts.max_connections,
                "timeout_secs": self.accounts.timeout_secs,
            },
            "artifacts": {
                "bucket": self.artifacts.bucket,
                "key_prefix": self.artifacts.key_prefix,
                "presign_expiry_secs": self.artifacts.presign_expiry_secs,
            },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.model,
                "api_key": self.llm.api_key.as_ref().map(|_| "[redacted]"),
                "base_url": self.llm.base_url,
                "max_tokens": self.llm.max_tokens,
                "timeout_secs": self.llm.timeout_secs,
                "max_iterations": self.llm.max_iterations,
                "memory_window": self.llm.memory_window,
            },
            "aws": { "region": self.aws.region },
            "assistant": {
                "company_name": self.assistant.company_name,
                "persona_prefix": self.assistant.persona_prefix,
            },
            "logging": { "level": self.logging.level, "format": self.logging.format },
        })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(accounts) = patch.accounts {
            if let Some(backend) = accounts.backend {
                self.accounts.backend = backend;
            }
            if let Some(table_name) = accounts.table_name {
                self.accounts.table_name = Some(table_name);
            }
            if let Some(pending_table_name) = accounts.pending_table_name {
                self.accounts.pending_table_name = Some(pending_table_name);
            }
            if let Some(database_url) = accounts.database_url {
                self.accounts.database_url = database_url;
            }
            if let Some(max_connections) = accounts.max_connections {
                self.accounts.max_connections = max_connections;
            }
            if let Some(timeout_secs) = accounts.timeout_secs {
                self.accounts.timeout_secs = timeout_secs;
            }
        }

        if let Some(artifacts) = patch.artifacts {
            if let Some(bucket) = artifacts.bucket {
                self.artifacts.bucket = Some(bucket);
            }
            if let Some(key_prefix) = artifacts.key_prefix {
                self.artifacts.key_prefix = key_prefix;
            }
            if let Some(presign_expiry_secs) = artifacts.presign_expiry_secs {
                self.artifacts.presign_expiry_secs = presign_expiry_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(SecretString::from(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_iterations) = llm.max_iterations {
                self.llm.max_iterations = max_iterations;
            }
            if let Some(memory_window) = llm.memory_window {
                self.llm.memory_window = memory_window;
            }
        }

        if let Some(aws) = patch.aws {
            if let Some(region) = aws.region {
                self.aws.region = Some(region);
            }
        }

        if let Some(assistant) = patch.assistant {
            if let Some(company_name) = assistant.company_name {
                self.assistant.company_name = company_name;
            }
            if let Some(persona_prefix) = assistant.persona_prefix {
                self.assistant.persona_prefix = Some(persona_prefix);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    /// Without an explicit backend, the deployment table variables select
    /// DynamoDB.
    fn apply_env_overrides(&mut self, backend_in_file: bool) -> Result<(), ConfigError> {
        let explicit_backend = read_env("LENDBOT_ACCOUNTS_BACKEND");
        if let Some(value) = &explicit_backend {
            self.accounts.backend = value.parse()?;
        } else if !backend_in_file
            && (read_env("USER_EXISTING_ACCOUNTS_TABLE").is_some()
                || read_env("USER_PENDING_ACCOUNTS_TABLE").is_some())
        {
            self.accounts.backend = AccountsBackend::Dynamodb;
        }
        let table_name = read_env("LENDBOT_ACCOUNTS_TABLE_NAME")
            .or_else(|| read_env("USER_EXISTING_ACCOUNTS_TABLE"));
        if let Some(value) = table_name {
            self.accounts.table_name = Some(value);
        }
        let pending_table_name = read_env("LENDBOT_ACCOUNTS_PENDING_TABLE_NAME")
            .or_else(|| read_env("USER_PENDING_ACCOUNTS_TABLE"));
        if let Some(value) = pending_table_name {
            self.accounts.pending_table_name = Some(value);
        }
        if let Some(value) = read_env("LENDBOT_ACCOUNTS_DATABASE_URL") {
            self.accounts.database_url = value;
        }
        if let Some(value) = read_env("LENDBOT_ACCOUNTS_MAX_CONNECTIONS") {
            self.accounts.max_connections =
                parse_number("LENDBOT_ACCOUNTS_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LENDBOT_ACCOUNTS_TIMEOUT_SECS") {
            self.accounts.timeout_secs = parse_number("LENDBOT_ACCOUNTS_TIMEOUT_SECS", &value)?;
        }

        let bucket =
            read_env("LENDBOT_ARTIFACTS_BUCKET").or_else(|| read_env("S3_ARTIFACT_BUCKET_NAME"));
        if let Some(value) = bucket {
            self.artifacts.bucket = Some(value);
        }
        if let Some(value) = read_env("LENDBOT_ARTIFACTS_KEY_PREFIX") {
            self.artifacts.key_prefix = value;
        }
        if let Some(value) = read_env("LENDBOT_ARTIFACTS_PRESIGN_EXPIRY_SECS") {
            self.artifacts.presign_expiry_secs =
                parse_number("LENDBOT_ARTIFACTS_PRESIGN_EXPIRY_SECS", &value)?;
        }

        if let Some(value) = read_env("LENDBOT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("LENDBOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LENDBOT_LLM_API_KEY") {
            self.llm.api_key = Some(SecretString::from(value));
        }
        if let Some(value) = read_env("LENDBOT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LENDBOT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_number("LENDBOT_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("LENDBOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_number("LENDBOT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LENDBOT_LLM_MAX_ITERATIONS") {
            self.llm.max_iterations = parse_number("LENDBOT_LLM_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("LENDBOT_LLM_MEMORY_WINDOW") {
            self.llm.memory_window = parse_number("LENDBOT_LLM_MEMORY_WINDOW", &value)?;
        }

        if let Some(value) = read_env("LENDBOT_AWS_REGION").or_else(|| read_env("AWS_REGION")) {
            self.aws.region = Some(value);
        }

        if let Some(value) = read_env("LENDBOT_ASSISTANT_COMPANY_NAME") {
            self.assistant.company_name = value;
        }
        if let Some(value) = read_env("LENDBOT_ASSISTANT_PERSONA_PREFIX") {
            self.assistant.persona_prefix = Some(value);
        }

        let log_level = read_env("LENDBOT_LOGGING_LEVEL").or_else(|| read_env("LENDBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LENDBOT_LOGGING_FORMAT").or_else(|| read_env("LENDBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.accounts_backend {
            self.accounts.backend = backend;
        }
        if let Some(database_url) = overrides.database_url {
            self.accounts.database_url = database_url;
        }
        if let Some(bucket) = overrides.artifacts_bucket {
            self.artifacts.bucket = Some(bucket);
        }
        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_accounts(&self.accounts)?;
        validate_artifacts(&self.artifacts)?;
        validate_llm(&self.llm)?;
        validate_assistant(&self.assistant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("lendbot.toml"), PathBuf::from("config/lendbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references before the file is parsed.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let key = &after[..end];
        let value = env::var(key)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn validate_accounts(accounts: &AccountsConfig) -> Result<(), ConfigError> {
    match accounts.backend {
        AccountsBackend::Dynamodb => {
            for (key, value) in [
                ("accounts.table_name", &accounts.table_name),
                ("accounts.pending_table_name", &accounts.pending_table_name),
            ] {
                if value.as_deref().map(str::trim).unwrap_or_default().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "{key} is required for the dynamodb backend"
                    )));
                }
            }
        }
        AccountsBackend::Sqlite => {
            let url = accounts.database_url.trim();
            let sqlite_url =
                url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
            if !sqlite_url {
                return Err(ConfigError::Validation(
                    "accounts.database_url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                        .to_string(),
                ));
            }
        }
        AccountsBackend::Memory => {}
    }

    if accounts.max_connections == 0 {
        return Err(ConfigError::Validation(
            "accounts.max_connections must be greater than zero".to_string(),
        ));
    }

    if accounts.timeout_secs == 0 || accounts.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "accounts.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_artifacts(artifacts: &ArtifactsConfig) -> Result<(), ConfigError> {
    if artifacts.bucket.as_deref().is_some_and(|bucket| bucket.trim().is_empty()) {
        return Err(ConfigError::Validation("artifacts.bucket must not be blank".to_string()));
    }

    if artifacts.presign_expiry_secs == 0 || artifacts.presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS
    {
        return Err(ConfigError::Validation(format!(
            "artifacts.presign_expiry_secs must be in range 1..={MAX_PRESIGN_EXPIRY_SECS}"
        )));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.max_iterations == 0 || llm.max_iterations > 20 {
        return Err(ConfigError::Validation(
            "llm.max_iterations must be in range 1..=20".to_string(),
        ));
    }

    let base_url_missing =
        llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
    match llm.provider {
        LlmProvider::Bedrock => {}
        LlmProvider::Ollama => {
            if base_url_missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::OpenAi => {
            let key_missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if key_missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
            if base_url_missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the openai provider".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "assistant.company_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    accounts: Option<AccountsPatch>,
    artifacts: Option<ArtifactsPatch>,
    llm: Option<LlmPatch>,
    aws: Option<AwsPatch>,
    assistant: Option<AssistantPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AccountsPatch {
    backend: Option<AccountsBackend>,
    table_name: Option<String>,
    pending_table_name: Option<String>,
    database_url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtifactsPatch {
    bucket: Option<String>,
    key_prefix: Option<String>,
    presign_expiry_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_iterations: Option<u32>,
    memory_window: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AwsPatch {
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    company_name: Option<String>,
    persona_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
