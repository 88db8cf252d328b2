use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lendbot_core::config::LoadOptions;
use serde_json::{json, Map, Value};

use crate::commands::{load_config, CommandResult};

/// Config keys with the environment variables that can set them.
const TRACKED_FIELDS: &[(&str, &[&str])] = &[
    ("accounts.backend", &["LENDBOT_ACCOUNTS_BACKEND"]),
    ("accounts.table_name", &["LENDBOT_ACCOUNTS_TABLE_NAME", "USER_EXISTING_ACCOUNTS_TABLE"]),
    (
        "accounts.pending_table_name",
        &["LENDBOT_ACCOUNTS_PENDING_TABLE_NAME", "USER_PENDING_ACCOUNTS_TABLE"],
    ),
    ("accounts.database_url", &["LENDBOT_ACCOUNTS_DATABASE_URL"]),
    ("accounts.max_connections", &["LENDBOT_ACCOUNTS_MAX_CONNECTIONS"]),
    ("accounts.timeout_secs", &["LENDBOT_ACCOUNTS_TIMEOUT_SECS"]),
    ("artifacts.bucket", &["LENDBOT_ARTIFACTS_BUCKET", "S3_ARTIFACT_BUCKET_NAME"]),
    ("artifacts.key_prefix", &["LENDBOT_ARTIFACTS_KEY_PREFIX"]),
    ("artifacts.presign_expiry_secs", &["LENDBOT_ARTIFACTS_PRESIGN_EXPIRY_SECS"]),
    ("llm.provider", &["LENDBOT_LLM_PROVIDER"]),
    ("llm.model", &["LENDBOT_LLM_MODEL"]),
    ("llm.api_key", &["LENDBOT_LLM_API_KEY"]),
    ("llm.base_url", &["LENDBOT_LLM_BASE_URL"]),
    ("llm.max_tokens", &["LENDBOT_LLM_MAX_TOKENS"]),
    ("llm.timeout_secs", &["LENDBOT_LLM_TIMEOUT_SECS"]),
    ("llm.max_iterations", &["LENDBOT_LLM_MAX_ITERATIONS"]),
    ("llm.memory_window", &["LENDBOT_LLM_MEMORY_WINDOW"]),
    ("aws.region", &["LENDBOT_AWS_REGION", "AWS_REGION"]),
    ("assistant.company_name", &["LENDBOT_ASSISTANT_COMPANY_NAME"]),
    ("assistant.persona_prefix", &["LENDBOT_ASSISTANT_PERSONA_PREFIX"]),
    ("logging.level", &["LENDBOT_LOGGING_LEVEL", "LENDBOT_LOG_LEVEL"]),
    ("logging.format", &["LENDBOT_LOGGING_FORMAT", "LENDBOT_LOG_FORMAT"]),
];

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let file_path = detect_config_path(options.config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut sources = Map::new();
    for (key_path, env_keys) in TRACKED_FIELDS {
        let source = flag_source(key_path, options)
            .unwrap_or_else(|| field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref()));
        sources.insert((*key_path).to_string(), Value::String(source));
    }

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: flag > env > file > default)",
        Some(json!({ "config": config.redacted(), "sources": sources })),
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("lendbot.toml"), PathBuf::from("config/lendbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<toml::Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<toml::Value>().ok()
}

fn flag_source(key_path: &str, options: &LoadOptions) -> Option<String> {
    let overrides = &options.overrides;
    let flag = match key_path {
        "accounts.backend" => overrides.accounts_backend.map(|_| "--accounts-backend"),
        "accounts.database_url" => overrides.database_url.as_ref().map(|_| "--database-url"),
        "llm.provider" => overrides.llm_provider.map(|_| "--llm-provider"),
        _ => None,
    }?;
    Some(format!("flag ({flag})"))
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    file_doc: Option<&toml::Value>,
    file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = file_doc {
        if contains_path(doc, key_path) {
            let file_path = file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &toml::Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn nested_keys_are_found_in_the_file() {
        let doc: toml::Value =
            "[llm]\nprovider = \"ollama\"\n".parse().expect("toml should parse");
        assert!(contains_path(&doc, "llm.provider"));
        assert!(!contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "accounts.backend"));
    }
}
