pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lendbot_core::config::{AccountsBackend, ConfigOverrides, LlmProvider, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "lendbot",
    about = "Lendbot operator CLI",
    long_about = "Prepare the local account store, inspect configuration, and replay dialog turns \
                  through the same dispatcher the Lambda handler uses.",
    after_help = "Examples:\n  lendbot migrate\n  lendbot seed --database-url sqlite://lendbot.db\n  \
                  lendbot config\n  lendbot invoke --event events/verify_identity.json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a lendbot.toml file (required to exist if given)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override accounts.backend (dynamodb|sqlite|memory)")]
    accounts_backend: Option<AccountsBackend>,
    #[arg(long, global = true, help = "Override accounts.database_url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override llm.provider (bedrock|ollama|openai)")]
    llm_provider: Option<LlmProvider>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending sqlite migrations to the account store")]
    Migrate,
    #[command(about = "Load the demo accounts into the sqlite account store")]
    Seed,
    #[command(about = "Show the effective configuration with sources and secrets redacted")]
    Config,
    #[command(about = "Run one dialog turn from a JSON event file and print the response")]
    Invoke {
        #[arg(long, help = "Path to a dialog turn event (JSON)")]
        event: PathBuf,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                accounts_backend: self.accounts_backend,
                database_url: self.database_url.clone(),
                llm_provider: self.llm_provider,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match &cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Config => commands::config::run(&options),
        Command::Invoke { event } => commands::invoke::run(&options, event),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use lendbot_core::config::AccountsBackend;

    use super::{Cli, Command};

    #[test]
    fn global_flags_become_overrides() {
        let cli = Cli::parse_from([
            "lendbot",
            "seed",
            "--accounts-backend",
            "sqlite",
            "--database-url",
            "sqlite::memory:",
        ]);

        assert!(matches!(cli.command, Command::Seed));
        let options = cli.load_options();
        assert!(!options.require_file);
        assert_eq!(options.overrides.accounts_backend, Some(AccountsBackend::Sqlite));
        assert_eq!(options.overrides.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let cli = Cli::parse_from(["lendbot", "--config", "ops/lendbot.toml", "config"]);
        assert!(cli.load_options().require_file);
    }

    #[test]
    fn unknown_backend_is_rejected_by_the_parser() {
        let parsed = Cli::try_parse_from(["lendbot", "migrate", "--accounts-backend", "redis"]);
        assert!(parsed.is_err());
    }
}
