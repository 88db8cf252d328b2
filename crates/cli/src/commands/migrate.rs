use lendbot_core::config::{AccountsBackend, LoadOptions};
use lendbot_db::{connect_with_settings, migrations};

use crate::commands::{build_runtime, load_config, CommandResult, StepError};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("migrate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    if config.accounts.backend != AccountsBackend::Sqlite {
        return CommandResult::failure(
            "migrate",
            "unsupported_backend",
            format!(
                "migrations only apply to the sqlite account store (configured: {:?})",
                config.accounts.backend
            ),
            2,
        );
    }

    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.accounts.database_url,
            config.accounts.max_connections,
            config.accounts.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), StepError>(())
    });

    match result {
        Ok(()) => CommandResult::success(
            "migrate",
            format!("applied pending migrations to {}", config.accounts.database_url),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
