use lendbot_core::config::{AccountsBackend, LoadOptions};
use lendbot_db::{connect_with_settings, migrations, DemoAccounts, SeededUser, VerificationResult};

use crate::commands::{build_runtime, load_config, CommandResult, StepError};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    if config.accounts.backend != AccountsBackend::Sqlite {
        return CommandResult::failure(
            "seed",
            "unsupported_backend",
            format!(
                "demo accounts can only be seeded into sqlite (configured: {:?})",
                config.accounts.backend
            ),
            2,
        );
    }

    let runtime = match build_runtime("seed") {
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

        let seeded = DemoAccounts::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoAccounts::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        if verification.all_present {
            Ok::<_, StepError>(seeded.users_seeded)
        } else {
            Err(("seed_verification", verification_message(&verification), 6u8))
        }
    });

    match result {
        Ok(users) => CommandResult::success("seed", seeded_message(&users)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seeded_message(users: &[SeededUser]) -> String {
    let lines: Vec<String> = users
        .iter()
        .map(|user| {
            format!("  - {} ({} plans): {}", user.user_name, user.plan_count, user.description)
        })
        .collect();
    format!("demo accounts loaded for {} users:\n{}", users.len(), lines.join("\n"))
}

fn verification_message(verification: &VerificationResult) -> String {
    let missing: Vec<&str> = verification
        .checks
        .iter()
        .filter_map(|(check, present)| (!present).then_some(*check))
        .collect();
    if missing.is_empty() {
        "some demo accounts failed to load".to_string()
    } else {
        format!("demo accounts missing after seeding: {}", missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use lendbot_db::{SeededUser, VerificationResult};

    use super::{seeded_message, verification_message};

    #[test]
    fn verification_message_names_missing_users() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![("jdoe", true), ("asmith", false), ("mgarcia", false)],
        };
        assert_eq!(
            verification_message(&verification),
            "demo accounts missing after seeding: asmith, mgarcia"
        );
    }

    #[test]
    fn verification_message_falls_back_without_labels() {
        let verification = VerificationResult { all_present: false, checks: Vec::new() };
        assert_eq!(verification_message(&verification), "some demo accounts failed to load");
    }

    #[test]
    fn seeded_message_lists_each_user() {
        let message = seeded_message(&[SeededUser {
            user_name: "jdoe",
            plan_count: 1,
            description: "mortgage customer",
        }]);
        assert!(message.starts_with("demo accounts loaded for 1 users:"));
        assert!(message.contains("  - jdoe (1 plans): mortgage customer"));
    }
}
