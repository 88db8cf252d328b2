use lendbot_core::intents::account_summary;
use lendbot_core::ports::AccountStore;
use lendbot_db::repositories::SqlAccountRepository;
use lendbot_db::{connect_with_settings, migrations, DemoAccounts};

type TestResult<T = ()> = Result<T, String>;

async fn seeded_repository() -> TestResult<SqlAccountRepository> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|e| format!("connect: {e}"))?;
    migrations::run_pending(&pool).await.map_err(|e| format!("migrate: {e}"))?;
    DemoAccounts::load(&pool).await.map_err(|e| format!("seed: {e}"))?;
    Ok(SqlAccountRepository::new(pool))
}

#[tokio::test]
async fn seeded_user_with_two_plans_is_summarised_by_the_last_one() -> TestResult {
    let repository = seeded_repository().await?;

    let records = repository.find_accounts("mgarcia").await.map_err(|e| e.to_string())?;
    if records.len() != 2 {
        return Err(format!("expected two plans, found {}", records.len()));
    }

    let summary = account_summary(&records, "Octank Financial");
    if !summary.starts_with("I see you have a Savings account with Octank Financial.") {
        return Err(format!("unexpected summary: {summary}"));
    }
    if !summary.contains("2026-11-05") {
        return Err(format!("summary should use the checking due date: {summary}"));
    }
    Ok(())
}

#[tokio::test]
async fn seeded_pins_are_numeric() -> TestResult {
    let repository = seeded_repository().await?;

    for (user, pin) in [("jdoe", 1234), ("asmith", 4321), ("mgarcia", 2468)] {
        let records = repository.find_accounts(user).await.map_err(|e| e.to_string())?;
        let first = records.first().ok_or_else(|| format!("{user} was not seeded"))?;
        if first.numeric_pin() != Some(pin) {
            return Err(format!("{user} has an unexpected pin"));
        }
    }
    Ok(())
}
