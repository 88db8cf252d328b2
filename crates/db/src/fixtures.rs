use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Seeded demo customers and the plans each one must hold after loading.
const DEMO_USERS: &[DemoUser] = &[
    DemoUser { user_name: "jdoe", plans: &["mortgage"], description: "Mortgage holder" },
    DemoUser { user_name: "asmith", plans: &["Checking"], description: "Checking account only" },
    DemoUser {
        user_name: "mgarcia",
        plans: &["Loan", "checking"],
        description: "Personal loan plus checking",
    },
];

struct DemoUser {
    user_name: &'static str,
    plans: &'static [&'static str],
    description: &'static str,
}

/// Demo accounts for local runs of the dialog handler against sqlite.
pub struct DemoAccounts;

impl DemoAccounts {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_accounts.sql");

    /// Loads the demo rows. Reloading replaces them in place.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let users_seeded = DEMO_USERS
            .iter()
            .map(|user| SeededUser {
                user_name: user.user_name,
                plan_count: user.plans.len(),
                description: user.description,
            })
            .collect();

        Ok(SeedResult { users_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user in DEMO_USERS {
            let plans: Vec<String> = sqlx::query_scalar(
                "SELECT plan_name FROM user_accounts WHERE user_name = ?1 ORDER BY rowid",
            )
            .bind(user.user_name)
            .fetch_all(pool)
            .await?;
            let matches = plans.len() == user.plans.len()
                && plans.iter().zip(user.plans).all(|(actual, expected)| actual == expected);
            checks.push((user.user_name, matches));

            let pins: i64 = sqlx::query_scalar(
                "SELECT COUNT(DISTINCT pin) FROM user_accounts WHERE user_name = ?1",
            )
            .bind(user.user_name)
            .fetch_one(pool)
            .await?;
            checks.push(("pin", pins == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for user in DEMO_USERS {
            sqlx::query("DELETE FROM user_accounts WHERE user_name = ?1")
                .bind(user.user_name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub users_seeded: Vec<SeededUser>,
}

#[derive(Debug)]
pub struct SeededUser {
    pub user_name: &'static str,
    pub plan_count: usize,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let pool = migrated_pool().await;

        let first = DemoAccounts::load(&pool).await.expect("load");
        let first_check = DemoAccounts::verify(&pool).await.expect("verify");
        assert!(first_check.all_present, "{:?}", first_check.checks);
        assert_eq!(first.users_seeded.len(), 3);

        DemoAccounts::load(&pool).await.expect("reload");
        let second_check = DemoAccounts::verify(&pool).await.expect("re-verify");
        assert_eq!(first_check.checks, second_check.checks);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_accounts")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(rows, 4);
    }

    #[tokio::test]
    async fn clean_removes_demo_users() {
        let pool = migrated_pool().await;
        DemoAccounts::load(&pool).await.expect("load");
        DemoAccounts::clean(&pool).await.expect("clean");

        let verification = DemoAccounts::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
    }
}
