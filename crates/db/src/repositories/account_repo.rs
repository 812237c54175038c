//! Repository for the `accounts` table.

use sqlx::PgPool;

use crate::models::account::Account;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "uid, credits, plan, last_renewed, created_at, updated_at";

/// Provides reconciliation and lookup operations for accounts.
pub struct AccountRepo;

impl AccountRepo {
    /// Apply a subscription renewal grant: add `credits` to the balance,
    /// switch to `plan`, and stamp `last_renewed`.
    ///
    /// A single upsert statement, so concurrent webhook deliveries for the
    /// same uid serialize inside PostgreSQL and the increment stays additive
    /// rather than overwriting. A first-time subscriber gets their row
    /// created implicitly.
    pub async fn apply_grant(
        pool: &PgPool,
        uid: &str,
        credits: i64,
        plan: &str,
    ) -> Result<Account, sqlx::Error> {
        let query = format!(
            "INSERT INTO accounts (uid, credits, plan, last_renewed)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (uid) DO UPDATE SET
                credits = accounts.credits + EXCLUDED.credits,
                plan = EXCLUDED.plan,
                last_renewed = now(),
                updated_at = now()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(uid)
            .bind(credits)
            .bind(plan)
            .fetch_one(pool)
            .await
    }

    /// Find an account by identity-provider uid.
    pub async fn find_by_uid(pool: &PgPool, uid: &str) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE uid = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await
    }
}
