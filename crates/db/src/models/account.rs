//! Account entity model.

use animefactory_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// Full account row from the `accounts` table.
///
/// `uid` is the identity provider's stable user id, an opaque external
/// string. It is the natural primary key because it is the only join key
/// this system ever receives.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub uid: String,
    /// Non-negative spendable balance. Only ever moved by the webhook
    /// reconciler's additive upsert.
    pub credits: i64,
    pub plan: String,
    pub last_renewed: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
