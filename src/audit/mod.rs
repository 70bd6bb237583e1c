/// Append-only audit log of card link and unlink actions
use crate::error::{CardError, CardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Audited binding action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Link,
    Unlink,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Link => "link",
            AuditAction::Unlink => "unlink",
        }
    }
}

/// One audit record; rows are never updated or deleted
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub card_id: String,
    pub account_id: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

/// Audit log over the card_link_history table
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    /// Create a new audit log
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry for a successful link/unlink
    pub async fn append(
        &self,
        card_id: &str,
        account_id: &str,
        action: AuditAction,
    ) -> CardResult<()> {
        sqlx::query(
            "INSERT INTO card_link_history (card_id, account_id, action, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(card_id)
        .bind(account_id)
        .bind(action.as_str())
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(CardError::Database)?;

        Ok(())
    }

    /// History for one card, oldest first
    pub async fn list_for_card(&self, card_id: &str) -> CardResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM card_link_history WHERE card_id = ?1 ORDER BY id ASC",
        )
        .bind(card_id)
        .fetch_all(&self.db)
        .await
        .map_err(CardError::Database)?;

        Ok(entries)
    }
}
