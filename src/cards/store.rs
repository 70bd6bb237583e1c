/// Card store: durable card-to-account bindings keyed by card_id
///
/// Every mutation is a single conditional statement whose WHERE clause
/// carries the unbound/ownership check, so concurrent callers race on the
/// database write itself rather than on a read-then-write sequence.
use crate::cards::CardBinding;
use crate::error::{CardError, CardResult};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Outcome of the conditional create-or-bind write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindWrite {
    /// Row created or previously unbound row claimed
    Bound,
    /// Row exists and is already bound; nothing written
    Conflict,
}

/// Card binding store
pub struct CardStore {
    db: SqlitePool,
}

impl CardStore {
    /// Create a new card store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Look up a binding by physical card identifier
    pub async fn get_by_card_id(&self, card_id: &str) -> CardResult<Option<CardBinding>> {
        let card = sqlx::query_as::<_, CardBinding>("SELECT * FROM card WHERE card_id = ?1")
            .bind(card_id)
            .fetch_optional(&self.db)
            .await
            .map_err(CardError::Database)?;

        Ok(card)
    }

    /// List all bindings owned by an account, most-recently-linked first
    pub async fn list_by_account(&self, account_id: &str) -> CardResult<Vec<CardBinding>> {
        let cards = sqlx::query_as::<_, CardBinding>(
            "SELECT * FROM card WHERE account_id = ?1 ORDER BY linked_at DESC, id ASC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(CardError::Database)?;

        Ok(cards)
    }

    /// Create the row, or claim it if it exists and is currently unbound.
    ///
    /// Single atomic upsert: the `WHERE card.account_id IS NULL` guard on the
    /// conflict arm means a concurrent bind of the same card leaves exactly
    /// one winner; the loser sees zero affected rows and gets `Conflict`.
    pub async fn create_or_bind_unowned(
        &self,
        card_id: &str,
        account_id: &str,
        default_url: &str,
    ) -> CardResult<BindWrite> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO card (id, card_id, account_id, default_url, linked_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)
             ON CONFLICT(card_id) DO UPDATE SET
                 account_id = excluded.account_id,
                 default_url = excluded.default_url,
                 linked_at = excluded.linked_at,
                 updated_at = excluded.updated_at
             WHERE card.account_id IS NULL",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(card_id)
        .bind(account_id)
        .bind(default_url)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(CardError::Database)?;

        if result.rows_affected() == 1 {
            Ok(BindWrite::Bound)
        } else {
            Ok(BindWrite::Conflict)
        }
    }

    /// Clear the binding if the caller owns it. The row is kept for reuse.
    ///
    /// Returns false when the card is not currently owned by `account_id`
    /// (already unlinked, or bound to someone else).
    pub async fn unbind(&self, card_id: &str, account_id: &str) -> CardResult<bool> {
        let result = sqlx::query(
            "UPDATE card SET account_id = NULL, display_name = NULL, default_url = NULL,
                 is_party_mode = 0, party_link_url = NULL, party_link_label = NULL,
                 linked_at = NULL, updated_at = ?3
             WHERE card_id = ?1 AND account_id = ?2",
        )
        .bind(card_id)
        .bind(account_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(CardError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    /// Update party-mode fields, guarded by ownership
    pub async fn update_party_mode(
        &self,
        card_id: &str,
        account_id: &str,
        is_party_mode: bool,
        party_link_url: Option<&str>,
        party_link_label: Option<&str>,
    ) -> CardResult<bool> {
        let result = sqlx::query(
            "UPDATE card SET is_party_mode = ?3, party_link_url = ?4, party_link_label = ?5,
                 updated_at = ?6
             WHERE card_id = ?1 AND account_id = ?2",
        )
        .bind(card_id)
        .bind(account_id)
        .bind(is_party_mode)
        .bind(party_link_url)
        .bind(party_link_label)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(CardError::Database)?;

        Ok(result.rows_affected() == 1)
    }

    /// Update the default redirect URL, guarded by ownership
    pub async fn update_default_url(
        &self,
        card_id: &str,
        account_id: &str,
        default_url: &str,
    ) -> CardResult<bool> {
        let result = sqlx::query(
            "UPDATE card SET default_url = ?3, updated_at = ?4
             WHERE card_id = ?1 AND account_id = ?2",
        )
        .bind(card_id)
        .bind(account_id)
        .bind(default_url)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(CardError::Database)?;

        Ok(result.rows_affected() == 1)
    }
}
