/// Binding service: business rules around the card store's mutators
///
/// The only caller of the store's mutating operations. Every mutation is
/// validated first, executed as a conditional write, and (for link/unlink)
/// followed by an audit append. Business refusals are `MutationOutcome`
/// values, not errors; `CardError` is reserved for storage failures.
use crate::audit::{AuditAction, AuditLog};
use crate::cards::store::{BindWrite, CardStore};
use crate::cards::{BindingDenied, MutationOutcome};
use crate::error::CardResult;
use crate::redirect::RedirectPolicy;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Card binding service
pub struct BindingService {
    store: Arc<CardStore>,
    audit: Arc<AuditLog>,
    policy: Arc<RedirectPolicy>,
}

impl BindingService {
    /// Create a new binding service
    pub fn new(store: Arc<CardStore>, audit: Arc<AuditLog>, policy: Arc<RedirectPolicy>) -> Self {
        Self {
            store,
            audit,
            policy,
        }
    }

    /// Bind a card to an account.
    ///
    /// Pre-checks classify an existing binding as self/other; the write
    /// itself is conditional on the card being unbound, so losing a race
    /// against a concurrent link surfaces as `AlreadyLinkedOther` too.
    pub async fn link(
        &self,
        card_id: &str,
        account_id: &str,
        default_url: &str,
    ) -> CardResult<MutationOutcome> {
        if !self.policy.is_valid_redirect_url(default_url) {
            return Ok(MutationOutcome::Denied(BindingDenied::InvalidDefaultUrl));
        }

        if let Some(existing) = self.store.get_by_card_id(card_id).await? {
            if let Some(owner) = existing.account_id.as_deref() {
                let denied = if owner == account_id {
                    BindingDenied::AlreadyLinkedSelf
                } else {
                    BindingDenied::AlreadyLinkedOther
                };
                return Ok(MutationOutcome::Denied(denied));
            }
        }

        match self
            .store
            .create_or_bind_unowned(card_id, account_id, default_url)
            .await?
        {
            BindWrite::Bound => {
                self.record_audit(card_id, account_id, AuditAction::Link).await;
                info!(card_id, account_id, "card linked");
                Ok(MutationOutcome::Applied)
            }
            // Lost the race: someone else claimed the card between the
            // lookup and the conditional write.
            BindWrite::Conflict => Ok(MutationOutcome::Denied(BindingDenied::AlreadyLinkedOther)),
        }
    }

    /// Release a binding. Idempotent: a card not owned by `account_id`
    /// (already unlinked, or owned by someone else) is a no-op.
    pub async fn unlink(&self, card_id: &str, account_id: &str) -> CardResult<MutationOutcome> {
        if self.store.unbind(card_id, account_id).await? {
            self.record_audit(card_id, account_id, AuditAction::Unlink).await;
            info!(card_id, account_id, "card unlinked");
            Ok(MutationOutcome::Applied)
        } else {
            debug!(card_id, account_id, "unlink did not match an owned card");
            Ok(MutationOutcome::NoOp)
        }
    }

    /// Update party-mode fields, guarded by ownership.
    ///
    /// When party mode is on, a non-empty link must pass redirect-URL
    /// validation before anything is written. Empty strings are stored as
    /// NULL.
    pub async fn set_party_mode(
        &self,
        card_id: &str,
        account_id: &str,
        is_party_mode: bool,
        party_link_url: Option<&str>,
        party_link_label: Option<&str>,
    ) -> CardResult<MutationOutcome> {
        let party_link_url = party_link_url.filter(|s| !s.is_empty());
        let party_link_label = party_link_label.filter(|s| !s.is_empty());

        if is_party_mode {
            if let Some(url) = party_link_url {
                if !self.policy.is_valid_redirect_url(url) {
                    return Ok(MutationOutcome::Denied(BindingDenied::InvalidPartyUrl));
                }
            }
        }

        if self
            .store
            .update_party_mode(card_id, account_id, is_party_mode, party_link_url, party_link_label)
            .await?
        {
            Ok(MutationOutcome::Applied)
        } else {
            debug!(card_id, account_id, "party-mode update did not match an owned card");
            Ok(MutationOutcome::NoOp)
        }
    }

    /// Update the default redirect URL, guarded by ownership
    pub async fn set_default_url(
        &self,
        card_id: &str,
        account_id: &str,
        default_url: &str,
    ) -> CardResult<MutationOutcome> {
        if !self.policy.is_valid_redirect_url(default_url) {
            return Ok(MutationOutcome::Denied(BindingDenied::InvalidDefaultUrl));
        }

        if self
            .store
            .update_default_url(card_id, account_id, default_url)
            .await?
        {
            Ok(MutationOutcome::Applied)
        } else {
            debug!(card_id, account_id, "default-url update did not match an owned card");
            Ok(MutationOutcome::NoOp)
        }
    }

    /// A lost audit write after a successful mutation does not undo the
    /// mutation; it is logged and tolerated.
    async fn record_audit(&self, card_id: &str, account_id: &str, action: AuditAction) {
        if let Err(e) = self.audit.append(card_id, account_id, action).await {
            warn!(
                card_id,
                account_id,
                action = action.as_str(),
                error = %e,
                "audit append failed after successful mutation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_service() -> (BindingService, Arc<CardStore>, Arc<AuditLog>) {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(sqlx::sqlite::SqliteConnectOptions::new().in_memory(true))
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let store = Arc::new(CardStore::new(pool.clone()));
        let audit = Arc::new(AuditLog::new(pool));
        let policy = Arc::new(RedirectPolicy::default());
        let service = BindingService::new(store.clone(), audit.clone(), policy);
        (service, store, audit)
    }

    #[tokio::test]
    async fn link_succeeds_and_writes_one_audit_entry() {
        let (service, store, audit) = test_service().await;

        let outcome = service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert_eq!(card.account_id.as_deref(), Some("alice.near"));

        let entries = audit.list_for_card("CARD1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "link");
        assert_eq!(entries[0].account_id, "alice.near");
    }

    #[tokio::test]
    async fn relink_by_owner_is_denied_as_self() {
        let (service, _, audit) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();
        let outcome = service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Denied(BindingDenied::AlreadyLinkedSelf)
        );

        // Denied link leaves no extra audit entry
        assert_eq!(audit.list_for_card("CARD1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn link_of_foreign_card_is_denied_as_other() {
        let (service, store, _) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();
        let outcome = service
            .link("CARD1", "bob.near", "https://app/u/bob")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Denied(BindingDenied::AlreadyLinkedOther)
        );

        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert_eq!(card.account_id.as_deref(), Some("alice.near"));
    }

    #[tokio::test]
    async fn link_rejects_non_https_default_url() {
        let (service, store, _) = test_service().await;

        let outcome = service
            .link("CARD1", "alice.near", "http://app/u/alice")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Denied(BindingDenied::InvalidDefaultUrl)
        );
        assert!(store.get_by_card_id("CARD1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unlink_is_idempotent_and_audits_once() {
        let (service, _, audit) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();

        let first = service.unlink("CARD1", "alice.near").await.unwrap();
        assert_eq!(first, MutationOutcome::Applied);
        let second = service.unlink("CARD1", "alice.near").await.unwrap();
        assert_eq!(second, MutationOutcome::NoOp);

        // One link + one unlink entry, the repeated unlink added nothing
        let entries = audit.list_for_card("CARD1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, "unlink");
    }

    #[tokio::test]
    async fn unlink_by_non_owner_changes_nothing() {
        let (service, store, audit) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();

        let outcome = service.unlink("CARD1", "bob.near").await.unwrap();
        assert_eq!(outcome, MutationOutcome::NoOp);

        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert_eq!(card.account_id.as_deref(), Some("alice.near"));
        assert_eq!(audit.list_for_card("CARD1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn party_mode_requires_https_link() {
        let (service, store, _) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();

        let outcome = service
            .set_party_mode("CARD1", "alice.near", true, Some("http://example.com"), Some("x"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Denied(BindingDenied::InvalidPartyUrl)
        );
        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert!(!card.is_party_mode);

        let outcome = service
            .set_party_mode("CARD1", "alice.near", true, Some("https://example.com"), Some("x"))
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert!(card.is_party_mode);
        assert_eq!(card.party_link_url.as_deref(), Some("https://example.com"));
        assert_eq!(card.party_link_label.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn party_mode_with_empty_link_stores_null() {
        let (service, store, _) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();
        let outcome = service
            .set_party_mode("CARD1", "alice.near", true, Some(""), Some(""))
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert!(card.is_party_mode);
        assert!(card.party_link_url.is_none());
        assert!(card.party_link_label.is_none());
    }

    #[tokio::test]
    async fn set_default_url_is_ownership_guarded_and_validated() {
        let (service, store, _) = test_service().await;

        service
            .link("CARD1", "alice.near", "https://app/u/alice")
            .await
            .unwrap();

        let outcome = service
            .set_default_url("CARD1", "alice.near", "javascript:alert(1)")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Denied(BindingDenied::InvalidDefaultUrl)
        );

        let outcome = service
            .set_default_url("CARD1", "bob.near", "https://elsewhere.example")
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::NoOp);

        let outcome = service
            .set_default_url("CARD1", "alice.near", "https://new.example")
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        let card = store.get_by_card_id("CARD1").await.unwrap().unwrap();
        assert_eq!(card.default_url.as_deref(), Some("https://new.example"));
    }

    #[tokio::test]
    async fn full_binding_lifecycle() {
        let (service, store, audit) = test_service().await;

        assert_eq!(
            service
                .link("CARD1", "alice.near", "https://app/u/alice")
                .await
                .unwrap(),
            MutationOutcome::Applied
        );
        assert_eq!(
            store
                .get_by_card_id("CARD1")
                .await
                .unwrap()
                .unwrap()
                .account_id
                .as_deref(),
            Some("alice.near")
        );

        assert_eq!(
            service
                .link("CARD1", "bob.near", "https://app/u/bob")
                .await
                .unwrap(),
            MutationOutcome::Denied(BindingDenied::AlreadyLinkedOther)
        );

        assert_eq!(
            service.unlink("CARD1", "alice.near").await.unwrap(),
            MutationOutcome::Applied
        );
        assert!(store
            .get_by_card_id("CARD1")
            .await
            .unwrap()
            .unwrap()
            .account_id
            .is_none());

        assert_eq!(
            service
                .link("CARD1", "bob.near", "https://app/u/bob")
                .await
                .unwrap(),
            MutationOutcome::Applied
        );

        // link, unlink, link
        let entries = audit.list_for_card("CARD1").await.unwrap();
        let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["link", "unlink", "link"]);
        assert_eq!(entries[2].account_id, "bob.near");
    }
}
