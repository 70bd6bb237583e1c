/// Card binding domain: models, store and binding service
pub mod service;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use service::BindingService;
pub use store::{BindWrite, CardStore};

/// Card binding record in the database
///
/// One row per physical NFC card. `account_id` is the current owner;
/// `None` means the card is unbound and available for linking.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBinding {
    pub id: String,
    pub card_id: String,
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub default_url: Option<String>,
    pub is_party_mode: bool,
    pub party_link_url: Option<String>,
    pub party_link_label: Option<String>,
    pub linked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Business-rule refusal of a binding mutation
///
/// These are expected outcomes surfaced to the caller as
/// `{success: false, error}` responses, never HTTP errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingDenied {
    /// Card is already linked to the calling account
    AlreadyLinkedSelf,
    /// Card is already linked to a different account (including a lost race)
    AlreadyLinkedOther,
    /// Party-mode link failed redirect-URL validation
    InvalidPartyUrl,
    /// Default URL failed redirect-URL validation
    InvalidDefaultUrl,
}

impl BindingDenied {
    /// User-facing message for the `{success: false, error}` envelope
    pub fn message(&self) -> &'static str {
        match self {
            BindingDenied::AlreadyLinkedSelf => "This card is already linked to your account.",
            BindingDenied::AlreadyLinkedOther => {
                "This card is already linked to another account."
            }
            BindingDenied::InvalidPartyUrl => "Party mode link must start with https://.",
            BindingDenied::InvalidDefaultUrl => "Default URL must start with https://.",
        }
    }
}

/// Result of a binding mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The write was applied
    Applied,
    /// Nothing matched the ownership guard; idempotent no-op
    NoOp,
    /// Refused by a business rule before or during the write
    Denied(BindingDenied),
}
