/// Redirect resolution for NFC taps
///
/// A tap always resolves to *some* destination. Stored URLs are only trusted
/// after passing `RedirectPolicy::is_valid_redirect_url`; an invalid stored
/// URL is treated as absent and the decision falls through to the next branch.
use crate::cards::CardBinding;
use url::Url;

/// Redirect-URL validation policy
///
/// The same predicate is applied at write time (party-mode and default-URL
/// updates) and at read time (tap resolution), so the two enforcement points
/// cannot drift. Read-time re-validation still matters for rows written
/// before the rule existed or through another write path.
#[derive(Debug, Clone, Default)]
pub struct RedirectPolicy {
    deny_host: Option<String>,
}

impl RedirectPolicy {
    /// Create a policy; `deny_host` is the service's own public host, which
    /// stored targets must not redirect back into.
    pub fn new(deny_host: Option<String>) -> Self {
        Self {
            deny_host: deny_host.map(|h| h.to_ascii_lowercase()),
        }
    }

    /// True when `raw` parses as an absolute https URL that does not point
    /// back at the service's own host
    pub fn is_valid_redirect_url(&self, raw: &str) -> bool {
        let Ok(parsed) = Url::parse(raw) else {
            return false;
        };
        if parsed.scheme() != "https" {
            return false;
        }
        match (&self.deny_host, parsed.host_str()) {
            (Some(deny), Some(host)) => !host.eq_ignore_ascii_case(deny),
            _ => true,
        }
    }
}

/// Destination a tap resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Card unknown or unbound: send the visitor to card registration
    ToRegistration { card_id: String },
    /// Party mode is on and its link is usable
    ToPartyLink { url: String },
    /// Normal mode with a usable default URL
    ToDefaultUrl { url: String },
    /// Fallback to the owner's profile view
    ToProfileView { account_id: String },
}

/// Resolve a tap against the card's current binding.
///
/// Evaluation order is fixed: registration, then party link, then default
/// URL, then profile view. Party mode always wins over the default
/// destination while active.
pub fn resolve(
    binding: Option<&CardBinding>,
    card_id: &str,
    policy: &RedirectPolicy,
) -> RedirectDecision {
    let Some(card) = binding else {
        return RedirectDecision::ToRegistration {
            card_id: card_id.to_string(),
        };
    };
    let Some(account_id) = card.account_id.as_deref() else {
        return RedirectDecision::ToRegistration {
            card_id: card_id.to_string(),
        };
    };

    if card.is_party_mode {
        if let Some(url) = card.party_link_url.as_deref() {
            if !url.is_empty() && policy.is_valid_redirect_url(url) {
                return RedirectDecision::ToPartyLink {
                    url: url.to_string(),
                };
            }
        }
    }

    if let Some(url) = card.default_url.as_deref() {
        if !url.is_empty() && policy.is_valid_redirect_url(url) {
            return RedirectDecision::ToDefaultUrl {
                url: url.to_string(),
            };
        }
    }

    RedirectDecision::ToProfileView {
        account_id: account_id.to_string(),
    }
}
