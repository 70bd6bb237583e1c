/// Card binding API endpoints
///
/// Thin pass-through over the card store (reads) and binding service
/// (writes). Business refusals come back as `{success: false, error}` with
/// HTTP 200; only malformed requests and storage failures use error codes.
use crate::{
    cards::{CardBinding, MutationOutcome},
    context::AppContext,
    error::{CardError, CardResult},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build card API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/cards", get(get_card))
        .route("/api/cards/account/:account_id", get(list_account_cards))
        .route("/api/cards/link", post(link_card))
        .route("/api/cards/unlink", put(unlink_card))
        .route("/api/cards/party-mode", put(set_party_mode))
        .route("/api/cards/default-url", put(set_default_url))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupParams {
    pub card_id: Option<String>,
}

/// Mutation result envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<MutationOutcome> for MutationResponse {
    fn from(outcome: MutationOutcome) -> Self {
        match outcome {
            // No-ops are idempotent successes on the wire
            MutationOutcome::Applied | MutationOutcome::NoOp => MutationResponse {
                success: true,
                error: None,
            },
            MutationOutcome::Denied(denied) => MutationResponse {
                success: false,
                error: Some(denied.message().to_string()),
            },
        }
    }
}

fn require(field: Option<String>, name: &str) -> CardResult<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CardError::Validation(format!("{} is required", name))),
    }
}

/// GET /api/cards?cardId=xxx — look up a binding by card identifier
pub async fn get_card(
    State(ctx): State<AppContext>,
    Query(params): Query<LookupParams>,
) -> CardResult<Json<Option<CardBinding>>> {
    let card_id = require(params.card_id, "cardId")?;
    let card = ctx.card_store.get_by_card_id(&card_id).await?;
    Ok(Json(card))
}

/// GET /api/cards/account/:account_id — all bindings owned by an account
pub async fn list_account_cards(
    State(ctx): State<AppContext>,
    Path(account_id): Path<String>,
) -> CardResult<Json<Vec<CardBinding>>> {
    let cards = ctx.card_store.list_by_account(&account_id).await?;
    Ok(Json(cards))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub card_id: Option<String>,
    pub account_id: Option<String>,
    pub default_url: Option<String>,
}

/// POST /api/cards/link — bind a card to an account
pub async fn link_card(
    State(ctx): State<AppContext>,
    Json(req): Json<LinkRequest>,
) -> CardResult<Json<MutationResponse>> {
    let card_id = require(req.card_id, "cardId")?;
    let account_id = require(req.account_id, "accountId")?;
    let default_url = require(req.default_url, "defaultUrl")?;

    let outcome = ctx
        .binding_service
        .link(&card_id, &account_id, &default_url)
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkRequest {
    pub card_id: Option<String>,
    pub account_id: Option<String>,
}

/// PUT /api/cards/unlink — release a binding
pub async fn unlink_card(
    State(ctx): State<AppContext>,
    Json(req): Json<UnlinkRequest>,
) -> CardResult<Json<MutationResponse>> {
    let card_id = require(req.card_id, "cardId")?;
    let account_id = require(req.account_id, "accountId")?;

    let outcome = ctx.binding_service.unlink(&card_id, &account_id).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyModeRequest {
    pub card_id: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub is_party_mode: bool,
    pub party_link_url: Option<String>,
    pub party_link_label: Option<String>,
}

/// PUT /api/cards/party-mode — update party-mode fields
pub async fn set_party_mode(
    State(ctx): State<AppContext>,
    Json(req): Json<PartyModeRequest>,
) -> CardResult<Json<MutationResponse>> {
    let card_id = require(req.card_id, "cardId")?;
    let account_id = require(req.account_id, "accountId")?;

    let outcome = ctx
        .binding_service
        .set_party_mode(
            &card_id,
            &account_id,
            req.is_party_mode,
            req.party_link_url.as_deref(),
            req.party_link_label.as_deref(),
        )
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultUrlRequest {
    pub card_id: Option<String>,
    pub account_id: Option<String>,
    pub default_url: Option<String>,
}

/// PUT /api/cards/default-url — update the default redirect URL
pub async fn set_default_url(
    State(ctx): State<AppContext>,
    Json(req): Json<DefaultUrlRequest>,
) -> CardResult<Json<MutationResponse>> {
    let card_id = require(req.card_id, "cardId")?;
    let account_id = require(req.account_id, "accountId")?;
    let default_url = require(req.default_url, "defaultUrl")?;

    let outcome = ctx
        .binding_service
        .set_default_url(&card_id, &account_id, &default_url)
        .await?;
    Ok(Json(outcome.into()))
}
