/// NFC tap entry point
///
/// GET /c/:card_id always answers with a 302 for a syntactically valid card
/// identifier; unresolvable or invalid stored URLs degrade to the next
/// destination instead of erroring.
use crate::{
    context::AppContext,
    error::CardResult,
    redirect::{resolve, RedirectDecision},
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::debug;

/// Build redirect routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/c/:card_id", get(tap_redirect))
}

/// GET /c/:card_id — resolve a tap to its destination
pub async fn tap_redirect(
    State(ctx): State<AppContext>,
    Path(card_id): Path<String>,
) -> CardResult<Response> {
    let binding = ctx.card_store.get_by_card_id(&card_id).await?;
    let decision = resolve(binding.as_ref(), &card_id, &ctx.redirect_policy);
    debug!(card_id = %card_id, ?decision, "tap resolved");

    let frontend = &ctx.config.service.frontend_url;
    let location = match decision {
        RedirectDecision::ToRegistration { card_id } => format!(
            "{}/c/register/?cardId={}",
            frontend,
            urlencoding::encode(&card_id)
        ),
        RedirectDecision::ToPartyLink { url } | RedirectDecision::ToDefaultUrl { url } => url,
        RedirectDecision::ToProfileView { account_id } => format!(
            "{}/card/view/?id={}",
            frontend,
            urlencoding::encode(&account_id)
        ),
    };

    Ok(found(location))
}

/// Plain 302 with a Location header
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
