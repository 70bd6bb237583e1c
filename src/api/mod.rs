/// API routes and handlers
pub mod cards;
pub mod redirect;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(cards::routes()).merge(redirect::routes())
}
