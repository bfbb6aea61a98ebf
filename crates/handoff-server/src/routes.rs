//! Route definitions.

use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Create the router.
///
/// `/generate-link` only exists when the state carries an issuer.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/view", get(handlers::view))
        .route("/artifact/{handle}", get(handlers::artifact));

    if state.issuer().is_some() {
        router = router.route("/generate-link", get(handlers::generate_link));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
