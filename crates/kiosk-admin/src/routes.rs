//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AdminState;

/// Build the administration router.
///
/// ```text
/// GET    /health                  - Liveness and display count
/// GET    /displays                - List displays
/// POST   /displays                - Add display
/// GET    /displays/defaults       - Next free name, port and tab defaults
/// GET    /displays/{name}         - Get display
/// PUT    /displays/{name}         - Edit display
/// DELETE /displays/{name}         - Remove display
/// POST   /displays/{name}/tabs    - Append tab
/// PUT    /displays/{name}/tabs    - Edit tab by originalUrl (appends if absent)
/// DELETE /displays/{name}/tabs    - Remove tab (?url=)
/// POST   /reload                  - Restart displays from the saved file
/// ```
pub fn create_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/reload", post(handlers::reload))
        .route(
            "/displays",
            get(handlers::list_displays).post(handlers::add_display),
        )
        .route("/displays/defaults", get(handlers::display_defaults))
        .route(
            "/displays/{name}",
            get(handlers::get_display)
                .put(handlers::edit_display)
                .delete(handlers::remove_display),
        )
        .route(
            "/displays/{name}/tabs",
            post(handlers::add_tab)
                .put(handlers::edit_tab)
                .delete(handlers::remove_tab),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
